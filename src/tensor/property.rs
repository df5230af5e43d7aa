//! 本类仅包含一些属性方法，不包含任何运算方法，所以不会需要用到mut

use super::{DType, Tensor};

impl Tensor {
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// 若为向量，`shape`可以是[n]、[1,n]、[n,1]；
    /// 若为矩阵，`shape`可以是[n,m]；
    /// 若为更高维度的数组，`shape`可以是[c,n,m,...]。
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// 张量的维（dim）数、阶（rank）数，即`shape()`的元素个数
    pub fn dimension(&self) -> usize {
        self.shape.len()
    }

    /// 计算张量中所有元素的数量
    pub fn size(&self) -> usize {
        self.data.len() / self.dtype.size()
    }

    /// 原始字节（行优先、小端）
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// 原始字节数
    pub fn nbytes(&self) -> usize {
        self.data.len()
    }

    /// 判断两个张量的形状是否严格一致。如：形状为 [1, 4]，[1, 4]和[4]是不一致的，会返回false
    pub fn is_same_shape(&self, other: &Self) -> bool {
        self.shape() == other.shape()
    }

    /// 是否含有0个元素
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }
}
