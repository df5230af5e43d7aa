use ndarray::{Array, ArrayD, Dimension, IxDyn};

use crate::errors::TensorError;

mod convert;
mod dtype;
mod element;
mod image;
mod property;

pub use self::dtype::DType;
pub use self::element::Element;

#[cfg(test)]
pub mod tests;

/// 定义张量的结构体：宿主流水线在节点之间传递的多维数值数组。
/// 数据以原始字节保存（行优先、小端），因此任意元素类型都能逐位（bit-exact）地往返于文件。
/// 注：两个张量相等，当且仅当元素类型、形状、字节内容都一致。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tensor {
    dtype: DType,
    shape: Vec<usize>,
    data: Vec<u8>,
}

impl Tensor {
    /// 创建一个float32张量，若为标量，`shape`可以是[]、[1]、[1,1]...
    /// 注：`data`的长度必须和`shape`中所有元素的乘积相等，否则会panic。
    pub fn new(data: &[f32], shape: &[usize]) -> Tensor {
        let expected = byte_len(DType::Float32, shape).unwrap_or_else(|e| panic!("{e}"));
        assert!(
            data.len() * DType::Float32.size() == expected,
            "{}",
            TensorError::ByteLengthMismatch {
                dtype: DType::Float32.to_string(),
                shape: shape.to_vec(),
                expected,
                got: data.len() * DType::Float32.size(),
            }
        );
        let mut bytes = Vec::with_capacity(data.len() * DType::Float32.size());
        for &value in data {
            value.write_le(&mut bytes);
        }
        Tensor {
            dtype: DType::Float32,
            shape: shape.to_vec(),
            data: bytes,
        }
    }

    /// 由原始字节构造张量，字节数须恰为`形状元素个数 × 元素字节数`
    pub fn from_bytes(dtype: DType, shape: &[usize], data: Vec<u8>) -> Result<Tensor, TensorError> {
        let expected = byte_len(dtype, shape)?;
        if data.len() != expected {
            return Err(TensorError::ByteLengthMismatch {
                dtype: dtype.to_string(),
                shape: shape.to_vec(),
                expected,
                got: data.len(),
            });
        }
        Ok(Tensor {
            dtype,
            shape: shape.to_vec(),
            data,
        })
    }

    /// 创建一个全零张量
    /// 注：`shape`所需的字节数溢出`usize`时会panic，来自文件的形状应走[`Tensor::from_bytes`]。
    pub fn zeros(dtype: DType, shape: &[usize]) -> Tensor {
        let len = byte_len(dtype, shape).unwrap_or_else(|e| panic!("{e}"));
        Tensor {
            dtype,
            shape: shape.to_vec(),
            data: vec![0; len],
        }
    }

    /// 由ndarray数组构造张量。数组不必是连续内存，按逻辑顺序（行优先）取元素。
    pub fn from_array<T: Element, D: Dimension>(array: &Array<T, D>) -> Tensor {
        let mut data = Vec::with_capacity(array.len() * T::DTYPE.size());
        for &value in array.iter() {
            value.write_le(&mut data);
        }
        Tensor {
            dtype: T::DTYPE,
            shape: array.shape().to_vec(),
            data,
        }
    }

    /// 转为ndarray数组，`T`须与张量的元素类型一致
    pub fn to_array<T: Element>(&self) -> Result<ArrayD<T>, TensorError> {
        if T::DTYPE != self.dtype {
            return Err(TensorError::DTypeMismatch {
                expected: T::DTYPE.to_string(),
                got: self.dtype.to_string(),
            });
        }
        let values = self
            .data
            .chunks_exact(self.dtype.size())
            .map(T::read_le)
            .collect::<Vec<_>>();
        let len = values.len();
        Array::from_shape_vec(IxDyn(&self.shape), values).map_err(|_| TensorError::ShapeMismatch {
            shape: self.shape.clone(),
            len,
        })
    }

    /// 取出原始字节
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// `形状元素个数 × 元素字节数`，溢出时报错（形状可能来自不可信的文件）
pub fn byte_len(dtype: DType, shape: &[usize]) -> Result<usize, TensorError> {
    shape
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .and_then(|count| count.checked_mul(dtype.size()))
        .ok_or_else(|| TensorError::ShapeOverflow {
            dtype: dtype.to_string(),
            shape: shape.to_vec(),
        })
}
