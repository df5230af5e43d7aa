use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TensorError {
    #[error("形状{shape:?}与元素个数{len}不符")]
    ShapeMismatch { shape: Vec<usize>, len: usize },
    #[error(
        "数据长度与形状不符：形状{shape:?}共需{expected}个字节（元素类型{dtype}），实际为{got}个字节"
    )]
    ByteLengthMismatch {
        dtype: String,
        shape: Vec<usize>,
        expected: usize,
        got: usize,
    },
    #[error("形状{shape:?}（元素类型{dtype}）所需的字节数超出可表示范围")]
    ShapeOverflow { dtype: String, shape: Vec<usize> },
    #[error("元素类型不一致：期望{expected}，实际为{got}")]
    DTypeMismatch { expected: String, got: String },
    #[error("未知的元素类型：{0}")]
    UnknownDType(String),

    // 图像张量
    #[error("图像张量应有3或4个维度（[H,W,C]或[B,H,W,C]），实际形状为{0:?}")]
    NotAnImage(Vec<usize>),
    #[error("图像张量的通道数只可能是1、3或4，实际为{0}")]
    UnsupportedChannels(usize),
    #[error("批次索引{index}越界，批次大小为{batch}")]
    BatchIndexOutOfRange { index: usize, batch: usize },
    #[error("图像编码失败：{0}")]
    ImageEncode(String),
}
