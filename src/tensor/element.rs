use num_traits::AsPrimitive;

use super::DType;

/// 可以作为张量元素的rust标量类型。
/// 字节序统一为小端（little-endian），与主流平台上的内存布局一致。
pub trait Element: Copy + Default + 'static {
    const DTYPE: DType;

    fn write_le(self, out: &mut Vec<u8>);

    /// `bytes`的长度恰为`Self::DTYPE.size()`
    fn read_le(bytes: &[u8]) -> Self;

    fn to_f32(self) -> f32;
}

macro_rules! impl_numeric_element {
    ($($t:ty => $dtype:ident),* $(,)?) => {
        $(
            impl Element for $t {
                const DTYPE: DType = DType::$dtype;

                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                fn read_le(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$t>()];
                    buf.copy_from_slice(bytes);
                    <$t>::from_le_bytes(buf)
                }

                fn to_f32(self) -> f32 {
                    self.as_()
                }
            }
        )*
    };
}

impl_numeric_element!(
    f64 => Float64,
    f32 => Float32,
    i64 => Int64,
    i32 => Int32,
    i16 => Int16,
    i8 => Int8,
    u8 => UInt8,
);

impl Element for bool {
    const DTYPE: DType = DType::Bool;

    fn write_le(self, out: &mut Vec<u8>) {
        out.push(u8::from(self));
    }

    fn read_le(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    fn to_f32(self) -> f32 {
        if self { 1. } else { 0. }
    }
}
