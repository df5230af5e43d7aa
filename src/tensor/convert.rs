use super::element::Element;
use super::{DType, Tensor};

impl Tensor {
    /// 将所有元素按逻辑顺序转为f32。半精度类型从位模式解码，bool转为0/1。
    pub fn values_f32(&self) -> Vec<f32> {
        let size = self.dtype.size();
        let chunks = self.data.chunks_exact(size);
        match self.dtype {
            DType::Float64 => chunks.map(|c| f64::read_le(c).to_f32()).collect(),
            DType::Float32 => chunks.map(f32::read_le).collect(),
            DType::Float16 => chunks
                .map(|c| f16_bits_to_f32(u16::from_le_bytes([c[0], c[1]])))
                .collect(),
            DType::BFloat16 => chunks
                .map(|c| bf16_bits_to_f32(u16::from_le_bytes([c[0], c[1]])))
                .collect(),
            DType::Int64 => chunks.map(|c| i64::read_le(c).to_f32()).collect(),
            DType::Int32 => chunks.map(|c| i32::read_le(c).to_f32()).collect(),
            DType::Int16 => chunks.map(|c| i16::read_le(c).to_f32()).collect(),
            DType::Int8 => chunks.map(|c| i8::read_le(c).to_f32()).collect(),
            DType::UInt8 => chunks.map(|c| u8::read_le(c).to_f32()).collect(),
            DType::Bool => chunks.map(|c| bool::read_le(c).to_f32()).collect(),
        }
    }

    /// 转为float32张量（对应宿主里的`.float()`），已是float32时直接克隆
    pub fn to_f32(&self) -> Tensor {
        if self.dtype == DType::Float32 {
            return self.clone();
        }
        Tensor::new(&self.values_f32(), &self.shape)
    }

    /// 乘以一个纯数，结果为float32张量
    pub fn scale(&self, factor: f32) -> Tensor {
        let values = self
            .values_f32()
            .into_iter()
            .map(|x| x * factor)
            .collect::<Vec<_>>();
        Tensor::new(&values, &self.shape)
    }
}

/// IEEE 754 半精度 -> 单精度
pub(crate) fn f16_bits_to_f32(bits: u16) -> f32 {
    let sign = u32::from(bits >> 15) << 31;
    let exponent = u32::from((bits >> 10) & 0x1f);
    let fraction = u32::from(bits & 0x3ff);
    match exponent {
        0 => {
            // 零或非规格化数：fraction × 2^-24
            let magnitude = fraction as f32 * f32::powi(2., -24);
            if sign == 0 { magnitude } else { -magnitude }
        }
        0x1f => f32::from_bits(sign | 0x7f80_0000 | (fraction << 13)),
        _ => f32::from_bits(sign | ((exponent + 112) << 23) | (fraction << 13)),
    }
}

/// bfloat16即单精度的高16位
pub(crate) fn bf16_bits_to_f32(bits: u16) -> f32 {
    f32::from_bits(u32::from(bits) << 16)
}
