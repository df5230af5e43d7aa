//! 张量元素类型（dtype）的枚举及其规范名称

use std::fmt;
use std::str::FromStr;

use crate::errors::TensorError;

/// 张量元素类型。
/// 规范名称（如`float32`、`int64`）不带任何命名空间前缀，写入文件时一律使用规范名称。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    Float64,
    Float32,
    Float16,
    BFloat16,
    Int64,
    Int32,
    Int16,
    Int8,
    UInt8,
    Bool,
}

impl DType {
    pub const ALL: [DType; 10] = [
        DType::Float64,
        DType::Float32,
        DType::Float16,
        DType::BFloat16,
        DType::Int64,
        DType::Int32,
        DType::Int16,
        DType::Int8,
        DType::UInt8,
        DType::Bool,
    ];

    /// 单个元素所占字节数
    pub const fn size(self) -> usize {
        match self {
            DType::Float64 | DType::Int64 => 8,
            DType::Float32 | DType::Int32 => 4,
            DType::Float16 | DType::BFloat16 | DType::Int16 => 2,
            DType::Int8 | DType::UInt8 | DType::Bool => 1,
        }
    }

    /// 规范名称
    pub const fn name(self) -> &'static str {
        match self {
            DType::Float64 => "float64",
            DType::Float32 => "float32",
            DType::Float16 => "float16",
            DType::BFloat16 => "bfloat16",
            DType::Int64 => "int64",
            DType::Int32 => "int32",
            DType::Int16 => "int16",
            DType::Int8 => "int8",
            DType::UInt8 => "uint8",
            DType::Bool => "bool",
        }
    }

    pub const fn is_float(self) -> bool {
        matches!(
            self,
            DType::Float64 | DType::Float32 | DType::Float16 | DType::BFloat16
        )
    }

    /// 从名称解析元素类型。
    /// 旧版编码器会写出带命名空间的全限定名（如`torch.float32`），这里只取最后一个`.`之后的部分。
    pub fn from_name(name: &str) -> Result<Self, TensorError> {
        let bare = name.trim().rsplit('.').next().unwrap_or_default();
        let dtype = match bare {
            "float64" | "double" => DType::Float64,
            "float32" | "float" => DType::Float32,
            "float16" | "half" => DType::Float16,
            "bfloat16" => DType::BFloat16,
            "int64" | "long" => DType::Int64,
            "int32" | "int" => DType::Int32,
            "int16" | "short" => DType::Int16,
            "int8" => DType::Int8,
            "uint8" => DType::UInt8,
            "bool" => DType::Bool,
            _ => return Err(TensorError::UnknownDType(name.to_string())),
        };
        Ok(dtype)
    }

    /// safetensors头部中使用的类型代号
    pub const fn safetensors_code(self) -> &'static str {
        match self {
            DType::Float64 => "F64",
            DType::Float32 => "F32",
            DType::Float16 => "F16",
            DType::BFloat16 => "BF16",
            DType::Int64 => "I64",
            DType::Int32 => "I32",
            DType::Int16 => "I16",
            DType::Int8 => "I8",
            DType::UInt8 => "U8",
            DType::Bool => "BOOL",
        }
    }

    pub fn from_safetensors_code(code: &str) -> Result<Self, TensorError> {
        DType::ALL
            .into_iter()
            .find(|dtype| dtype.safetensors_code() == code)
            .ok_or_else(|| TensorError::UnknownDType(code.to_string()))
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for DType {
    type Err = TensorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DType::from_name(s)
    }
}
