//! # 张量/元数据JSON编解码
//!
//! 将任意嵌套的宿主值（张量、JSON原生标量、列表、字典）编码为带类型标签的JSON树，并可逆地解码回来：
//!
//! - 张量 → `{"type":"tensor","data":<base64>,"shape":[...],"dtype":"float32"}`
//! - 列表 → `{"type":"list","data":[<信封>, ...]}`
//! - 字典 → `{"type":"dict","data":{"<键>":<信封>, ...}}`
//! - 其他 → `{"type":"value","data":<JSON原生值>}`
//!
//! 满足`decode(encode(v)) == v`，张量逐位一致。

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value as Json;

use crate::tensor::{DType, Tensor};

mod envelope;
mod error;
mod value;

pub use self::envelope::{Envelope, Kind, TensorEnvelope};
pub use self::error::CodecError;
pub use self::value::Value;


/// 编解码时允许的最大嵌套层数，防止恶意输入导致栈溢出
pub const MAX_DEPTH: usize = 128;

/// 将单个张量编码为张量信封载荷
pub fn encode_tensor(tensor: &Tensor) -> TensorEnvelope {
    TensorEnvelope {
        data: STANDARD.encode(tensor.as_bytes()),
        shape: tensor.shape().to_vec(),
        dtype: tensor.dtype().name().to_string(),
    }
}

/// 从张量信封载荷还原张量。`dtype`可带命名空间前缀（如`torch.float32`）。
pub fn decode_tensor(envelope: &TensorEnvelope) -> Result<Tensor, CodecError> {
    let bytes = STANDARD.decode(&envelope.data)?;
    let dtype = DType::from_name(&envelope.dtype)?;
    Ok(Tensor::from_bytes(dtype, &envelope.shape, bytes)?)
}

/// 递归编码
pub fn encode(value: &Value) -> Result<Envelope, CodecError> {
    encode_at(value, 0)
}

fn encode_at(value: &Value, depth: usize) -> Result<Envelope, CodecError> {
    if depth > MAX_DEPTH {
        return Err(CodecError::DepthExceeded);
    }
    let envelope = match value {
        Value::Tensor(tensor) => Envelope::Tensor(encode_tensor(tensor)),
        Value::List(items) => Envelope::List(
            items
                .iter()
                .map(|item| encode_at(item, depth + 1))
                .collect::<Result<_, _>>()?,
        ),
        Value::Dict(entries) => Envelope::Dict(
            entries
                .iter()
                .map(|(key, item)| encode_at(item, depth + 1).map(|v| (key.clone(), v)))
                .collect::<Result<_, _>>()?,
        ),
        Value::Null => Envelope::Value(Json::Null),
        Value::Bool(b) => Envelope::Value(Json::Bool(*b)),
        Value::Int(i) => Envelope::Value(Json::from(*i)),
        Value::UInt(u) => Envelope::Value(Json::from(*u)),
        Value::Float(f) => Envelope::Value(
            serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .ok_or_else(|| CodecError::NonJsonScalar(f.to_string()))?,
        ),
        Value::Str(s) => Envelope::Value(Json::String(s.clone())),
    };
    Ok(envelope)
}

/// 递归解码
pub fn decode(envelope: &Envelope) -> Result<Value, CodecError> {
    decode_at(envelope, 0)
}

fn decode_at(envelope: &Envelope, depth: usize) -> Result<Value, CodecError> {
    if depth > MAX_DEPTH {
        return Err(CodecError::DepthExceeded);
    }
    match envelope {
        Envelope::Tensor(tensor) => Ok(Value::Tensor(decode_tensor(tensor)?)),
        Envelope::Value(json) => json_to_value(json, depth),
        Envelope::List(items) => items
            .iter()
            .map(|item| decode_at(item, depth + 1))
            .collect::<Result<_, _>>()
            .map(Value::List),
        Envelope::Dict(entries) => entries
            .iter()
            .map(|(key, item)| decode_at(item, depth + 1).map(|v| (key.clone(), v)))
            .collect::<Result<_, _>>()
            .map(Value::Dict),
    }
}

/// value信封里的JSON原生值。
/// 本编码器只会在其中放标量，但其他编码器可能直接放入数组/对象，这里也按普通列表/字典还原。
fn json_to_value(json: &Json, depth: usize) -> Result<Value, CodecError> {
    if depth > MAX_DEPTH {
        return Err(CodecError::DepthExceeded);
    }
    let value = match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => match (n.as_i64(), n.as_u64()) {
            (Some(i), _) => Value::Int(i),
            (None, Some(u)) => Value::UInt(u),
            (None, None) => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Json::String(s) => Value::Str(s.clone()),
        Json::Array(items) => Value::List(
            items
                .iter()
                .map(|item| json_to_value(item, depth + 1))
                .collect::<Result<_, _>>()?,
        ),
        Json::Object(entries) => Value::Dict(
            entries
                .iter()
                .map(|(key, item)| json_to_value(item, depth + 1).map(|v| (key.clone(), v)))
                .collect::<Result<_, _>>()?,
        ),
    };
    Ok(value)
}
