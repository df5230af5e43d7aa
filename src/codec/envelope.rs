//! 带类型标签的JSON信封（envelope）。
//! 线上格式：{"type": "tensor"|"value"|"list"|"dict", "data": ..., [shape, dtype]}

use std::fmt;

use indexmap::IndexMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value as Json};

use super::{CodecError, MAX_DEPTH};

/// 信封种类，封闭集合
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Tensor,
    Value,
    List,
    Dict,
}

impl Kind {
    pub const fn tag(self) -> &'static str {
        match self {
            Kind::Tensor => "tensor",
            Kind::Value => "value",
            Kind::List => "list",
            Kind::Dict => "dict",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Kind, CodecError> {
        match tag {
            "tensor" => Ok(Kind::Tensor),
            "value" => Ok(Kind::Value),
            "list" => Ok(Kind::List),
            "dict" => Ok(Kind::Dict),
            other => Err(CodecError::UnknownTag(other.to_string())),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// 张量信封的载荷：base64编码的原始字节、形状、规范元素类型名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorEnvelope {
    pub data: String,
    pub shape: Vec<usize>,
    pub dtype: String,
}

/// 带类型标签的值
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Tensor(TensorEnvelope),
    Value(Json),
    List(Vec<Envelope>),
    Dict(IndexMap<String, Envelope>),
}

impl Envelope {
    pub fn kind(&self) -> Kind {
        match self {
            Envelope::Tensor(_) => Kind::Tensor,
            Envelope::Value(_) => Kind::Value,
            Envelope::List(_) => Kind::List,
            Envelope::Dict(_) => Kind::Dict,
        }
    }

    /// 从已解析的JSON构造信封，按`type`字段分派
    pub fn from_json(json: &Json) -> Result<Envelope, CodecError> {
        Self::from_json_at(json, 0)
    }

    fn from_json_at(json: &Json, depth: usize) -> Result<Envelope, CodecError> {
        if depth > MAX_DEPTH {
            return Err(CodecError::DepthExceeded);
        }
        let object = json
            .as_object()
            .ok_or_else(|| malformed("信封必须是JSON对象"))?;
        let tag = object
            .get("type")
            .and_then(Json::as_str)
            .ok_or_else(|| malformed("缺少字符串字段`type`"))?;
        let kind = Kind::from_tag(tag)?;
        let data = object
            .get("data")
            .ok_or_else(|| malformed(format!("{kind}信封缺少字段`data`")))?;

        match kind {
            Kind::Tensor => Ok(Envelope::Tensor(tensor_payload(object, data)?)),
            Kind::Value => Ok(Envelope::Value(data.clone())),
            Kind::List => {
                let items = data
                    .as_array()
                    .ok_or_else(|| malformed("list信封的`data`必须是数组"))?;
                items
                    .iter()
                    .map(|item| Self::from_json_at(item, depth + 1))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Envelope::List)
            }
            Kind::Dict => {
                let entries = data
                    .as_object()
                    .ok_or_else(|| malformed("dict信封的`data`必须是对象"))?;
                entries
                    .iter()
                    .map(|(key, item)| Self::from_json_at(item, depth + 1).map(|v| (key.clone(), v)))
                    .collect::<Result<IndexMap<_, _>, _>>()
                    .map(Envelope::Dict)
            }
        }
    }

    /// 转为JSON
    pub fn to_json(&self) -> Json {
        let mut object = Map::new();
        object.insert("type".to_string(), Json::from(self.kind().tag()));
        match self {
            Envelope::Tensor(tensor) => {
                object.insert("data".to_string(), Json::from(tensor.data.as_str()));
                object.insert("shape".to_string(), Json::from(tensor.shape.clone()));
                object.insert("dtype".to_string(), Json::from(tensor.dtype.as_str()));
            }
            Envelope::Value(value) => {
                object.insert("data".to_string(), value.clone());
            }
            Envelope::List(items) => {
                let items = items.iter().map(Envelope::to_json).collect();
                object.insert("data".to_string(), Json::Array(items));
            }
            Envelope::Dict(entries) => {
                let entries = entries
                    .iter()
                    .map(|(key, item)| (key.clone(), item.to_json()))
                    .collect();
                object.insert("data".to_string(), Json::Object(entries));
            }
        }
        Json::Object(object)
    }
}

fn tensor_payload(object: &Map<String, Json>, data: &Json) -> Result<TensorEnvelope, CodecError> {
    let data = data
        .as_str()
        .ok_or_else(|| malformed("tensor信封的`data`必须是base64字符串"))?;
    let shape = object
        .get("shape")
        .and_then(Json::as_array)
        .ok_or_else(|| malformed("tensor信封缺少数组字段`shape`"))?
        .iter()
        .map(|dim| {
            dim.as_u64()
                .map(|n| n as usize)
                .ok_or_else(|| malformed(format!("`shape`中的{dim}不是非负整数")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let dtype = object
        .get("dtype")
        .and_then(Json::as_str)
        .ok_or_else(|| malformed("tensor信封缺少字符串字段`dtype`"))?;
    Ok(TensorEnvelope {
        data: data.to_string(),
        shape,
        dtype: dtype.to_string(),
    })
}

fn malformed(message: impl Into<String>) -> CodecError {
    CodecError::MalformedEnvelope(message.into())
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Envelope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = Json::deserialize(deserializer)?;
        Envelope::from_json(&json).map_err(D::Error::custom)
    }
}
