//! 键值张量检查点（safetensors布局）的读写
//!
//! 布局：头部长度(u64, 小端) | JSON头部 | 连续的张量数据
//! 头部：{"<张量名>": {"dtype": "F32", "shape": [...], "data_offsets": [起, 止]}, "__metadata__": {"<键>": "<字符串>"}}
//! 偏移量相对于数据区起点。

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde_json::{Map, Value as Json};

use super::LatentError;
use crate::tensor::{DType, Tensor};

/// 头部中存放字符串元数据的保留键
pub const METADATA_KEY: &str = "__metadata__";
/// 头部长度上限，超过即视为损坏的文件
const MAX_HEADER_LEN: u64 = 100 * 1024 * 1024;
/// 头部按8字节对齐，用空格补齐
const HEADER_ALIGNMENT: usize = 8;

/// 由若干具名张量及字符串元数据组成的检查点
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Checkpoint {
    tensors: BTreeMap<String, Tensor>,
    metadata: BTreeMap<String, String>,
}

impl Checkpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, tensor: Tensor) -> Option<Tensor> {
        self.tensors.insert(name.into(), tensor)
    }

    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.tensors.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tensors.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tensors.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, LatentError> {
        let mut header = Map::new();
        if !self.metadata.is_empty() {
            let metadata = self
                .metadata
                .iter()
                .map(|(k, v)| (k.clone(), Json::from(v.as_str())))
                .collect();
            header.insert(METADATA_KEY.to_string(), Json::Object(metadata));
        }

        let mut offset = 0usize;
        for (name, tensor) in &self.tensors {
            let end = offset + tensor.nbytes();
            let mut entry = Map::new();
            entry.insert("dtype".to_string(), Json::from(tensor.dtype().safetensors_code()));
            entry.insert("shape".to_string(), Json::from(tensor.shape().to_vec()));
            entry.insert("data_offsets".to_string(), Json::from(vec![offset, end]));
            header.insert(name.clone(), Json::Object(entry));
            offset = end;
        }

        let mut header_bytes = serde_json::to_vec(&Json::Object(header))?;
        let padding = (HEADER_ALIGNMENT - header_bytes.len() % HEADER_ALIGNMENT) % HEADER_ALIGNMENT;
        header_bytes.extend(std::iter::repeat_n(b' ', padding));

        let mut bytes = Vec::with_capacity(8 + header_bytes.len() + offset);
        bytes.extend_from_slice(&(header_bytes.len() as u64).to_le_bytes());
        bytes.extend_from_slice(&header_bytes);
        for tensor in self.tensors.values() {
            bytes.extend_from_slice(tensor.as_bytes());
        }
        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LatentError> {
        if bytes.len() < 8 {
            return Err(invalid("文件过短，缺少头部长度"));
        }
        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&bytes[..8]);
        let header_len = u64::from_le_bytes(len_bytes);
        if header_len > MAX_HEADER_LEN || header_len > (bytes.len() - 8) as u64 {
            return Err(invalid(format!("头部长度{header_len}超出文件范围")));
        }
        let header_end = 8 + header_len as usize;
        let header: Json = serde_json::from_slice(&bytes[8..header_end])?;
        let header = header
            .as_object()
            .ok_or_else(|| invalid("头部必须是JSON对象"))?;
        let data = &bytes[header_end..];

        let mut checkpoint = Checkpoint::new();
        for (name, entry) in header {
            if name == METADATA_KEY {
                checkpoint.metadata = parse_metadata(entry)?;
                continue;
            }
            let tensor = parse_tensor(name, entry, data)?;
            checkpoint.tensors.insert(name.clone(), tensor);
        }
        Ok(checkpoint)
    }

    /// 写入`path`，必要时创建父目录
    pub fn write(&self, path: &Path) -> Result<(), LatentError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(&self.to_bytes()?)?;
        writer.flush()?;
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self, LatentError> {
        if !path.is_file() {
            return Err(LatentError::FileNotFound(path.to_path_buf()));
        }
        Self::from_bytes(&std::fs::read(path)?)
    }
}

fn parse_metadata(entry: &Json) -> Result<BTreeMap<String, String>, LatentError> {
    let object = entry
        .as_object()
        .ok_or_else(|| invalid(format!("`{METADATA_KEY}`必须是对象")))?;
    object
        .iter()
        .map(|(key, value)| {
            value
                .as_str()
                .map(|v| (key.clone(), v.to_string()))
                .ok_or_else(|| invalid(format!("元数据`{key}`的值必须是字符串")))
        })
        .collect()
}

fn parse_tensor(name: &str, entry: &Json, data: &[u8]) -> Result<Tensor, LatentError> {
    let code = entry
        .get("dtype")
        .and_then(Json::as_str)
        .ok_or_else(|| invalid(format!("张量`{name}`缺少dtype")))?;
    let dtype = DType::from_safetensors_code(code)?;
    let shape = entry
        .get("shape")
        .and_then(Json::as_array)
        .ok_or_else(|| invalid(format!("张量`{name}`缺少shape")))?
        .iter()
        .map(|dim| dim.as_u64().map(|n| n as usize))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| invalid(format!("张量`{name}`的shape须为非负整数")))?;
    let offsets = entry
        .get("data_offsets")
        .and_then(Json::as_array)
        .and_then(|offsets| match offsets.as_slice() {
            [start, end] => Some((start.as_u64()? as usize, end.as_u64()? as usize)),
            _ => None,
        })
        .ok_or_else(|| invalid(format!("张量`{name}`的data_offsets无效")))?;
    let (start, end) = offsets;
    if start > end || end > data.len() {
        return Err(invalid(format!(
            "张量`{name}`的数据区间[{start}, {end})超出数据区（共{}字节）",
            data.len()
        )));
    }
    Ok(Tensor::from_bytes(dtype, &shape, data[start..end].to_vec())?)
}

fn invalid(message: impl Into<String>) -> LatentError {
    LatentError::InvalidCheckpoint(message.into())
}

