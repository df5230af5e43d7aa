//! # 条件数据（conditioning）的JSON存取
//!
//! 条件数据是宿主生成流水线使用的有序序列，每个元素为`(张量, 元数据字典)`。
//! 文件为单个JSON数组，每个元素形如`{"tensor": <张量信封>, "meta": <信封>}`，
//! 信封格式见[`crate::codec`]。

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value as Json};

use crate::codec::{self, Envelope, Value};
use crate::tensor::Tensor;

mod error;
mod nodes;

pub use self::error::ConditioningError;
pub use self::nodes::{ConditioningLoadJson, ConditioningSaveJson};


/// 条件数据中的一个元素
#[derive(Debug, Clone, PartialEq)]
pub struct ConditioningEntry {
    pub tensor: Tensor,
    pub meta: Value,
}

impl ConditioningEntry {
    pub fn new(tensor: Tensor, meta: Value) -> Self {
        Self { tensor, meta }
    }
}

pub type Conditioning = Vec<ConditioningEntry>;

/// 编码后写入`path`，必要时创建父目录；已存在的文件会被整体覆盖
pub fn save_json(entries: &[ConditioningEntry], path: &Path) -> Result<PathBuf, ConditioningError> {
    let records = entries
        .iter()
        .map(|entry| -> Result<Json, ConditioningError> {
            let mut record = Map::new();
            let tensor = Envelope::Tensor(codec::encode_tensor(&entry.tensor));
            record.insert("tensor".to_string(), tensor.to_json());
            record.insert("meta".to_string(), codec::encode(&entry.meta)?.to_json());
            Ok(Json::Object(record))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, &records)?;
    writer.flush()?;

    tracing::info!(path = %path.display(), entries = entries.len(), "已保存条件数据");
    Ok(path.to_path_buf())
}

/// 读取并解码`path`。任何一条目无效都会中止整个加载。
pub fn load_json(path: &Path) -> Result<Conditioning, ConditioningError> {
    if !path.is_file() {
        return Err(ConditioningError::FileNotFound(path.to_path_buf()));
    }
    let reader = BufReader::new(File::open(path)?);
    let json: Json = serde_json::from_reader(reader)?;
    let records = json
        .as_array()
        .ok_or_else(|| ConditioningError::FormatError("顶层必须是JSON数组".to_string()))?;

    let entries = records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            decode_entry(record).map_err(|source| ConditioningError::Entry { index, source })
        })
        .collect::<Result<Conditioning, _>>()?;

    tracing::info!(path = %path.display(), entries = entries.len(), "已加载条件数据");
    Ok(entries)
}

fn decode_entry(record: &Json) -> Result<ConditioningEntry, codec::CodecError> {
    let field = |name: &str| {
        record.get(name).ok_or_else(|| {
            codec::CodecError::MalformedEnvelope(format!("条目缺少字段`{name}`"))
        })
    };
    let tensor = match Envelope::from_json(field("tensor")?)? {
        Envelope::Tensor(tensor) => codec::decode_tensor(&tensor)?,
        other => {
            return Err(codec::CodecError::MalformedEnvelope(format!(
                "`tensor`字段应为tensor信封，实际为{}",
                other.kind()
            )));
        }
    };
    let meta = codec::decode(&Envelope::from_json(field("meta")?)?)?;
    Ok(ConditioningEntry { tensor, meta })
}
