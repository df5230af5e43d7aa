//! 目录扫描与供选择列表使用的缓存。
//! 缓存只服务于界面下拉列表，编解码与上传路径从不读取它。

use std::path::{Path, PathBuf};

/// 扫描`dir`下扩展名属于`extensions`的文件，返回以`/`分隔的相对路径，按字典序排序。
/// 目录不存在时返回空列表；无法读取的目录项会被跳过。
pub fn scan_files(dir: &Path, extensions: &[&str], recursive: bool) -> Vec<String> {
    let mut results = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let entries = match std::fs::read_dir(&current) {
            Ok(entries) => entries,
            Err(e) => {
                if current != dir {
                    tracing::debug!(dir = %current.display(), error = %e, "无法读取目录，已跳过");
                }
                continue;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                if recursive {
                    pending.push(path);
                }
                continue;
            }
            if !has_extension(&path, extensions) {
                continue;
            }
            if let Ok(relative) = path.strip_prefix(dir) {
                results.push(relative.to_string_lossy().replace('\\', "/"));
            }
        }
    }

    results.sort();
    results
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.contains(&ext))
}

/// 目录列表的缓存，以上一次扫描的目录为键。
/// 目录变化或缓存为空时重新扫描；也可以调用`invalidate()`显式作废。
#[derive(Debug, Clone)]
pub struct FileCatalog {
    extensions: Vec<String>,
    recursive: bool,
    cached_dir: Option<PathBuf>,
    entries: Vec<String>,
}

impl FileCatalog {
    pub fn new(extensions: &[&str], recursive: bool) -> Self {
        Self {
            extensions: extensions.iter().map(|ext| ext.to_string()).collect(),
            recursive,
            cached_dir: None,
            entries: Vec::new(),
        }
    }

    pub fn entries(&mut self, dir: &Path) -> &[String] {
        if self.cached_dir.as_deref() != Some(dir) || self.entries.is_empty() {
            let extensions = self.extensions.iter().map(String::as_str).collect::<Vec<_>>();
            self.entries = scan_files(dir, &extensions, self.recursive);
            self.cached_dir = Some(dir.to_path_buf());
        }
        &self.entries
    }

    pub fn invalidate(&mut self) {
        self.cached_dir = None;
        self.entries.clear();
    }

    pub fn is_cached_for(&self, dir: &Path) -> bool {
        self.cached_dir.as_deref() == Some(dir)
    }
}
