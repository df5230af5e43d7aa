//! 写入文件后扫描目录：结果中恰好出现一次，并按字典序排在其他文件之间

use jl_nodes::catalog::{FileCatalog, scan_files};
use jl_nodes::codec::Value;
use jl_nodes::conditioning::{ConditioningEntry, ConditioningLoadJson, ConditioningSaveJson};
use jl_nodes::paths::FolderPaths;
use jl_nodes::tensor::Tensor;

#[test]
fn test_saved_file_listed_once_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let paths = FolderPaths::new(dir.path());
    let conditioning_dir = paths.conditioning_dir();
    std::fs::create_dir_all(&conditioning_dir).unwrap();
    for name in ["a.json", "z.latent", "notes.txt"] {
        std::fs::write(conditioning_dir.join(name), b"[]").unwrap();
    }

    let entries = vec![ConditioningEntry::new(Tensor::new(&[1.], &[1]), Value::Null)];
    ConditioningSaveJson::new(paths.clone()).save(&entries, "m.json").unwrap();
    // 覆盖保存不会产生重复项
    ConditioningSaveJson::new(paths.clone()).save(&entries, "m.json").unwrap();

    let listed = scan_files(&conditioning_dir, &["json", "latent"], false);
    assert_eq!(listed, vec!["a.json", "m.json", "z.latent"]);
    assert_eq!(ConditioningLoadJson::new(paths).options(), vec!["a.json", "m.json"]);
}

#[test]
fn test_catalog_is_explicitly_invalidated() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.latent"), b"").unwrap();
    let mut catalog = FileCatalog::new(&["latent"], true);
    assert_eq!(catalog.entries(dir.path()), ["a.latent"]);
    assert!(catalog.is_cached_for(dir.path()));

    std::fs::write(dir.path().join("b.latent"), b"").unwrap();
    assert_eq!(catalog.entries(dir.path()), ["a.latent"]);

    catalog.invalidate();
    assert!(!catalog.is_cached_for(dir.path()));
    assert_eq!(catalog.entries(dir.path()), ["a.latent", "b.latent"]);

    // 换目录时重新扫描
    let other = tempfile::tempdir().unwrap();
    assert!(catalog.entries(other.path()).is_empty());
}
