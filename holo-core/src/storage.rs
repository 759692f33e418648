//! # Storage 模块
//!
//! 键值存储抽象。文档以 JSON 文本整体读写，不做部分写入。
//!
//! ## 后端
//!
//! - [`MemoryStorage`]：进程内存，用于测试
//! - [`FileStorage`]：每个键一个 `<key>.json` 文件
//!
//! ```text
//! data/
//! └── shinecard-editor-v2.json
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// 持久化文档的存储键
pub const STORAGE_KEY: &str = "shinecard-editor-v2";

/// 键值存储
pub trait Storage {
    /// 读取键对应的文本，不存在时返回 `None`
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// 整体写入
    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// 删除键（不存在时不报错）
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// 内存存储
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置一个键值
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// 直接查看存储内容
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// 文件存储
#[derive(Debug, Clone)]
pub struct FileStorage {
    /// 存储目录
    dir: PathBuf,
}

impl FileStorage {
    /// 创建文件存储（目录在首次写入时创建）
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 键对应的文件路径
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn ensure_dir(&self) -> Result<(), StorageError> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)
                .map_err(|e| StorageError::Io(format!("无法创建存储目录: {}", e)))?;
        }
        Ok(())
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .map_err(|e| StorageError::Io(format!("无法读取 {:?}: {}", path, e)))
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.ensure_dir()?;
        let path = self.path_for(key);
        fs::write(&path, value)
            .map_err(|e| StorageError::Io(format!("无法写入 {:?}: {}", path, e)))
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(&path)
                .map_err(|e| StorageError::Io(format!("无法删除 {:?}: {}", path, e)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage() {
        let mut storage = MemoryStorage::new();
        assert_eq!(storage.read("k").unwrap(), None);
        storage.write("k", "v").unwrap();
        assert_eq!(storage.read("k").unwrap().as_deref(), Some("v"));
        storage.remove("k").unwrap();
        assert_eq!(storage.get("k"), None);
    }

    #[test]
    fn test_file_storage_roundtrip() {
        let temp = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(temp.path().join("nested"));

        assert_eq!(storage.read(STORAGE_KEY).unwrap(), None);
        storage.write(STORAGE_KEY, "{}").unwrap();
        assert!(storage.path_for(STORAGE_KEY).ends_with("shinecard-editor-v2.json"));
        assert_eq!(storage.read(STORAGE_KEY).unwrap().as_deref(), Some("{}"));

        storage.remove(STORAGE_KEY).unwrap();
        storage.remove(STORAGE_KEY).unwrap();
        assert_eq!(storage.read(STORAGE_KEY).unwrap(), None);
    }
}
