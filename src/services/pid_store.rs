use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 进程名 -> PID
pub type PidMap = BTreeMap<String, u32>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write PID store {path}")]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to serialize PID store")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to lock PID store {path}")]
    Lock { path: PathBuf, source: io::Error },
    #[error("lock task was cancelled")]
    LockTask,
}

/// 持久化文件格式：{"PIDs": {...}}
#[derive(Serialize, Deserialize, Default)]
struct StoreDocument {
    #[serde(rename = "PIDs", default)]
    pids: PidMap,
}

/// 在文件名后追加后缀，得到同目录下的兄弟文件
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

/// 基于 JSON 文件的 PID 存储，请求之间唯一的共享状态
#[derive(Debug, Clone)]
pub struct PidStore {
    path: PathBuf,
    lock_path: PathBuf,
}

/// 持有期间独占（或共享）存储；drop 时释放
#[derive(Debug)]
pub struct StoreLock {
    file: File,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

impl PidStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        // 数据文件会被 rename 替换，锁必须加在独立的文件上
        let lock_path = sibling(&path, ".lock");

        Self { path, lock_path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取映射；文件不存在或内容损坏时返回空映射
    pub fn load(&self) -> PidMap {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return PidMap::new(),
            Err(e) => {
                log::warn!("Cannot read PID store {:?}, treating as empty: {}", self.path, e);
                return PidMap::new();
            }
        };

        match serde_json::from_str::<StoreDocument>(&contents) {
            Ok(doc) => doc.pids,
            Err(e) => {
                log::warn!("Malformed PID store {:?}, treating as empty: {}", self.path, e);
                PidMap::new()
            }
        }
    }

    /// 整体覆盖写入：先写临时文件再 rename，失败时旧内容保持不变
    pub fn save(&self, pids: &PidMap) -> Result<(), StoreError> {
        let doc = StoreDocument { pids: pids.clone() };
        let contents = serde_json::to_string(&doc)?;

        let write_err = |source: io::Error| StoreError::Write { path: self.path.clone(), source };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let temp_path = self.temp_path();
        let mut file = File::create(&temp_path).map_err(write_err)?;
        file.write_all(contents.as_bytes()).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;
        drop(file);

        if let Err(e) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(write_err(e));
        }

        log::debug!("PID store {:?} written with {} entries", self.path, pids.len());
        Ok(())
    }

    /// 临时文件：文件名追加 .tmp，不会与目标文件重名
    fn temp_path(&self) -> PathBuf {
        sibling(&self.path, ".tmp")
    }

    fn open_lock_file(&self) -> Result<File, StoreError> {
        if let Some(parent) = self.lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::Lock {
                path: self.lock_path.clone(),
                source,
            })?;
        }

        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(|source| StoreError::Lock { path: self.lock_path.clone(), source })
    }

    /// 阻塞直到拿到独占锁（Load + 修改 + Save 全程持有）
    pub fn lock_exclusive(&self) -> Result<StoreLock, StoreError> {
        let file = self.open_lock_file()?;
        FileExt::lock_exclusive(&file)
            .map_err(|source| StoreError::Lock { path: self.lock_path.clone(), source })?;
        Ok(StoreLock { file })
    }

    /// 阻塞直到拿到共享锁（只读场景）
    pub fn lock_shared(&self) -> Result<StoreLock, StoreError> {
        let file = self.open_lock_file()?;
        FileExt::lock_shared(&file)
            .map_err(|source| StoreError::Lock { path: self.lock_path.clone(), source })?;
        Ok(StoreLock { file })
    }

    /// 在阻塞线程池里等锁，避免占住 async worker
    pub async fn acquire(&self, exclusive: bool) -> Result<StoreLock, StoreError> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || {
            if exclusive {
                store.lock_exclusive()
            } else {
                store.lock_shared()
            }
        })
        .await
        .map_err(|_| StoreError::LockTask)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> PidStore {
        PidStore::new(dir.path().join("process_info.json"))
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(store_in(&dir).load().is_empty());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let mut pids = PidMap::new();
        pids.insert("CALC".to_string(), 4242);
        pids.insert("DB".to_string(), 1);
        pids.insert("custom".to_string(), i32::MAX as u32);

        store.save(&pids).unwrap();
        assert_eq!(store.load(), pids);
    }

    #[test]
    fn test_document_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let mut pids = PidMap::new();
        pids.insert("SIM".to_string(), 77);
        store.save(&pids).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, serde_json::json!({ "PIDs": { "SIM": 77 } }));
    }

    #[test]
    fn test_malformed_content_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        fs::write(store.path(), "{not json").unwrap();
        assert!(store.load().is_empty());

        fs::write(store.path(), r#"{"PIDs": {"CALC": "abc"}}"#).unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_missing_pids_key_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        fs::write(store.path(), r#"{"other": 1}"#).unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_save_overwrites_and_cleans_temp() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let mut first = PidMap::new();
        first.insert("CALC".to_string(), 10);
        first.insert("DB".to_string(), 11);
        store.save(&first).unwrap();

        let mut second = PidMap::new();
        second.insert("SIM".to_string(), 12);
        store.save(&second).unwrap();

        assert_eq!(store.load(), second);
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn test_save_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = PidStore::new(dir.path().join("state").join("pids.json"));

        store.save(&PidMap::new()).unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn test_failed_save_keeps_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let mut pids = PidMap::new();
        pids.insert("CALC".to_string(), 99);
        store.save(&pids).unwrap();

        // 临时文件路径被目录占用，写入必然失败
        fs::create_dir(store.temp_path()).unwrap();
        let mut other = PidMap::new();
        other.insert("DB".to_string(), 100);
        assert!(store.save(&other).is_err());

        assert_eq!(store.load(), pids);
    }

    #[test]
    fn test_exclusive_lock_blocks_other_holders() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let guard = store.lock_exclusive().unwrap();

        let probe = OpenOptions::new().write(true).open(&store.lock_path).unwrap();
        assert!(FileExt::try_lock_exclusive(&probe).is_err());
        assert!(FileExt::try_lock_shared(&probe).is_err());

        drop(guard);
        assert!(FileExt::try_lock_exclusive(&probe).is_ok());
    }

    #[test]
    fn test_shared_locks_coexist() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let _a = store.lock_shared().unwrap();
        let _b = store.lock_shared().unwrap();

        let probe = OpenOptions::new().write(true).open(&store.lock_path).unwrap();
        assert!(FileExt::try_lock_exclusive(&probe).is_err());
    }

    #[test]
    fn test_temp_file_never_aliases_target() {
        let dir = tempfile::tempdir().unwrap();
        let store = PidStore::new(dir.path().join("pids.tmp"));

        let mut pids = PidMap::new();
        pids.insert("CALC".to_string(), 5);
        store.save(&pids).unwrap();

        assert_ne!(store.temp_path(), store.path().to_path_buf());
        assert_eq!(store.load(), pids);

        let json = PidStore::new(dir.path().join("a.json"));
        let txt = PidStore::new(dir.path().join("a.txt"));
        assert_ne!(json.temp_path(), txt.temp_path());
    }

    #[test]
    fn test_write_error_does_not_repeat_cause() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::create_dir(store.temp_path()).unwrap();

        let err = store.save(&PidMap::new()).unwrap_err();
        let cause = std::error::Error::source(&err).unwrap().to_string();
        let rendered = format!("{:#}", anyhow::Error::new(err));

        assert_eq!(rendered.matches(cause.as_str()).count(), 1, "{}", rendered);
    }
}
