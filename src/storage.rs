use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;

use crate::models::SettingsFile;

const SETTINGS_FILE: &str = "settings.json";
const BACKUP_DIR: &str = "backups";
const BACKUP_LIMIT: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("quota exceeded writing `{key}`: {needed} bytes > {limit} bytes")]
    QuotaExceeded {
        key: String,
        needed: usize,
        limit: usize,
    },
    #[error("invalid storage key `{0}`")]
    InvalidKey(String),
}

/// String key-value medium holding serialized documents.
pub trait KeyValueStore: Send + Sync {
    /// `Ok(None)` when nothing is stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    /// Removing a missing key succeeds.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// File-backed store: one `<key>.json` per key under `root`, plus settings and
/// rolling backups.
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn ensure_dirs(&self) -> Result<(), StorageError> {
        fs::create_dir_all(self.root.join(BACKUP_DIR))?;
        Ok(())
    }

    pub fn load_settings(&self) -> Result<SettingsFile, StorageError> {
        self.load_json(self.root.join(SETTINGS_FILE))
    }

    pub fn save_settings(&self, data: &SettingsFile) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(data)?;
        write_atomic(&self.root.join(SETTINGS_FILE), &json)
    }

    fn load_json<T: DeserializeOwned>(&self, path: PathBuf) -> Result<T, StorageError> {
        let mut file = File::open(path)?;
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        Ok(serde_json::from_str(&buf)?)
    }

    fn key_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.json")))
    }

    /// Copies the current value of `key` into the backup directory. Returns the
    /// backup file name, or `None` when nothing is stored yet.
    pub fn create_backup(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.key_path(key)?;
        if !path.exists() {
            return Ok(None);
        }
        fs::create_dir_all(self.root.join(BACKUP_DIR))?;
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S-%3f").to_string();
        let backup_name = format!("{key}-{timestamp}.json");
        fs::copy(&path, self.root.join(BACKUP_DIR).join(&backup_name))?;
        self.trim_backups()?;
        log::info!("backup created key={key} name={backup_name}");
        Ok(Some(backup_name))
    }

    /// Backup names with their modification time (unix seconds), oldest first.
    pub fn list_backups(&self) -> Result<Vec<(String, i64)>, StorageError> {
        let mut results = Vec::new();
        for entry in self.sorted_backup_entries()? {
            if let Some(name) = entry.file_name().to_str() {
                let modified = entry
                    .metadata()
                    .and_then(|m| m.modified())
                    .ok()
                    .and_then(|time| time.duration_since(std::time::UNIX_EPOCH).ok())
                    .map(|dur| dur.as_secs() as i64)
                    .unwrap_or(0);
                results.push((name.to_string(), modified));
            }
        }
        Ok(results)
    }

    /// Reads a backup by file name. Names with path separators are rejected.
    pub fn read_backup(&self, filename: &str) -> Result<String, StorageError> {
        if filename.contains(['/', '\\']) || filename.starts_with('.') {
            return Err(StorageError::InvalidKey(filename.to_string()));
        }
        Ok(fs::read_to_string(self.root.join(BACKUP_DIR).join(filename))?)
    }

    fn sorted_backup_entries(&self) -> Result<Vec<fs::DirEntry>, StorageError> {
        let mut entries: Vec<_> = fs::read_dir(self.root.join(BACKUP_DIR))?
            .filter_map(|entry| entry.ok())
            .collect();
        entries.sort_by_key(|entry| {
            (
                entry.metadata().and_then(|m| m.modified()).ok(),
                entry.file_name(),
            )
        });
        Ok(entries)
    }

    fn trim_backups(&self) -> Result<(), StorageError> {
        let entries = self.sorted_backup_entries()?;
        let to_remove = entries.len().saturating_sub(BACKUP_LIMIT);
        for entry in entries.into_iter().take(to_remove) {
            let _ = fs::remove_file(entry.path());
        }
        Ok(())
    }
}

impl KeyValueStore for Storage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.key_path(key)?;
        match fs::read_to_string(path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.key_path(key)?;
        fs::create_dir_all(&self.root)?;
        write_atomic(&path, value.as_bytes())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.key_path(key)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Temp file + rename so readers never observe a half-written document.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let temp_path = path.with_extension("tmp");
    {
        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(temp_path, path)?;
    Ok(())
}

/// In-memory store with an optional byte quota across all keys, mirroring
/// browser storage limits.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self.entries.lock().expect("store poisoned");
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self.entries.lock().expect("store poisoned");
        if let Some(limit) = self.quota_bytes {
            let others: usize = guard
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > limit {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    limit,
                });
            }
        }
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self.entries.lock().expect("store poisoned");
        guard.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Settings;

    fn make_storage() -> (tempfile::TempDir, Storage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().to_path_buf());
        storage.ensure_dirs().unwrap();
        (dir, storage)
    }

    #[test]
    fn file_store_get_set_remove() {
        let (dir, storage) = make_storage();
        assert_eq!(storage.get("data").unwrap(), None);

        storage.set("data", "{\"a\":1}").unwrap();
        assert_eq!(storage.get("data").unwrap().as_deref(), Some("{\"a\":1}"));
        assert!(dir.path().join("data.json").is_file());
        assert!(!dir.path().join("data.tmp").exists());

        storage.remove("data").unwrap();
        assert_eq!(storage.get("data").unwrap(), None);
        storage.remove("data").unwrap();
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let (_dir, storage) = make_storage();
        for key in ["", "../escape", "a/b", ".hidden"] {
            assert!(matches!(
                storage.set(key, "x"),
                Err(StorageError::InvalidKey(_))
            ));
        }
    }

    #[test]
    fn settings_round_trip() {
        let (_dir, storage) = make_storage();
        assert!(storage.load_settings().is_err());

        let mut settings = Settings::default();
        settings.tick_seconds = 5;
        storage
            .save_settings(&SettingsFile {
                schema_version: 1,
                settings: settings.clone(),
            })
            .unwrap();
        let loaded = storage.load_settings().unwrap();
        assert_eq!(loaded.schema_version, 1);
        assert_eq!(loaded.settings, settings);
    }

    #[test]
    fn backups_are_created_trimmed_and_readable() {
        let (_dir, storage) = make_storage();
        assert_eq!(storage.create_backup("data").unwrap(), None);

        storage.set("data", "v0").unwrap();
        let first = storage.create_backup("data").unwrap().expect("backup name");
        for i in 1..=BACKUP_LIMIT + 1 {
            storage.set("data", &format!("v{i}")).unwrap();
            std::thread::sleep(std::time::Duration::from_millis(5));
            storage.create_backup("data").unwrap();
        }
        let backups = storage.list_backups().unwrap();
        assert_eq!(backups.len(), BACKUP_LIMIT);
        assert!(backups.iter().all(|(name, _)| name != &first));

        let (newest, _) = backups.last().unwrap().clone();
        storage.set("data", "overwritten").unwrap();
        let restored = storage.read_backup(&newest).unwrap();
        assert_eq!(restored, format!("v{}", BACKUP_LIMIT + 1));

        assert!(matches!(
            storage.read_backup("../data.json"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(storage.read_backup("missing.json").is_err());
    }

    #[test]
    fn memory_store_enforces_quota() {
        let store = MemoryStore::with_quota(16);
        store.set("k", "0123456789").unwrap();
        // Replacing a key only counts the new value.
        store.set("k", "abcdefghij").unwrap();
        let err = store.set("other", "0123456789").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { limit: 16, .. }));
        assert_eq!(store.get("other").unwrap(), None);

        store.remove("k").unwrap();
        store.set("other", "0123456789").unwrap();
    }
}
