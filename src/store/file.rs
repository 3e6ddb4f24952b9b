use super::{DurableStore, Entry, StoreError, StoreResult};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One JSON file per key inside a directory.
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// crash mid-write leaves the previous value readable.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }

    fn remove(path: &Path) -> StoreResult<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl DurableStore for FileStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.path_for(key)?;
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let entry: Entry = serde_json::from_str(&raw)?;
        if entry.is_expired(Utc::now()) {
            tracing::debug!("Stored key {} expired, removing", key);
            Self::remove(&path)?;
            return Ok(None);
        }
        Ok(Some(entry.value))
    }

    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        let path = self.path_for(key)?;
        let entry = Entry::new(value, ttl);
        if entry.is_expired(Utc::now()) {
            return Self::remove(&path);
        }

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec(&entry)?)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_roundtrip_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.set("game", "{\"a\":1}", None).unwrap();

        let reopened = FileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get("game").unwrap(), Some("{\"a\":1}".to_string()));
    }

    #[test]
    fn test_file_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.set("game", "v", Some(Duration::from_secs(3600))).unwrap();
        assert!(dir.path().join("game.json").exists());

        store.clear("game").unwrap();
        assert!(!dir.path().join("game.json").exists());
        assert_eq!(store.get("game").unwrap(), None);

        // Clearing twice is fine
        store.clear("game").unwrap();
    }

    #[test]
    fn test_file_expired_entry_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let stale = Entry {
            value: "old".to_string(),
            expires_at: Some(Utc::now() - chrono::Duration::seconds(5)),
        };
        std::fs::write(
            dir.path().join("game.json"),
            serde_json::to_string(&stale).unwrap(),
        )
        .unwrap();

        assert_eq!(store.get("game").unwrap(), None);
        assert!(!dir.path().join("game.json").exists());
    }

    #[test]
    fn test_file_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.set("../escape", "v", None),
            Err(StoreError::InvalidKey(_))
        ));
        assert!(store.get("").is_err());
    }

    #[test]
    fn test_file_unreadable_entry_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        std::fs::write(dir.path().join("game.json"), "garbage").unwrap();
        assert!(matches!(store.get("game"), Err(StoreError::Encoding(_))));
    }
}
