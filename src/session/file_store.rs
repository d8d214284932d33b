use super::storage::{normalize_value, SessionKey, SessionStorage, StorageError};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use time::OffsetDateTime;

pub const SESSION_STORE_FILE: &str = "clinic-admin-session.json";
const KEY_SAVED_AT: &str = "savedAt";

fn now_iso() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// JSON file backed session store. Every write rewrites the whole file via a
/// temp file + rename so a crash never leaves half a session behind.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    values: Mutex<BTreeMap<SessionKey, String>>,
}

impl FileStorage {
    /// Opens (or lazily creates) `clinic-admin-session.json` inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::open(dir.as_ref().join(SESSION_STORE_FILE))
    }

    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let values = if path.exists() {
            let data = std::fs::read_to_string(&path)?;
            parse_document(&data)?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// RFC 3339 time of the last write, if the file exists.
    pub fn saved_at(&self) -> Option<String> {
        let data = std::fs::read_to_string(&self.path).ok()?;
        let json: Value = serde_json::from_str(&data).ok()?;
        json.get(KEY_SAVED_AT)?.as_str().map(|s| s.to_string())
    }

    fn update<F>(&self, f: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut BTreeMap<SessionKey, String>),
    {
        let mut guard = match self.values.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!(path = %self.path.display(), "session file mutex poisoned; recovering");
                poisoned.into_inner()
            }
        };
        let mut next = guard.clone();
        f(&mut next);
        if next == *guard {
            return Ok(());
        }
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    fn persist(&self, values: &BTreeMap<SessionKey, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut doc = Map::new();
        for (key, value) in values {
            doc.insert(key.storage_name().to_string(), Value::String(value.clone()));
        }
        doc.insert(KEY_SAVED_AT.to_string(), Value::String(now_iso()));

        let bytes = serde_json::to_vec_pretty(&Value::Object(doc))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn parse_document(data: &str) -> Result<BTreeMap<SessionKey, String>, StorageError> {
    if data.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let json: Value = serde_json::from_str(data)?;
    let Some(obj) = json.as_object() else {
        return Ok(BTreeMap::new());
    };
    Ok(obj
        .iter()
        .filter_map(|(name, value)| {
            let key = SessionKey::from_storage_name(name)?;
            let value = normalize_value(value.as_str()?)?;
            Some((key, value))
        })
        .collect())
}

impl SessionStorage for FileStorage {
    fn get(&self, key: SessionKey) -> Result<Option<String>, StorageError> {
        let guard = match self.values.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(guard.get(&key).cloned())
    }

    fn set(&self, key: SessionKey, value: &str) -> Result<(), StorageError> {
        let value = normalize_value(value);
        self.update(|values| match value {
            Some(value) => {
                values.insert(key, value);
            }
            None => {
                values.remove(&key);
            }
        })
    }

    fn remove(&self, key: SessionKey) -> Result<(), StorageError> {
        self.update(|values| {
            values.remove(&key);
        })
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.update(|values| values.clear())
    }
}
