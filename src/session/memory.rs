use super::storage::{normalize_value, SessionKey, SessionStorage, StorageError};
use std::collections::HashMap;
use std::sync::Mutex;

/// Process-local storage. Used by tests and by shells that do not persist
/// sessions across restarts.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<SessionKey, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<'a>(values: impl IntoIterator<Item = (SessionKey, &'a str)>) -> Self {
        let storage = Self::new();
        {
            let mut guard = storage.lock();
            for (key, value) in values {
                if let Some(value) = normalize_value(value) {
                    guard.insert(key, value);
                }
            }
        }
        storage
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SessionKey, String>> {
        match self.values.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!("session memory storage mutex poisoned; recovering");
                poisoned.into_inner()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: SessionKey) -> Result<Option<String>, StorageError> {
        Ok(self.lock().get(&key).cloned())
    }

    fn set(&self, key: SessionKey, value: &str) -> Result<(), StorageError> {
        let mut guard = self.lock();
        match normalize_value(value) {
            Some(value) => guard.insert(key, value),
            None => guard.remove(&key),
        };
        Ok(())
    }

    fn remove(&self, key: SessionKey) -> Result<(), StorageError> {
        self.lock().remove(&key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.lock().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_are_not_stored() {
        let storage = MemoryStorage::new();
        storage.set(SessionKey::TenantId, "  ").unwrap();
        assert_eq!(storage.get(SessionKey::TenantId).unwrap(), None);

        storage.set(SessionKey::TenantId, " 12 ").unwrap();
        assert_eq!(storage.get(SessionKey::TenantId).unwrap().as_deref(), Some("12"));
    }

    #[test]
    fn clear_drops_every_key() {
        let storage = MemoryStorage::with_values([
            (SessionKey::AccessToken, "abc"),
            (SessionKey::RefreshToken, "r1"),
            (SessionKey::UserType, "super_admin"),
        ]);
        storage.clear().unwrap();
        assert!(storage.is_empty());
    }
}
