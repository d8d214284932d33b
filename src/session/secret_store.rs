use super::storage::{normalize_value, SessionKey, SessionStorage, StorageError};
use std::collections::HashMap;

pub const KEYRING_SERVICE: &str = "com.softaworks.clinic-admin";

/// OS keychain backed storage: one keychain entry per session key, all under
/// the same service name.
pub struct KeyringStorage {
    service: String,
    entries: HashMap<SessionKey, keyring::Entry>,
}

impl std::fmt::Debug for KeyringStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyringStorage")
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

fn map_keyring_error(err: keyring::Error) -> StorageError {
    match err {
        keyring::Error::NoStorageAccess(_) | keyring::Error::PlatformFailure(_) => {
            StorageError::KeychainUnavailable
        }
        other => StorageError::Keychain(other.to_string()),
    }
}

impl KeyringStorage {
    pub fn new() -> Result<Self, StorageError> {
        Self::with_service(KEYRING_SERVICE)
    }

    pub fn with_service(service: impl Into<String>) -> Result<Self, StorageError> {
        let service = service.into();
        let mut entries = HashMap::new();
        for key in SessionKey::ALL {
            let entry =
                keyring::Entry::new(&service, key.storage_name()).map_err(map_keyring_error)?;
            entries.insert(key, entry);
        }
        Ok(Self { service, entries })
    }

    fn entry(&self, key: SessionKey) -> Result<&keyring::Entry, StorageError> {
        self.entries
            .get(&key)
            .ok_or_else(|| StorageError::Keychain(format!("no entry for {}", key.storage_name())))
    }

    /// Probes the keychain without touching stored values.
    pub fn is_available(&self) -> bool {
        let Ok(entry) = self.entry(SessionKey::AccessToken) else {
            return false;
        };

        match entry.get_password() {
            Ok(_) => true,
            Err(keyring::Error::NoEntry) => true,
            Err(keyring::Error::BadEncoding(_)) => true,
            Err(keyring::Error::Ambiguous(_)) => true,
            Err(keyring::Error::NoStorageAccess(_)) => false,
            Err(keyring::Error::PlatformFailure(_)) => false,
            Err(_) => false,
        }
    }
}

impl SessionStorage for KeyringStorage {
    fn get(&self, key: SessionKey) -> Result<Option<String>, StorageError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(normalize_value(&value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(keyring::Error::BadEncoding(_)) => Ok(None),
            Err(err) => Err(map_keyring_error(err)),
        }
    }

    fn set(&self, key: SessionKey, value: &str) -> Result<(), StorageError> {
        let Some(value) = normalize_value(value) else {
            return self.remove(key);
        };
        self.entry(key)?
            .set_password(&value)
            .map_err(map_keyring_error)
    }

    fn remove(&self, key: SessionKey) -> Result<(), StorageError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(map_keyring_error(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_storage() -> KeyringStorage {
        keyring::set_default_credential_builder(keyring::mock::default_credential_builder());
        KeyringStorage::with_service("clinic-admin-test").unwrap()
    }

    #[test]
    fn set_get_remove_through_mock_keychain() {
        let storage = mock_storage();
        assert!(storage.is_available());
        assert_eq!(storage.get(SessionKey::RefreshToken).unwrap(), None);

        storage.set(SessionKey::RefreshToken, "r1").unwrap();
        assert_eq!(
            storage.get(SessionKey::RefreshToken).unwrap().as_deref(),
            Some("r1")
        );

        storage.remove(SessionKey::RefreshToken).unwrap();
        assert_eq!(storage.get(SessionKey::RefreshToken).unwrap(), None);
        storage.remove(SessionKey::RefreshToken).unwrap();
    }

    #[test]
    fn clear_removes_all_entries() {
        let storage = mock_storage();
        storage.set(SessionKey::AccessToken, "abc").unwrap();
        storage.set(SessionKey::TenantId, "3").unwrap();
        storage.clear().unwrap();
        for key in SessionKey::ALL {
            assert_eq!(storage.get(key).unwrap(), None);
        }
    }
}
