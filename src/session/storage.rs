use thiserror::Error;

/// Keys persisted for a signed-in admin. Storage names match what the web
/// frontend keeps in local storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SessionKey {
    AccessToken,
    RefreshToken,
    TenantId,
    User,
    UserType,
}

impl SessionKey {
    pub const ALL: [SessionKey; 5] = [
        SessionKey::AccessToken,
        SessionKey::RefreshToken,
        SessionKey::TenantId,
        SessionKey::User,
        SessionKey::UserType,
    ];

    pub fn storage_name(self) -> &'static str {
        match self {
            Self::AccessToken => "token",
            Self::RefreshToken => "refreshToken",
            Self::TenantId => "clinicId",
            Self::User => "user",
            Self::UserType => "userType",
        }
    }

    pub fn from_storage_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.storage_name() == name)
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid session file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("OS keychain/secret service is unavailable")]
    KeychainUnavailable,
    #[error("keychain error: {0}")]
    Keychain(String),
}

/// Persisted key-value store holding the session.
///
/// Implementations treat blank values as absent and must make `remove` of a
/// missing key a no-op.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: SessionKey) -> Result<Option<String>, StorageError>;

    fn set(&self, key: SessionKey, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: SessionKey) -> Result<(), StorageError>;

    /// Removes every session key. Keeps going after a failed key and reports
    /// the first error.
    fn clear(&self) -> Result<(), StorageError> {
        let mut first_err = None;
        for key in SessionKey::ALL {
            if let Err(err) = self.remove(key) {
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

pub(crate) fn normalize_value(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_names_round_trip() {
        for key in SessionKey::ALL {
            assert_eq!(SessionKey::from_storage_name(key.storage_name()), Some(key));
        }
        assert_eq!(SessionKey::from_storage_name("savedAt"), None);
    }
}
