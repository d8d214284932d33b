use super::storage::{SessionKey, SessionStorage, StorageError};
use crate::types::{LoginResponse, SessionSnapshot, UserType};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Credentials read from storage before a request is dispatched.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub tenant_id: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &self.access_token.as_ref().map(|_| "<set>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<set>"))
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}

/// Explicit session context shared by the client and the auth flows.
#[derive(Clone)]
pub struct Session {
    storage: Arc<dyn SessionStorage>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(storage: impl SessionStorage + 'static) -> Self {
        Self {
            storage: Arc::new(storage),
        }
    }

    pub fn from_shared(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<dyn SessionStorage> {
        &self.storage
    }

    pub fn credentials(&self) -> Result<Credentials, StorageError> {
        Ok(Credentials {
            access_token: self.storage.get(SessionKey::AccessToken)?,
            refresh_token: self.storage.get(SessionKey::RefreshToken)?,
            tenant_id: self.storage.get(SessionKey::TenantId)?,
        })
    }

    pub fn access_token(&self) -> Result<Option<String>, StorageError> {
        self.storage.get(SessionKey::AccessToken)
    }

    pub fn refresh_token(&self) -> Result<Option<String>, StorageError> {
        self.storage.get(SessionKey::RefreshToken)
    }

    pub fn tenant_id(&self) -> Result<Option<String>, StorageError> {
        self.storage.get(SessionKey::TenantId)
    }

    /// Super admins switch clinics without signing in again.
    pub fn set_tenant_id(&self, tenant_id: Option<&str>) -> Result<(), StorageError> {
        match tenant_id {
            Some(id) => self.storage.set(SessionKey::TenantId, id),
            None => self.storage.remove(SessionKey::TenantId),
        }
    }

    pub(crate) fn store_refreshed_tokens(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), StorageError> {
        self.storage.set(SessionKey::AccessToken, access_token)?;
        if let Some(refresh_token) = refresh_token {
            self.storage.set(SessionKey::RefreshToken, refresh_token)?;
        }
        Ok(())
    }

    /// Writes everything a successful login returned. Keys the response left
    /// out are removed so nothing from a previous session leaks through.
    pub fn establish(&self, login: &LoginResponse) -> Result<(), StorageError> {
        self.set_or_remove(SessionKey::AccessToken, login.access_token())?;
        self.set_or_remove(SessionKey::RefreshToken, login.refresh_token.as_deref())?;
        self.set_or_remove(SessionKey::TenantId, login.clinic_id_string().as_deref())?;

        let user = match login.user.as_ref() {
            Some(user) if !user.is_null() => Some(serde_json::to_string(user)?),
            _ => None,
        };
        self.set_or_remove(SessionKey::User, user.as_deref())?;

        let user_type = login
            .user_type
            .as_deref()
            .map(|raw| UserType::parse(raw).map(UserType::as_str).unwrap_or(raw));
        self.set_or_remove(SessionKey::UserType, user_type)
    }

    fn set_or_remove(&self, key: SessionKey, value: Option<&str>) -> Result<(), StorageError> {
        match value {
            Some(value) => self.storage.set(key, value),
            None => self.storage.remove(key),
        }
    }

    pub fn purge(&self) -> Result<(), StorageError> {
        self.storage.clear()
    }

    /// Deserializes the stored user blob. A blob that no longer matches `T`
    /// reads as absent.
    pub fn user<T: DeserializeOwned>(&self) -> Result<Option<T>, StorageError> {
        let Some(raw) = self.storage.get(SessionKey::User)? else {
            return Ok(None);
        };
        Ok(serde_json::from_str(&raw).ok())
    }

    pub fn user_type(&self) -> Result<Option<UserType>, StorageError> {
        Ok(self
            .storage
            .get(SessionKey::UserType)?
            .and_then(|raw| UserType::parse(&raw)))
    }

    pub fn snapshot(&self) -> Result<SessionSnapshot, StorageError> {
        let credentials = self.credentials()?;
        Ok(SessionSnapshot {
            authenticated: credentials.access_token.is_some(),
            has_refresh_token: credentials.refresh_token.is_some(),
            tenant_id: credentials.tenant_id,
            user_type: self.user_type()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemoryStorage;
    use serde::Deserialize;
    use serde_json::json;

    fn login_response(value: serde_json::Value) -> LoginResponse {
        serde_json::from_value(value).unwrap()
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Admin {
        id: u32,
        name: String,
    }

    #[test]
    fn establish_writes_every_key() {
        let session = Session::new(MemoryStorage::new());
        session
            .establish(&login_response(json!({
                "token": "abc",
                "refreshToken": "r1",
                "clinicId": "c-9",
                "userType": "superadmin",
                "user": {"id": 1, "name": "Root"}
            })))
            .unwrap();

        let creds = session.credentials().unwrap();
        assert_eq!(creds.access_token.as_deref(), Some("abc"));
        assert_eq!(creds.refresh_token.as_deref(), Some("r1"));
        assert_eq!(creds.tenant_id.as_deref(), Some("c-9"));
        assert_eq!(session.user_type().unwrap(), Some(UserType::SuperAdmin));
        assert_eq!(
            session.user::<Admin>().unwrap(),
            Some(Admin {
                id: 1,
                name: "Root".to_string()
            })
        );
    }

    #[test]
    fn establish_drops_stale_keys_from_previous_session() {
        let storage = MemoryStorage::with_values([
            (SessionKey::RefreshToken, "old-r"),
            (SessionKey::TenantId, "old-clinic"),
        ]);
        let session = Session::new(storage);
        session
            .establish(&login_response(json!({"token": "fresh"})))
            .unwrap();

        let snapshot = session.snapshot().unwrap();
        assert!(snapshot.authenticated);
        assert!(!snapshot.has_refresh_token);
        assert_eq!(snapshot.tenant_id, None);
    }

    #[test]
    fn credentials_debug_hides_tokens() {
        let creds = Credentials {
            access_token: Some("abc".to_string()),
            refresh_token: None,
            tenant_id: Some("4".to_string()),
        };
        let out = format!("{creds:?}");
        assert!(!out.contains("abc"));
        assert!(out.contains("<set>"));
    }
}
