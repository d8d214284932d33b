use crate::client::{ApiClient, HttpMethod, HttpRequest};
use crate::error::{ApiError, ApiResult};
use crate::navigation::{NavigationReason, NavigationRequest};
use crate::types::{LoginRequest, LoginResponse, SessionSnapshot};

impl ApiClient {
    /// Signs in and writes the returned credentials to the session.
    ///
    /// Goes straight to the transport: a 401 here means bad credentials, not
    /// an expired session, so it must not trigger a refresh or a redirect.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<SessionSnapshot> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(ApiError::InvalidRequest(
                "email and password are required".to_string(),
            ));
        }

        let body = serde_json::to_vec(&LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })?;
        let tenant_id = self.session().tenant_id()?;
        let headers = crate::client::plain_headers(self.config(), tenant_id.as_deref())?;
        let request = HttpRequest {
            method: HttpMethod::Post,
            url: self.config().endpoint(&self.config().login_path),
            headers,
            body: Some(body),
        };

        let response = self
            .transport()
            .send(request)
            .await
            .map_err(ApiError::network)?;
        if !response.is_success() {
            tracing::info!(status = response.status, "login rejected");
            return Err(ApiError::from_response(response.status, &response.body));
        }

        let login: LoginResponse = serde_json::from_str(&response.body)?;
        if login.access_token().is_none() {
            return Err(ApiError::InvalidRequest(
                "login response carried an empty token".to_string(),
            ));
        }
        self.session().establish(&login)?;

        let snapshot = self.session().snapshot()?;
        tracing::info!(
            tenant_id = ?snapshot.tenant_id,
            user_type = ?snapshot.user_type,
            "signed in"
        );
        Ok(snapshot)
    }

    /// Local sign-out: clears every session key and sends the shell to the
    /// login route. The redirect happens even if clearing storage failed.
    pub fn logout(&self) -> ApiResult<()> {
        let purged = self.session().purge();
        self.navigator().navigate(NavigationRequest {
            route: self.config().login_route.clone(),
            reason: NavigationReason::LoggedOut,
        });
        tracing::info!("signed out");
        Ok(purged?)
    }
}

#[cfg(test)]
mod tests {
    use crate::client::testing::{reply, ScriptedTransport};
    use crate::client::ApiClient;
    use crate::config::ClientConfig;
    use crate::error::ApiError;
    use crate::navigation::{NavigationBus, NavigationReason};
    use crate::session::{MemoryStorage, Session, SessionKey};
    use crate::types::UserType;
    use serde_json::json;

    const LOGIN: &str = "/api/auth/login";

    fn client(
        storage: MemoryStorage,
        transport: ScriptedTransport,
    ) -> (
        ApiClient,
        tokio::sync::mpsc::UnboundedReceiver<crate::navigation::NavigationRequest>,
    ) {
        let (bus, rx) = NavigationBus::new();
        let config = ClientConfig::new("https://admin.example.com").unwrap();
        (
            ApiClient::with_transport(config, Session::new(storage), transport, bus),
            rx,
        )
    }

    #[tokio::test]
    async fn login_establishes_session() {
        let transport = ScriptedTransport::new().on(
            LOGIN,
            [reply(
                200,
                r#"{"token":"abc","refreshToken":"r1","clinicId":7,"userType":"clinic_admin","user":{"id":2}}"#,
            )],
        );
        let (client, _rx) = client(MemoryStorage::new(), transport.clone());

        let snapshot = client.login("admin@clinic.test", "pw").await.unwrap();

        assert!(snapshot.authenticated);
        assert!(snapshot.has_refresh_token);
        assert_eq!(snapshot.tenant_id.as_deref(), Some("7"));
        assert_eq!(snapshot.user_type, Some(UserType::ClinicAdmin));

        let sent = transport.sent_to(LOGIN);
        assert_eq!(
            sent[0].body,
            Some(json!({"email": "admin@clinic.test", "password": "pw"}))
        );
        assert!(sent[0].authorization.is_none());
    }

    #[tokio::test]
    async fn login_accepts_token_and_clinic_under_every_key() {
        let transport = ScriptedTransport::new().on(
            LOGIN,
            [reply(
                200,
                r#"{"token":"abc","accessToken":"abc","clinicId":7,"tenantId":"7","userType":"staff"}"#,
            )],
        );
        let (client, _rx) = client(MemoryStorage::new(), transport);

        let snapshot = client.login("staff@clinic.test", "pw").await.unwrap();

        assert!(snapshot.authenticated);
        assert_eq!(snapshot.tenant_id.as_deref(), Some("7"));
        assert_eq!(
            client.session().access_token().unwrap().as_deref(),
            Some("abc")
        );
    }

    #[tokio::test]
    async fn rejected_login_does_not_refresh_or_redirect() {
        let storage = MemoryStorage::with_values([(SessionKey::RefreshToken, "r-old")]);
        let transport = ScriptedTransport::new()
            .on(LOGIN, [reply(401, r#"{"message":"Invalid email or password"}"#)]);
        let (client, mut rx) = client(storage, transport.clone());

        let err = client.login("admin@clinic.test", "nope").await.unwrap_err();

        assert!(matches!(err, ApiError::Request { status: 401, .. }));
        assert_eq!(err.to_string(), "Invalid email or password");
        assert_eq!(transport.sent().len(), 1);
        assert!(rx.try_recv().is_err());
        assert_eq!(
            client.session().refresh_token().unwrap().as_deref(),
            Some("r-old")
        );
    }

    #[tokio::test]
    async fn login_requires_credentials() {
        let (client, _rx) = client(MemoryStorage::new(), ScriptedTransport::new());
        assert!(matches!(
            client.login("  ", "pw").await,
            Err(ApiError::InvalidRequest(_))
        ));
    }

    #[test]
    fn logout_clears_session_and_redirects() {
        let storage = MemoryStorage::with_values([
            (SessionKey::AccessToken, "abc"),
            (SessionKey::RefreshToken, "r1"),
            (SessionKey::TenantId, "7"),
        ]);
        let (client, mut rx) = client(storage, ScriptedTransport::new());

        client.logout().unwrap();

        assert!(!client.session().snapshot().unwrap().authenticated);
        assert_eq!(client.session().tenant_id().unwrap(), None);
        let nav = rx.try_recv().unwrap();
        assert_eq!(nav.reason, NavigationReason::LoggedOut);
        assert_eq!(nav.route, "/");
    }
}
