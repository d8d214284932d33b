use super::transport::HttpRequest;
use super::{plain_headers, ApiClient, HttpMethod};
use crate::config::RefreshPolicy;
use crate::error::{backend_message, ApiResult};
use crate::redact::redact_secrets;
use crate::types::{RefreshRequestBody, RefreshResponseBody};
use serde_json::Value;

/// Why a refresh exchange did not produce a token.
#[derive(Debug)]
pub(crate) struct RefreshFailure {
    reason: String,
    /// Message the refresh endpoint returned, when it returned one.
    pub(crate) backend_message: Option<String>,
}

impl RefreshFailure {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            backend_message: None,
        }
    }
}

impl std::fmt::Display for RefreshFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&redact_secrets(&self.reason))
    }
}

impl ApiClient {
    /// A token to retry with after a 401. `stored_before` is the access token
    /// storage held when the rejected attempt read its credentials, which is
    /// not necessarily the bearer it sent (see [`RequestDescriptor::token`]).
    ///
    /// [`RequestDescriptor::token`]: super::RequestDescriptor::token
    pub(crate) async fn obtain_fresh_token(
        &self,
        refresh_token: Option<&str>,
        stored_before: Option<&str>,
    ) -> Result<String, RefreshFailure> {
        match self.config().refresh_policy {
            RefreshPolicy::PerRequest => {
                let refresh_token =
                    refresh_token.ok_or_else(|| RefreshFailure::new("no refresh token stored"))?;
                self.exchange_refresh_token(refresh_token).await
            }
            RefreshPolicy::SingleFlight => {
                let _gate = self.inner.refresh_gate.lock().await;

                let current = self
                    .session()
                    .access_token()
                    .map_err(|e| RefreshFailure::new(format!("session read failed: {e}")))?;
                if let Some(current) = current {
                    if Some(current.as_str()) != stored_before {
                        tracing::debug!("access token already refreshed by a concurrent request");
                        return Ok(current);
                    }
                }

                // Another request may have rotated the refresh token while we
                // waited on the gate.
                let refresh_token = self
                    .session()
                    .refresh_token()
                    .map_err(|e| RefreshFailure::new(format!("session read failed: {e}")))?
                    .ok_or_else(|| RefreshFailure::new("no refresh token stored"))?;
                self.exchange_refresh_token(&refresh_token).await
            }
        }
    }

    /// POSTs the refresh token and stores what comes back. Storage failures
    /// are logged only: the new token is still returned for the retry.
    async fn exchange_refresh_token(&self, refresh_token: &str) -> Result<String, RefreshFailure> {
        let tenant_id = self.session().tenant_id().ok().flatten();
        let headers = plain_headers(self.config(), tenant_id.as_deref())
            .map_err(|e| RefreshFailure::new(e.to_string()))?;
        let body = serde_json::to_vec(&RefreshRequestBody { refresh_token })
            .map_err(|e| RefreshFailure::new(e.to_string()))?;
        let request = HttpRequest {
            method: HttpMethod::Post,
            url: self.config().endpoint(&self.config().refresh_path),
            headers,
            body: Some(body),
        };

        tracing::info!(path = %self.config().refresh_path, "refreshing access token");
        let response = self
            .transport()
            .send(request)
            .await
            .map_err(|e| RefreshFailure::new(format!("refresh request failed: {e}")))?;

        if !response.is_success() {
            let backend = serde_json::from_str::<Value>(&response.body)
                .ok()
                .as_ref()
                .and_then(backend_message);
            return Err(RefreshFailure {
                reason: format!("refresh endpoint answered {}", response.status),
                backend_message: backend,
            });
        }

        let parsed: RefreshResponseBody = serde_json::from_str(&response.body)
            .map_err(|e| RefreshFailure::new(format!("invalid refresh response: {e}")))?;
        let token = parsed
            .access_token()
            .map(str::to_string)
            .ok_or_else(|| RefreshFailure::new("refresh response carried no token"))?;
        let rotated = parsed.refresh_token().map(str::to_string);

        if let Err(err) = self
            .session()
            .store_refreshed_tokens(&token, rotated.as_deref())
        {
            tracing::warn!("failed to persist refreshed access token: {}", err);
        }
        Ok(token)
    }

    /// Refreshes ahead of expiry, e.g. when the shell regains focus. Ends the
    /// session exactly like a failed 401 recovery.
    pub async fn refresh_access_token(&self) -> ApiResult<()> {
        let _gate = match self.config().refresh_policy {
            RefreshPolicy::SingleFlight => Some(self.inner.refresh_gate.lock().await),
            RefreshPolicy::PerRequest => None,
        };
        let stored = self.session().refresh_token()?;
        let Some(refresh_token) = stored else {
            return Err(self.end_session(None));
        };
        match self.exchange_refresh_token(&refresh_token).await {
            Ok(_) => Ok(()),
            Err(failure) => {
                tracing::warn!("token refresh failed: {}", failure);
                Err(self.end_session(failure.backend_message))
            }
        }
    }
}
