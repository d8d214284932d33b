mod headers;
pub mod recovery;
mod refresh;
mod request;
mod transport;

pub use request::{Attempt, HttpMethod, RequestDescriptor};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError};

use crate::config::ClientConfig;
use crate::error::{backend_message, ApiError, ApiResult};
use crate::navigation::{NavigationReason, NavigationRequest, Navigator};
use crate::session::Session;
use recovery::{RecoveryState, Verdict};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Headers for calls that bypass the refresh flow (refresh, login).
pub(crate) fn plain_headers(
    config: &ClientConfig,
    tenant_id: Option<&str>,
) -> ApiResult<reqwest::header::HeaderMap> {
    headers::build_plain_headers(&config.tenant_header, tenant_id)
}

/// A successful (2xx) response, body untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    status: u16,
    body: String,
}

impl ApiResponse {
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn text(&self) -> &str {
        &self.body
    }

    pub fn into_text(self) -> String {
        self.body
    }

    /// Empty bodies (204s) read as JSON `null`.
    pub fn json<T: DeserializeOwned>(&self) -> ApiResult<T> {
        let text = self.body.trim();
        let text = if text.is_empty() { "null" } else { text };
        Ok(serde_json::from_str(text)?)
    }

    pub fn value(&self) -> ApiResult<Value> {
        self.json()
    }
}

struct Inner {
    config: ClientConfig,
    session: Session,
    transport: Arc<dyn Transport>,
    navigator: Arc<dyn Navigator>,
    refresh_gate: Mutex<()>,
}

/// HTTP client for the admin backend. Cheap to clone; clones share the
/// session, transport and refresh gate.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.config.base_url)
            .field("api_prefix", &self.inner.config.api_prefix)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(
        config: ClientConfig,
        session: Session,
        navigator: impl Navigator + 'static,
    ) -> ApiResult<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(config, session, transport, navigator))
    }

    pub fn with_transport(
        config: ClientConfig,
        session: Session,
        transport: impl Transport + 'static,
        navigator: impl Navigator + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                session,
                transport: Arc::new(transport),
                navigator: Arc::new(navigator),
                refresh_gate: Mutex::new(()),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    /// Sends `descriptor`, refreshing the access token and retrying once if
    /// the backend answers 401.
    pub async fn request(&self, descriptor: RequestDescriptor) -> ApiResult<ApiResponse> {
        descriptor.validate()?;
        let method = descriptor.method();
        let path = descriptor.path().to_string();
        let mut attempt = Attempt::new(descriptor);
        tracing::trace!(%method, %path, state = ?RecoveryState::Initial, "request created");

        loop {
            let credentials = self.session().credentials()?;
            let (headers, used_token) = headers::build_request_headers(
                &attempt,
                &credentials,
                &self.config().tenant_header,
            )?;
            let request = self.http_request(attempt.descriptor(), headers)?;

            tracing::debug!(
                %method,
                %path,
                attempt = attempt.number(),
                state = ?recovery::dispatched(&attempt),
                "dispatching request"
            );

            let response = match self.inner.transport.send(request).await {
                Ok(response) => response,
                Err(err) => {
                    let next = recovery::on_transport_error(&attempt);
                    tracing::warn!(
                        %method,
                        %path,
                        attempt = attempt.number(),
                        state = ?next.state(),
                        "request failed without a response: {}",
                        err
                    );
                    return Err(ApiError::network(err));
                }
            };

            let verdict = recovery::on_response(
                &attempt,
                response.status,
                credentials.refresh_token.is_some(),
            );
            tracing::debug!(
                %method,
                %path,
                status = response.status,
                attempt = attempt.number(),
                bearer = used_token.is_some(),
                state = ?verdict.next().state(),
                "response received"
            );

            match verdict {
                Verdict::Succeed => {
                    return Ok(ApiResponse {
                        status: response.status,
                        body: response.body,
                    });
                }
                Verdict::RequestError => {
                    return Err(ApiError::from_response(response.status, &response.body));
                }
                Verdict::AuthUnrecoverable => {
                    let message = serde_json::from_str::<Value>(&response.body)
                        .ok()
                        .as_ref()
                        .and_then(backend_message);
                    return Err(self.end_session(message));
                }
                Verdict::Refresh => match self
                    .obtain_fresh_token(
                        credentials.refresh_token.as_deref(),
                        credentials.access_token.as_deref(),
                    )
                    .await
                {
                    Ok(token) => {
                        tracing::debug!(
                            %method,
                            %path,
                            state = ?recovery::on_refresh(true).state(),
                            "access token refreshed; retrying once"
                        );
                        let Some(retry) = attempt.retry_with(token) else {
                            return Err(self.end_session(None));
                        };
                        attempt = retry;
                    }
                    Err(failure) => {
                        tracing::warn!(
                            %method,
                            %path,
                            state = ?recovery::on_refresh(false).state(),
                            "token refresh failed: {}",
                            failure
                        );
                        return Err(self.end_session(failure.backend_message));
                    }
                },
            }
        }
    }

    fn http_request(
        &self,
        descriptor: &RequestDescriptor,
        headers: reqwest::header::HeaderMap,
    ) -> ApiResult<HttpRequest> {
        let body = descriptor
            .json_body()
            .map(serde_json::to_vec)
            .transpose()?;
        Ok(HttpRequest {
            method: descriptor.method(),
            url: self.config().endpoint(&descriptor.path_and_query()),
            headers,
            body,
        })
    }

    /// Terminal auth failure: purge every session key, send the user to the
    /// login route, and hand back the error for the caller.
    fn end_session(&self, message: Option<String>) -> ApiError {
        if let Err(err) = self.session().purge() {
            tracing::warn!("failed to purge session after auth failure: {}", err);
        }
        let route = self.config().login_route.clone();
        tracing::warn!(route = %route, "session unrecoverable; redirecting to login");
        self.inner.navigator.navigate(NavigationRequest {
            route,
            reason: NavigationReason::SessionExpired,
        });
        ApiError::auth_unrecoverable(message)
    }

    pub(crate) fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.inner.navigator
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.inner.transport
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.request(RequestDescriptor::get(path)).await?.json()
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(RequestDescriptor::post(path).json(body)?)
            .await?
            .json()
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(RequestDescriptor::put(path).json(body)?)
            .await?
            .json()
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(RequestDescriptor::patch(path).json(body)?)
            .await?
            .json()
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.request(RequestDescriptor::delete(path)).await?.json()
    }
}

#[cfg(test)]
pub(crate) mod testing;
