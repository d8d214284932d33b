use crate::error::{ApiError, ApiResult};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    pub(crate) fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Patch => reqwest::Method::PATCH,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a page asks the client to do. Built once, never mutated by the
/// client.
#[derive(Clone, PartialEq)]
pub struct RequestDescriptor {
    method: HttpMethod,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
    headers: Vec<(String, String)>,
    token_override: Option<String>,
}

impl std::fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("has_body", &self.body.is_some())
            .field("headers", &self.headers.iter().map(|(k, _)| k).collect::<Vec<_>>())
            .field("token_override", &self.token_override.as_ref().map(|_| "<set>"))
            .finish()
    }
}

impl RequestDescriptor {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
            token_override: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn json<T: Serialize + ?Sized>(self, body: &T) -> ApiResult<Self> {
        Ok(self.body(serde_json::to_value(body)?))
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Uses `token` instead of the stored access token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token_override = Some(token.into());
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn json_body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn extra_headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn token_override(&self) -> Option<&str> {
        self.token_override.as_deref()
    }

    /// Paths must stay under the configured API base.
    pub fn validate(&self) -> ApiResult<()> {
        let path = self.path.trim();
        if path.is_empty() {
            return Err(ApiError::InvalidRequest("path is empty".to_string()));
        }
        let route = path.split_once('?').map_or(path, |(route, _)| route);
        if route.contains("://") || path.starts_with("//") || path.starts_with('\\') {
            return Err(ApiError::InvalidRequest(format!(
                "path must be relative to the API base: {path}"
            )));
        }
        if path.contains('?') && !self.query.is_empty() {
            return Err(ApiError::InvalidRequest(
                "query given both inline and as parameters".to_string(),
            ));
        }
        Ok(())
    }

    pub fn path_and_query(&self) -> String {
        let path = self.path.trim();
        if self.query.is_empty() {
            return path.to_string();
        }
        let query = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{path}?{query}")
    }
}

/// One dispatch of a descriptor. `attempt` is 0 for the original request and
/// 1 for the single retry after a refresh; a retry record never produces
/// another one.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    descriptor: RequestDescriptor,
    attempt: u8,
}

impl Attempt {
    pub fn new(descriptor: RequestDescriptor) -> Self {
        Self {
            descriptor,
            attempt: 0,
        }
    }

    pub fn descriptor(&self) -> &RequestDescriptor {
        &self.descriptor
    }

    pub fn number(&self) -> u8 {
        self.attempt
    }

    pub fn is_retry(&self) -> bool {
        self.attempt > 0
    }

    /// The retry record carrying the refreshed token. `None` once the single
    /// retry has been used.
    pub fn retry_with(&self, token: impl Into<String>) -> Option<Attempt> {
        if self.is_retry() {
            return None;
        }
        Some(Attempt {
            descriptor: self.descriptor.clone().token(token),
            attempt: 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validate_rejects_absolute_urls() {
        for path in ["https://evil.test/x", "//evil.test/x", "", "   "] {
            assert!(
                matches!(
                    RequestDescriptor::get(path).validate(),
                    Err(ApiError::InvalidRequest(_))
                ),
                "{path:?} should be rejected"
            );
        }
        assert!(RequestDescriptor::get("/patients").validate().is_ok());
        assert!(RequestDescriptor::get("patients?page=2").validate().is_ok());
    }

    #[test]
    fn validate_allows_urls_inside_the_query() {
        assert!(RequestDescriptor::get("/files?src=https://cdn.example.com/x.png")
            .validate()
            .is_ok());
        assert!(RequestDescriptor::get("/files/https://cdn.example.com?x=1")
            .validate()
            .is_err());
    }

    #[test]
    fn path_and_query_encodes_pairs() {
        let descriptor = RequestDescriptor::get("/appointments")
            .query("date", "2026-10-18")
            .query("q", "root canal & crown");
        assert_eq!(
            descriptor.path_and_query(),
            "/appointments?date=2026-10-18&q=root%20canal%20%26%20crown"
        );
    }

    #[test]
    fn retry_with_produces_marked_record_once() {
        let original = Attempt::new(
            RequestDescriptor::post("/invoices").body(json!({"amount": 120})),
        );
        assert!(!original.is_retry());

        let retry = original.retry_with("abc2").unwrap();
        assert!(retry.is_retry());
        assert_eq!(retry.number(), 1);
        assert_eq!(retry.descriptor().token_override(), Some("abc2"));
        assert_eq!(retry.descriptor().json_body(), original.descriptor().json_body());

        assert!(original.descriptor().token_override().is_none());
        assert!(retry.retry_with("abc3").is_none());
    }

    #[test]
    fn debug_output_hides_token_override() {
        let descriptor = RequestDescriptor::get("/me").token("secret-token");
        assert!(!format!("{descriptor:?}").contains("secret-token"));
    }
}
