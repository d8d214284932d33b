use crate::redact::redact_secrets;
use crate::session::StorageError;
use crate::types::{ApiErrorKind, ErrorPayload};
use serde_json::Value;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

pub(crate) const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please sign in again.";

#[derive(Debug, Error)]
pub enum ApiError {
    /// No response was received.
    #[error("network error: {0}")]
    Network(String),
    /// The session could not be recovered; stored credentials were purged.
    #[error("{message}")]
    AuthUnrecoverable { message: String },
    #[error("{message}")]
    Request {
        status: u16,
        message: String,
        body: Option<Value>,
    },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("session storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("http client setup failed")]
    Setup(#[from] reqwest::Error),
}

impl ApiError {
    pub fn kind(&self) -> ApiErrorKind {
        match self {
            Self::Network(_) => ApiErrorKind::NetworkFailure,
            Self::AuthUnrecoverable { .. } => ApiErrorKind::AuthUnrecoverable,
            Self::Request { .. } => ApiErrorKind::RequestError,
            Self::InvalidRequest(_) => ApiErrorKind::InvalidRequest,
            Self::Json(_) => ApiErrorKind::InvalidResponse,
            Self::Storage(_) => ApiErrorKind::Storage,
            Self::Setup(_) => ApiErrorKind::Internal,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => Some(*status),
            Self::AuthUnrecoverable { .. } => Some(401),
            _ => None,
        }
    }

    pub fn is_auth_unrecoverable(&self) -> bool {
        matches!(self, Self::AuthUnrecoverable { .. })
    }

    /// Serializable form handed to the frontend.
    pub fn payload(&self) -> ErrorPayload {
        ErrorPayload {
            code: self.kind(),
            status: self.status(),
            message: redact_secrets(&self.to_string()).into_owned(),
        }
    }

    pub(crate) fn network(err: impl std::fmt::Display) -> Self {
        Self::Network(redact_secrets(&err.to_string()).into_owned())
    }

    pub(crate) fn auth_unrecoverable(message: Option<String>) -> Self {
        Self::AuthUnrecoverable {
            message: message.unwrap_or_else(|| SESSION_EXPIRED_MESSAGE.to_string()),
        }
    }

    /// Builds a request error from a non-2xx response, preferring the message
    /// the backend put in the body.
    pub(crate) fn from_response(status: u16, text: &str) -> Self {
        let body = serde_json::from_str::<Value>(text).ok();
        let message = body
            .as_ref()
            .and_then(backend_message)
            .unwrap_or_else(|| status_message(status));
        Self::Request {
            status,
            message: redact_secrets(&message).into_owned(),
            body,
        }
    }
}

fn read_string(value: Option<&Value>) -> Option<String> {
    let s = value?.as_str()?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// `message`, `error` or `msg`, whichever the backend filled in. A nested
/// `{"error": {"message": ..}}` is accepted too.
pub(crate) fn backend_message(body: &Value) -> Option<String> {
    let obj = body.as_object()?;
    read_string(obj.get("message"))
        .or_else(|| read_string(obj.get("error")))
        .or_else(|| read_string(obj.get("msg")))
        .or_else(|| {
            obj.get("error")
                .and_then(|e| e.as_object())
                .and_then(|e| read_string(e.get("message")))
        })
}

pub(crate) fn status_message(status: u16) -> String {
    format!("Request failed with status code {status}")
}
