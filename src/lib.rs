//! Authenticated HTTP client for the dental clinic admin console.
//!
//! Pages call [`ApiClient`]; it attaches the bearer token and clinic scope
//! from the [`Session`], and on a 401 exchanges the refresh token once and
//! retries once. When the session cannot be recovered it purges storage and
//! asks the [`Navigator`] to send the user back to the login route.

mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod navigation;
pub mod redact;
pub mod session;
pub mod telemetry;
pub mod types;

pub use client::{ApiClient, ApiResponse, HttpMethod, RequestDescriptor};
pub use config::{ClientConfig, RefreshPolicy};
pub use error::{ApiError, ApiResult};
pub use navigation::{LogNavigator, NavigationBus, NavigationReason, NavigationRequest, Navigator};
pub use session::{FileStorage, KeyringStorage, MemoryStorage, Session, SessionKey, SessionStorage};
pub use types::{ApiErrorKind, ErrorPayload, SessionSnapshot, UserType};
