use std::time::Duration;
use thiserror::Error;

pub const ENV_BASE_URL: &str = "CLINIC_ADMIN_API_BASE_URL";
pub const ENV_API_PREFIX: &str = "CLINIC_ADMIN_API_PREFIX";
pub const ENV_TENANT_HEADER: &str = "CLINIC_ADMIN_TENANT_HEADER";
pub const ENV_LOGIN_ROUTE: &str = "CLINIC_ADMIN_LOGIN_ROUTE";
pub const ENV_TIMEOUT_SECS: &str = "CLINIC_ADMIN_TIMEOUT_SECS";
pub const ENV_REFRESH_POLICY: &str = "CLINIC_ADMIN_REFRESH_POLICY";

const DEFAULT_BASE_URL: &str = "http://localhost:5000";
const DEFAULT_API_PREFIX: &str = "/api";
const DEFAULT_TENANT_HEADER: &str = "X-Clinic-Id";
const DEFAULT_LOGIN_ROUTE: &str = "/";
const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";
const DEFAULT_LOGIN_PATH: &str = "/auth/login";
const DEFAULT_TIMEOUT_SECS: u64 = 40;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// How concurrent 401s share refresh work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefreshPolicy {
    /// Every unauthorized request runs its own refresh call.
    #[default]
    PerRequest,
    /// Refreshes are serialised; a request whose token was already replaced
    /// by a finished refresh retries with the stored token instead.
    SingleFlight,
}

impl RefreshPolicy {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "per_request" => Some(Self::PerRequest),
            "single_flight" => Some(Self::SingleFlight),
            _ => None,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} is not a valid value: {value}")]
    InvalidValue { name: &'static str, value: String },
    #[error("base url must start with http:// or https://")]
    InvalidBaseUrl,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_prefix: String,
    pub tenant_header: String,
    pub login_route: String,
    pub refresh_path: String,
    pub login_path: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub refresh_policy: RefreshPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            tenant_header: DEFAULT_TENANT_HEADER.to_string(),
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            refresh_policy: RefreshPolicy::PerRequest,
        }
    }
}

fn read_env(name: &str) -> Option<String> {
    let value = std::env::var(name).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ConfigError> {
        let config = Self {
            base_url: base_url.into(),
            ..Self::default()
        };
        config.validated()
    }

    /// Defaults overridden by `CLINIC_ADMIN_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(base_url) = read_env(ENV_BASE_URL) {
            config.base_url = base_url;
        }
        if let Some(prefix) = read_env(ENV_API_PREFIX) {
            config.api_prefix = prefix;
        }
        if let Some(header) = read_env(ENV_TENANT_HEADER) {
            config.tenant_header = header;
        }
        if let Some(route) = read_env(ENV_LOGIN_ROUTE) {
            config.login_route = route;
        }
        if let Some(raw) = read_env(ENV_TIMEOUT_SECS) {
            let secs = raw
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or(ConfigError::InvalidValue {
                    name: ENV_TIMEOUT_SECS,
                    value: raw.clone(),
                })?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = read_env(ENV_REFRESH_POLICY) {
            config.refresh_policy =
                RefreshPolicy::parse(&raw).ok_or(ConfigError::InvalidValue {
                    name: ENV_REFRESH_POLICY,
                    value: raw.clone(),
                })?;
        }
        config.validated()
    }

    pub fn with_refresh_policy(mut self, policy: RefreshPolicy) -> Self {
        self.refresh_policy = policy;
        self
    }

    pub fn with_tenant_header(mut self, header: impl Into<String>) -> Self {
        self.tenant_header = header.into();
        self
    }

    pub fn with_login_route(mut self, route: impl Into<String>) -> Self {
        self.login_route = route.into();
        self
    }

    fn validated(mut self) -> Result<Self, ConfigError> {
        let base = self.base_url.trim().trim_end_matches('/').to_string();
        let lower = base.to_ascii_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl);
        }
        self.base_url = base;

        let prefix = self.api_prefix.trim().trim_matches('/');
        self.api_prefix = if prefix.is_empty() {
            String::new()
        } else {
            format!("/{prefix}")
        };

        if self.tenant_header.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                name: ENV_TENANT_HEADER,
                value: self.tenant_header.clone(),
            });
        }
        self.tenant_header = self.tenant_header.trim().to_string();
        Ok(self)
    }

    /// Absolute URL for a path under the API prefix. `path` is expected to be
    /// already validated as relative.
    pub fn endpoint(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("{}{}/{}", self.base_url, self.api_prefix, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_base_prefix_and_path() {
        let config = ClientConfig::new("https://admin.example.com/").unwrap();
        assert_eq!(
            config.endpoint("/patients"),
            "https://admin.example.com/api/patients"
        );
        assert_eq!(
            config.endpoint("patients/7"),
            "https://admin.example.com/api/patients/7"
        );
    }

    #[test]
    fn empty_prefix_is_allowed() {
        let config = ClientConfig {
            api_prefix: "/".to_string(),
            ..ClientConfig::default()
        }
        .validated()
        .unwrap();
        assert_eq!(config.endpoint("/x"), "http://localhost:5000/x");
    }

    #[test]
    fn rejects_base_url_without_scheme() {
        assert_eq!(
            ClientConfig::new("admin.example.com").unwrap_err(),
            ConfigError::InvalidBaseUrl
        );
    }

    #[test]
    fn refresh_policy_parses_both_spellings() {
        assert_eq!(
            RefreshPolicy::parse("single-flight"),
            Some(RefreshPolicy::SingleFlight)
        );
        assert_eq!(
            RefreshPolicy::parse("PER_REQUEST"),
            Some(RefreshPolicy::PerRequest)
        );
        assert_eq!(RefreshPolicy::parse("sometimes"), None);
    }
}
