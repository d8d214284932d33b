use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ApiErrorKind {
    NetworkFailure,
    AuthUnrecoverable,
    RequestError,
    InvalidRequest,
    InvalidResponse,
    Storage,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ErrorPayload {
    pub code: ApiErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum UserType {
    SuperAdmin,
    ClinicAdmin,
    Staff,
}

impl UserType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "super_admin" | "superadmin" => Some(Self::SuperAdmin),
            "clinic_admin" | "clinicadmin" | "admin" => Some(Self::ClinicAdmin),
            "staff" | "doctor" | "receptionist" => Some(Self::Staff),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::ClinicAdmin => "clinic_admin",
            Self::Staff => "staff",
        }
    }
}

/// What the shell needs to pick a layout and guard routes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SessionSnapshot {
    pub authenticated: bool,
    pub has_refresh_token: bool,
    pub tenant_id: Option<String>,
    pub user_type: Option<UserType>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshRequestBody<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshResponseBody {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Backends send the access token as `token`, `accessToken`, or both.
fn first_non_empty<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> Option<&'a str> {
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
}

impl RefreshResponseBody {
    pub fn access_token(&self) -> Option<&str> {
        first_non_empty([self.token.as_deref(), self.access_token.as_deref()])
    }

    pub fn refresh_token(&self) -> Option<&str> {
        first_non_empty([self.refresh_token.as_deref()])
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<Value>,
    #[serde(default)]
    pub user_type: Option<String>,
    #[serde(default)]
    pub clinic_id: Option<Value>,
    #[serde(default)]
    pub tenant_id: Option<Value>,
    #[serde(default)]
    pub organization_id: Option<Value>,
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl LoginResponse {
    /// `token`, falling back to `accessToken`.
    pub fn access_token(&self) -> Option<&str> {
        first_non_empty([self.token.as_deref(), self.access_token.as_deref()])
    }

    /// Clinic ids come back as numbers from some endpoints and strings from
    /// others, under `clinicId`, `tenantId` or `organizationId`.
    pub fn clinic_id_string(&self) -> Option<String> {
        [&self.clinic_id, &self.tenant_id, &self.organization_id]
            .into_iter()
            .flatten()
            .find_map(id_string)
    }
}
