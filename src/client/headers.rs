use super::request::Attempt;
use crate::error::{ApiError, ApiResult};
use crate::session::Credentials;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};

const JSON: &str = "application/json";

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(JSON));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON));
    headers
}

fn insert_tenant(headers: &mut HeaderMap, tenant_header: &str, tenant_id: Option<&str>) -> ApiResult<()> {
    let Some(tenant_id) = tenant_id.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(());
    };
    let name = HeaderName::from_bytes(tenant_header.as_bytes())
        .map_err(|_| ApiError::InvalidRequest(format!("invalid tenant header name: {tenant_header}")))?;
    match HeaderValue::from_str(tenant_id) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => tracing::warn!("stored tenant id is not a valid header value; omitting"),
    }
    Ok(())
}

/// Headers for one dispatch of `attempt`. Returns the bearer token that was
/// attached, if any.
///
/// Order: JSON defaults, bearer token (override first, then storage), tenant
/// scope, then the caller's own headers, which win on conflict.
pub(crate) fn build_request_headers(
    attempt: &Attempt,
    credentials: &Credentials,
    tenant_header: &str,
) -> ApiResult<(HeaderMap, Option<String>)> {
    let descriptor = attempt.descriptor();
    let mut headers = json_headers();

    let token = descriptor
        .token_override()
        .map(str::to_string)
        .or_else(|| credentials.access_token.clone())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    let mut attached = None;
    if let Some(token) = token {
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
                attached = Some(token);
            }
            Err(_) => tracing::warn!("access token is not a valid header value; sending without it"),
        }
    }

    insert_tenant(&mut headers, tenant_header, credentials.tenant_id.as_deref())?;

    for (name, value) in descriptor.extra_headers() {
        let header_name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|_| ApiError::InvalidRequest(format!("invalid header name: {name}")))?;
        let header_value = HeaderValue::from_str(value.trim())
            .map_err(|_| ApiError::InvalidRequest(format!("invalid value for header {name}")))?;
        headers.insert(header_name, header_value);
    }

    Ok((headers, attached))
}

/// Headers for calls made outside the recovery flow (refresh, login): JSON
/// and tenant scope, never a bearer token.
pub(crate) fn build_plain_headers(tenant_header: &str, tenant_id: Option<&str>) -> ApiResult<HeaderMap> {
    let mut headers = json_headers();
    insert_tenant(&mut headers, tenant_header, tenant_id)?;
    Ok(headers)
}
