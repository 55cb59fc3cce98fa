use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::services::access::{Caller, Role};

pub const USER_ID: &str = "x-user-id";
pub const USERNAME: &str = "x-username";
pub const FULL_NAME: &str = "x-user-full-name";
pub const GROUPS: &str = "x-user-groups";
pub const SUPERUSER: &str = "x-superuser";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Builds the caller from the identity headers set by the auth proxy.
pub fn caller_from_headers(headers: &HeaderMap) -> Result<Caller, AppError> {
    let username = header(headers, USERNAME).ok_or(AppError::Unauthorized)?;

    let roles = header(headers, GROUPS)
        .map(|raw| raw.split(',').filter_map(Role::from_group).collect())
        .unwrap_or_default();

    let is_superuser = header(headers, SUPERUSER)
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false);

    Ok(Caller {
        user_id: header(headers, USER_ID).map(str::to_string),
        username: username.to_string(),
        full_name: header(headers, FULL_NAME).map(str::to_string),
        is_superuser,
        roles,
    })
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        caller_from_headers(&parts.headers)
    }
}
