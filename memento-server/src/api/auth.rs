//! Host identity
//!
//! The fronting identity provider authenticates hosts and forwards the user id
//! in the `x-host-user-id` header. Handlers that take [`HostIdentity`] reject
//! requests without it.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;

/// Header carrying the authenticated host user id
pub const HOST_USER_HEADER: &str = "x-host-user-id";

/// Authenticated host user id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostIdentity(pub String);

impl HostIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for HostIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(HOST_USER_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {} header", HOST_USER_HEADER)))?;
        let user_id = value
            .to_str()
            .map_err(|_| ApiError::Unauthorized(format!("{} is not valid text", HOST_USER_HEADER)))?
            .trim();
        if user_id.is_empty() {
            return Err(ApiError::Unauthorized(format!("empty {} header", HOST_USER_HEADER)));
        }
        Ok(HostIdentity(user_id.to_string()))
    }
}
