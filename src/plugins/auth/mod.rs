//! Caller identity. Tokens are issued elsewhere; this module only verifies
//! them and hands the owning user id to handlers.

pub mod middleware;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::http_error::AppError;

pub use middleware::{require_auth, JwtVerifier};

#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::unauthorized("missing authorization"))
    }
}
