use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::CookieJar;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;

use crate::http_error::AppError;
use crate::plugins::auth::AuthUser;

pub const TOKEN_COOKIE: &str = "access_token";

#[derive(Deserialize)]
struct ClaimsLite {
    sub: String,
}

/// Verifies HS256 tokens issued by the external auth service.
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self { key: DecodingKey::from_secret(secret.as_bytes()), validation: Validation::default() }
    }

    pub fn verify(&self, token: &str) -> Result<AuthUser, AppError> {
        let token_data = decode::<ClaimsLite>(token, &self.key, &self.validation)
            .map_err(|_| AppError::unauthorized("invalid token"))?;
        let user_id = token_data.claims.sub;
        if user_id.trim().is_empty() {
            return Err(AppError::unauthorized("invalid token subject"));
        }
        Ok(AuthUser { user_id })
    }
}

/// Bearer header wins over the cookie when both are present.
fn token_from_headers(headers: &HeaderMap) -> Result<String, AppError> {
    if let Some(auth_hdr) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        return auth_hdr
            .strip_prefix("Bearer ")
            .map(|t| t.trim().to_string())
            .ok_or_else(|| AppError::unauthorized("invalid authorization header"));
    }
    CookieJar::from_headers(headers)
        .get(TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| AppError::unauthorized("missing authorization"))
}

pub async fn require_auth(State(verifier): State<Arc<JwtVerifier>>, mut req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let token = token_from_headers(req.headers())?;
    let user = verifier.verify(&token)?;
    // insert into extensions for handlers to use
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
