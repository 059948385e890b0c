//! Authentication middleware and extractors.
//!
//! Bearer-token extractors for route handlers. Tokens arrive in the
//! `Authorization: Bearer <jwt>` header and are verified against the
//! configured signing secret; no database round trip per request.

use andar_core::{Role, UserId};
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use crate::error::AppError;
use crate::services::auth::{self, AuthError, Claims};
use crate::state::AppState;

/// The verified identity behind a request.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: UserId,
    pub role: Role,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.user_id(),
            role: claims.role,
        }
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let header = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::TokenMissing)?;
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::TokenMissing)
}

/// Extractor that requires a valid bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.id)
/// }
/// ```
pub struct RequireAuth(pub AuthUser);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = auth::verify_token(token, state.config())?;
        Ok(Self(claims.into()))
    }
}

/// Extractor that requires a valid bearer token with the administrator role.
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        if user.role != Role::Administrator {
            return Err(AuthError::InsufficientRole.into());
        }
        Ok(Self(user))
    }
}

/// Extractor that optionally identifies the caller.
///
/// A request without an `Authorization` header yields `None`; a request
/// that presents a token must present a valid one, so a stale token on a
/// guest-capable endpoint is still rejected instead of silently demoted.
pub struct OptionalAuth(pub Option<AuthUser>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(parts) {
            Err(_) => Ok(Self(None)),
            Ok(token) => {
                let claims = auth::verify_token(token, state.config())?;
                Ok(Self(Some(claims.into())))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts_with_auth(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/orders");
        if let Some(v) = value {
            builder = builder.header(header::AUTHORIZATION, v);
        }
        let (parts, ()) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[test]
    fn bearer_token_extracts_value() {
        let parts = parts_with_auth(Some("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&parts).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn missing_header_is_token_missing() {
        let parts = parts_with_auth(None);
        assert!(matches!(bearer_token(&parts), Err(AuthError::TokenMissing)));
    }

    #[test]
    fn wrong_scheme_is_token_missing() {
        let parts = parts_with_auth(Some("Basic dXNlcjpwYXNz"));
        assert!(matches!(bearer_token(&parts), Err(AuthError::TokenMissing)));
    }

    #[test]
    fn empty_bearer_is_token_missing() {
        let parts = parts_with_auth(Some("Bearer "));
        assert!(matches!(bearer_token(&parts), Err(AuthError::TokenMissing)));
    }
}
