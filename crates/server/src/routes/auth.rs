//! Account registration and login handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::db::users::UserRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::Address;
use crate::models::user::PublicUser;
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Registration payload.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Login payload.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token plus the public view of the account it belongs to.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

/// Create an account and log it in.
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let service = AuthService::new(state.pool(), state.config());
    let (user, token) = service
        .register(&request.name, &request.email, &request.password)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.public(),
        }),
    ))
}

/// Exchange credentials for a token.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let service = AuthService::new(state.pool(), state.config());
    let (user, token) = service.login(&request.email, &request.password).await?;
    Ok(Json(AuthResponse {
        token,
        user: user.public(),
    }))
}

/// Replace the caller's saved addresses.
pub async fn update_addresses(
    RequireAuth(caller): RequireAuth,
    State(state): State<AppState>,
    Json(addresses): Json<Vec<Address>>,
) -> Result<Json<PublicUser>> {
    let repo = UserRepository::new(state.pool());
    repo.set_addresses(caller.id, &addresses).await?;
    let user = repo
        .get_by_id(caller.id)
        .await?
        .ok_or_else(|| AppError::NotFound("user".to_string()))?;
    Ok(Json(user.public()))
}
