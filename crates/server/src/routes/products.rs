//! Product catalog route handlers.
//!
//! Reads are public; writes require the administrator role.

use andar_core::{ProductId, Role};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::{Value, json};

use crate::db::products::ProductRepository;
use crate::error::{AppError, Result};
use crate::middleware::{OptionalAuth, RequireAdmin};
use crate::models::product::{Product, ProductInput};
use crate::state::AppState;

/// List all active products with their variants.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    let products = ProductRepository::new(state.pool()).list_active().await?;
    Ok(Json(products))
}

/// Fetch a single product. Inactive products are visible to administrators
/// only; everyone else gets a 404 indistinguishable from a missing product.
pub async fn get(
    OptionalAuth(caller): OptionalAuth,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Product>> {
    let product = ProductRepository::new(state.pool())
        .get(ProductId::new(id))
        .await?
        .filter(|p| p.active || caller.is_some_and(|u| u.role == Role::Administrator))
        .ok_or_else(|| AppError::NotFound("product".to_string()))?;
    Ok(Json(product))
}

/// Create a product with its variants.
pub async fn create(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<ProductInput>,
) -> Result<(StatusCode, Json<Product>)> {
    input.validate().map_err(AppError::BadRequest)?;
    let product = ProductRepository::new(state.pool()).create(&input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Replace a product and its variant set.
pub async fn update(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(input): Json<ProductInput>,
) -> Result<Json<Product>> {
    input.validate().map_err(AppError::BadRequest)?;
    let product = ProductRepository::new(state.pool())
        .update(ProductId::new(id), &input)
        .await?
        .ok_or_else(|| AppError::NotFound("product".to_string()))?;
    Ok(Json(product))
}

/// Delete a product and its variants.
pub async fn delete(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Value>> {
    let deleted = ProductRepository::new(state.pool())
        .delete(ProductId::new(id))
        .await?;
    if !deleted {
        return Err(AppError::NotFound("product".to_string()));
    }
    Ok(Json(json!({ "message": "product deleted" })))
}
