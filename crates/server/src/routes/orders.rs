//! Order route handlers.
//!
//! Placement is open to guests and logged-in customers alike; reading and
//! administering orders is gated by role.

use andar_core::{OrderId, OrderStatus};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::db::orders::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::{OptionalAuth, RequireAdmin, RequireAuth};
use crate::models::order::Order;
use crate::services::checkout::{CheckoutService, PlaceOrderRequest};
use crate::state::AppState;

/// Place an order. The heavy lifting lives in [`CheckoutService`].
pub async fn place(
    OptionalAuth(caller): OptionalAuth,
    State(state): State<AppState>,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    let service = CheckoutService::new(state.pool(), state.config());
    let order = service
        .place_order(request, caller.map(|u| u.id))
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// The caller's own orders, newest first.
pub async fn mine(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;
    Ok(Json(orders))
}

/// Every order in the system, newest first.
pub async fn list_all(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.pool()).list_all().await?;
    Ok(Json(orders))
}

/// Status update payload.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

/// Set an order's status. Any known status is accepted from any other;
/// unknown values are rejected before touching the database.
pub async fn update_status(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<Order>> {
    let status: OrderStatus = update
        .status
        .parse()
        .map_err(|_| AppError::BadRequest(format!("unknown order status: {}", update.status)))?;

    let order = OrderRepository::new(state.pool())
        .update_status(OrderId::new(id), status)
        .await?
        .ok_or_else(|| AppError::NotFound("order".to_string()))?;
    Ok(Json(order))
}
