//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                        - Liveness check
//! GET  /health/ready                  - Readiness check (DB ping)
//!
//! # Catalog
//! GET    /api/products                - Active products with variants (public)
//! GET    /api/products/{id}           - Product detail (public; inactive admin-only)
//! POST   /api/products                - Create product (admin)
//! PUT    /api/products/{id}           - Replace product and variants (admin)
//! DELETE /api/products/{id}           - Delete product (admin)
//! POST   /api/upload                  - Upload product image (admin)
//! GET    /uploads/*                   - Uploaded images (static)
//!
//! # Accounts
//! POST /api/auth/register             - Create account, returns token + user
//! POST /api/auth/login                - Exchange credentials for token
//! PUT  /api/auth/addresses            - Replace saved addresses (authenticated)
//!
//! # Orders
//! POST /api/orders                    - Place order (guest or authenticated)
//! GET  /api/orders/mine               - Own orders (authenticated)
//! GET  /api/orders                    - All orders (admin)
//! PUT  /api/orders/{id}/status        - Set order status (admin)
//! ```

pub mod auth;
pub mod orders;
pub mod products;
pub mod upload;

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::services::ServeDir;

use crate::state::AppState;

/// Create the `/api` router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::list).post(products::create))
        .route(
            "/products/{id}",
            get(products::get)
                .put(products::update)
                .delete(products::delete),
        )
        .route("/upload", post(upload::upload))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/addresses", put(auth::update_addresses))
        .route("/orders", post(orders::place).get(orders::list_all))
        .route("/orders/mine", get(orders::mine))
        .route("/orders/{id}/status", put(orders::update_status))
}

/// Create the complete application router (without middleware layers).
pub fn routes(upload_dir: &str) -> Router<AppState> {
    Router::new()
        .nest("/api", api_routes())
        .nest_service("/uploads", ServeDir::new(upload_dir))
}
