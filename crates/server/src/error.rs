//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`.
//! Responses carry a JSON body of the form `{"message": "..."}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::checkout::CheckoutError;

/// Application-level error type for the server.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(RepositoryError),

    /// Authentication or authorization failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Order placement failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Conflicting state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("resource".to_string()),
            RepositoryError::Conflict(what) => Self::Conflict(what),
            other => Self::Database(other),
        }
    }
}

impl AppError {
    /// HTTP status the error maps to.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials
                | AuthError::TokenMissing
                | AuthError::TokenInvalidOrExpired => StatusCode::UNAUTHORIZED,
                AuthError::InsufficientRole => StatusCode::FORBIDDEN,
                AuthError::DuplicateEmail => StatusCode::CONFLICT,
                AuthError::InvalidEmail(_) | AuthError::WeakPassword(_) => StatusCode::BAD_REQUEST,
                AuthError::Repository(_) | AuthError::PasswordHash | AuthError::TokenSigning => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Checkout(err) => match err {
                CheckoutError::ProductUnavailable(_) | CheckoutError::VariantNotFound { .. } => {
                    StatusCode::NOT_FOUND
                }
                CheckoutError::InsufficientStock { .. } => StatusCode::CONFLICT,
                CheckoutError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    /// Message exposed to the client. Server-side failures get a generic
    /// message; their detail stays in logs and Sentry.
    #[must_use]
    pub fn client_message(&self) -> String {
        if self.status() == StatusCode::INTERNAL_SERVER_ERROR {
            return "Internal server error".to_string();
        }
        match self {
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid credentials".to_string(),
                AuthError::TokenMissing => "Authentication required".to_string(),
                AuthError::TokenInvalidOrExpired => "Invalid or expired token".to_string(),
                AuthError::InsufficientRole => "Administrator access required".to_string(),
                AuthError::DuplicateEmail => {
                    "An account with this email already exists".to_string()
                }
                other => other.to_string(),
            },
            Self::Checkout(err) => err.to_string(),
            Self::NotFound(what) => format!("{what} not found"),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, Json(json!({ "message": self.client_message() }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use andar_core::{EmailError, PaymentMethod, ProductId};
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn repository_not_found_maps_to_404() {
        let err: AppError = RepositoryError::NotFound.into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.client_message(), "resource not found");
    }

    #[test]
    fn repository_conflict_maps_to_409() {
        let err: AppError = RepositoryError::Conflict("email already exists".to_string()).into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn database_errors_hide_detail() {
        let err: AppError =
            RepositoryError::DataCorruption("bad role in row 7".to_string()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.client_message(), "Internal server error");
    }

    #[test]
    fn invalid_credentials_maps_to_401() {
        let err = AppError::Auth(AuthError::InvalidCredentials);
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.client_message(), "Invalid credentials");
    }

    #[test]
    fn insufficient_role_maps_to_403() {
        let err = AppError::Auth(AuthError::InsufficientRole);
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn duplicate_email_maps_to_409() {
        let err = AppError::Auth(AuthError::DuplicateEmail);
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn unknown_product_maps_to_404() {
        let err = AppError::Checkout(CheckoutError::ProductUnavailable(ProductId::new(42)));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn insufficient_stock_maps_to_409() {
        let err = AppError::Checkout(CheckoutError::InsufficientStock {
            sku: "ZU-42-NEG".to_string(),
            requested: 3,
            available: 1,
        });
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn validation_errors_map_to_400() {
        let missing = AppError::Checkout(CheckoutError::MissingField("customerEmail"));
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

        let mismatch = AppError::Checkout(CheckoutError::TotalMismatch {
            field: "total",
            supplied: Decimal::new(9900, 2),
            computed: Decimal::new(11500, 2),
        });
        assert_eq!(mismatch.status(), StatusCode::BAD_REQUEST);

        let reference = AppError::Checkout(CheckoutError::MissingTransactionReference(
            PaymentMethod::Yape,
        ));
        assert_eq!(reference.status(), StatusCode::BAD_REQUEST);

        let bad_email =
            AppError::Checkout(CheckoutError::InvalidEmail(EmailError::MissingAtSymbol));
        assert_eq!(bad_email.status(), StatusCode::BAD_REQUEST);
        assert!(bad_email.client_message().contains("customerEmail"));
    }
}
