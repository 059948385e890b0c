//! Administrator account management.
//!
//! # Usage
//!
//! ```bash
//! andar-cli admin create -e admin@andar.pe -n "Administrador" -p <password>
//! ```
//!
//! # Environment Variables
//!
//! - `ANDAR_DATABASE_URL` - `PostgreSQL` connection string
//! - `ANDAR_ADMIN_PASSWORD` - password, when not passed via `--password`

use andar_core::{Email, Role, UserId};
use secrecy::SecretString;
use thiserror::Error;

use andar_server::db::{RepositoryError, users::UserRepository};
use andar_server::services::auth::{self, AuthError};

/// Errors that can occur during administrator operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Weak or missing password.
    #[error("Password rejected: {0}")]
    Password(String),

    /// Account already exists.
    #[error("An account already exists with email: {0}")]
    UserExists(String),

    /// Repository error.
    #[error("Repository error: {0}")]
    Repository(RepositoryError),
}

/// Create a new administrator account.
///
/// # Errors
///
/// Returns an error if the email is invalid, the password is weak, or an
/// account with the email already exists.
pub async fn create_user(
    email: &str,
    name: &str,
    password: Option<&str>,
) -> Result<UserId, AdminError> {
    dotenvy::dotenv().ok();

    let email = Email::parse(email).map_err(|e| AdminError::InvalidEmail(e.to_string()))?;

    let password = match password {
        Some(p) => p.to_owned(),
        None => std::env::var("ANDAR_ADMIN_PASSWORD")
            .map_err(|_| AdminError::MissingEnvVar("ANDAR_ADMIN_PASSWORD"))?,
    };
    auth::validate_password(&password).map_err(|e| AdminError::Password(e.to_string()))?;
    let password_hash = auth::hash_password(&password).map_err(|e| match e {
        AuthError::WeakPassword(msg) => AdminError::Password(msg),
        other => AdminError::Password(other.to_string()),
    })?;

    let database_url = std::env::var("ANDAR_DATABASE_URL")
        .map(SecretString::from)
        .map_err(|_| AdminError::MissingEnvVar("ANDAR_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let pool = andar_server::db::create_pool(&database_url).await?;

    tracing::info!("Creating administrator: {}", email.as_str());
    let user = UserRepository::new(&pool)
        .create(name, &email, &password_hash, Role::Administrator)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AdminError::UserExists(email.as_str().to_owned()),
            other => AdminError::Repository(other),
        })?;

    tracing::info!(
        "Administrator created successfully! ID: {}, Email: {}",
        user.id,
        email.as_str()
    );

    Ok(user.id)
}
