//! Authentication service.
//!
//! Registration and login against the users table (argon2 credential
//! hashes), plus issuing and verifying the signed, time-limited bearer
//! tokens that protect the order and catalog administration surfaces.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use andar_core::{Email, Role, UserId};

use crate::config::ServerConfig;
use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::user::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Bearer token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: i32,
    /// Role at issuance time.
    pub role: Role,
    /// Expiration as a UTC timestamp.
    pub exp: u64,
}

impl Claims {
    /// The subject as a typed id.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        UserId::new(self.sub)
    }
}

/// Authentication service.
///
/// Handles registration, login, and bearer token issue/verify.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    config: &'a ServerConfig,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, config: &'a ServerConfig) -> Self {
        Self {
            users: UserRepository::new(pool),
            config,
        }
    }

    /// Register a new customer account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::DuplicateEmail` if the email is already registered.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<(User, String), AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create(name, &email, &password_hash, Role::Customer)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::DuplicateEmail,
                other => AuthError::Repository(other),
            })?;

        let token = self.issue_token(&user)?;
        Ok((user, token))
    }

    /// Login with email and password.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, String), AuthError> {
        let email = Email::parse(email)?;

        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &user.password_hash)?;

        let token = self.issue_token(&user)?;
        Ok((user, token))
    }

    /// Issue a signed bearer token for the user, valid for the configured TTL.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenSigning` if encoding fails.
    pub fn issue_token(&self, user: &User) -> Result<String, AuthError> {
        let claims = Claims {
            sub: user.id.as_i32(),
            role: user.role,
            exp: jsonwebtoken::get_current_timestamp() + self.config.token_ttl_secs,
        };
        encode_token(&claims, self.config)
    }

    /// Verify a bearer token, recovering the subject and role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenInvalidOrExpired` on any verification failure.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        verify_token(token, self.config)
    }
}

/// Encode claims with the configured signing key (HS256).
pub(crate) fn encode_token(claims: &Claims, config: &ServerConfig) -> Result<String, AuthError> {
    jsonwebtoken::encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(config.jwt_secret.expose_secret().as_bytes()),
    )
    .map_err(|_| AuthError::TokenSigning)
}

/// Verify a token with the configured signing key.
pub(crate) fn verify_token(token: &str, config: &ServerConfig) -> Result<Claims, AuthError> {
    jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.expose_secret().as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AuthError::TokenInvalidOrExpired)
}

/// Validate password strength.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is too short.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password with argon2id and a fresh salt.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a stored hash.
fn verify_password(password: &str, stored_hash: &str) -> Result<(), AuthError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|_| AuthError::PasswordHash)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use secrecy::SecretString;

    use andar_core::PaymentMethod;

    use super::*;

    fn test_config() -> ServerConfig {
        ServerConfig {
            database_url: SecretString::from("postgres://localhost/andar_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 5000,
            jwt_secret: SecretString::from("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%"),
            token_ttl_secs: 3600,
            shipping_fee: Decimal::new(1500, 2),
            no_reference_methods: vec![PaymentMethod::Card],
            upload_dir: "uploads".to_string(),
            cors_origin: None,
            smtp: None,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    #[test]
    fn test_password_hash_verify_roundtrip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong password", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same input").unwrap();
        let b = hash_password("same input").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_validate_password_too_short() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("long enough password").is_ok());
    }

    #[test]
    fn test_token_roundtrip() {
        let config = test_config();
        let claims = Claims {
            sub: 42,
            role: Role::Administrator,
            exp: jsonwebtoken::get_current_timestamp() + 60,
        };

        let token = encode_token(&claims, &config).unwrap();
        let recovered = verify_token(&token, &config).unwrap();
        assert_eq!(recovered.sub, 42);
        assert_eq!(recovered.user_id(), UserId::new(42));
        assert_eq!(recovered.role, Role::Administrator);
    }

    #[test]
    fn test_expired_token_rejected() {
        let config = test_config();
        let claims = Claims {
            sub: 1,
            role: Role::Customer,
            // Past the default validation leeway
            exp: jsonwebtoken::get_current_timestamp() - 600,
        };

        let token = encode_token(&claims, &config).unwrap();
        assert!(matches!(
            verify_token(&token, &config),
            Err(AuthError::TokenInvalidOrExpired)
        ));
    }

    #[test]
    fn test_token_signed_with_other_key_rejected() {
        let config = test_config();
        let mut other = test_config();
        other.jwt_secret = SecretString::from("zY8#wV5!qP2@mN9$kL4^jH7&gF0*dS3%");

        let claims = Claims {
            sub: 1,
            role: Role::Customer,
            exp: jsonwebtoken::get_current_timestamp() + 60,
        };

        let token = encode_token(&claims, &other).unwrap();
        assert!(matches!(
            verify_token(&token, &config),
            Err(AuthError::TokenInvalidOrExpired)
        ));
    }

    #[test]
    fn test_garbage_token_rejected() {
        let config = test_config();
        assert!(matches!(
            verify_token("not-a-token", &config),
            Err(AuthError::TokenInvalidOrExpired)
        ));
    }
}
