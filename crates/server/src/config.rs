//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ANDAR_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `ANDAR_JWT_SECRET` - Bearer token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `ANDAR_HOST` - Bind address (default: 127.0.0.1)
//! - `ANDAR_PORT` - Listen port (default: 5000)
//! - `ANDAR_TOKEN_TTL_SECS` - Bearer token lifetime in seconds (default: 3600)
//! - `ANDAR_SHIPPING_FEE` - Flat fee charged for the `ship` method (default: 15.00)
//! - `ANDAR_NO_REFERENCE_METHODS` - Comma-separated payment methods exempt
//!   from requiring a transaction reference (default: `card`)
//! - `ANDAR_UPLOAD_DIR` - Directory for uploaded product images (default: `uploads`)
//! - `ANDAR_CORS_ORIGIN` - Allowed CORS origin for the frontend
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//!
//! ## SMTP (optional as a unit; confirmation emails are logged when absent)
//! - `ANDAR_SMTP_HOST`, `ANDAR_SMTP_PORT`, `ANDAR_SMTP_USERNAME`,
//!   `ANDAR_SMTP_PASSWORD`, `ANDAR_SMTP_FROM`

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use andar_core::PaymentMethod;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Andar server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Bearer token signing secret
    pub jwt_secret: SecretString,
    /// Bearer token lifetime in seconds
    pub token_ttl_secs: u64,
    /// Flat shipping fee for the `ship` method (`pickup` is always free)
    pub shipping_fee: Decimal,
    /// Payment methods that do not require a transaction reference
    pub no_reference_methods: Vec<PaymentMethod>,
    /// Directory where uploaded images are stored
    pub upload_dir: String,
    /// Allowed CORS origin for the frontend
    pub cors_origin: Option<String>,
    /// SMTP configuration; `None` disables real email delivery
    pub smtp: Option<SmtpConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// SMTP relay configuration for transactional email.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct SmtpConfig {
    /// SMTP relay hostname
    pub host: String,
    /// SMTP relay port
    pub port: u16,
    /// SMTP username
    pub username: String,
    /// SMTP password
    pub password: SecretString,
    /// From address for outgoing mail
    pub from_address: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing, malformed,
    /// or the JWT secret fails the strength checks.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors - env vars may be set directly)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("ANDAR_DATABASE_URL")?;
        let host = get_env_or_default("ANDAR_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("ANDAR_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("ANDAR_PORT", "5000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("ANDAR_PORT".to_string(), e.to_string()))?;

        let jwt_secret = get_required_secret("ANDAR_JWT_SECRET")?;
        validate_jwt_secret(&jwt_secret, "ANDAR_JWT_SECRET")?;
        validate_secret_strength(jwt_secret.expose_secret(), "ANDAR_JWT_SECRET")?;

        let token_ttl_secs = get_env_or_default("ANDAR_TOKEN_TTL_SECS", "3600")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("ANDAR_TOKEN_TTL_SECS".to_string(), e.to_string())
            })?;

        let shipping_fee = get_env_or_default("ANDAR_SHIPPING_FEE", "15.00")
            .parse::<Decimal>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("ANDAR_SHIPPING_FEE".to_string(), e.to_string())
            })?;
        if shipping_fee < Decimal::ZERO {
            return Err(ConfigError::InvalidEnvVar(
                "ANDAR_SHIPPING_FEE".to_string(),
                "must be non-negative".to_string(),
            ));
        }

        let no_reference_methods =
            parse_payment_methods(&get_env_or_default("ANDAR_NO_REFERENCE_METHODS", "card"))?;

        let upload_dir = get_env_or_default("ANDAR_UPLOAD_DIR", "uploads");
        let cors_origin = get_optional_env("ANDAR_CORS_ORIGIN");
        let smtp = SmtpConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");

        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            token_ttl_secs,
            shipping_fee,
            no_reference_methods,
            upload_dir,
            cors_origin,
            smtp,
            sentry_dsn,
            sentry_environment,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the given payment method requires a transaction reference.
    #[must_use]
    pub fn requires_transaction_reference(&self, method: PaymentMethod) -> bool {
        !self.no_reference_methods.contains(&method)
    }

    /// Shipping cost for the given method: the configured flat fee for
    /// `ship`, zero for `pickup`.
    #[must_use]
    pub fn shipping_cost(&self, method: andar_core::ShippingMethod) -> Decimal {
        match method {
            andar_core::ShippingMethod::Ship => self.shipping_fee,
            andar_core::ShippingMethod::Pickup => Decimal::ZERO,
        }
    }
}

impl SmtpConfig {
    /// Load SMTP configuration; returns `None` when `ANDAR_SMTP_HOST` is unset.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(host) = get_optional_env("ANDAR_SMTP_HOST") else {
            return Ok(None);
        };

        let port = get_env_or_default("ANDAR_SMTP_PORT", "587")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("ANDAR_SMTP_PORT".to_string(), e.to_string())
            })?;

        Ok(Some(Self {
            host,
            port,
            username: get_required_env("ANDAR_SMTP_USERNAME")?,
            password: get_required_secret("ANDAR_SMTP_PASSWORD")?,
            from_address: get_required_env("ANDAR_SMTP_FROM")?,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a comma-separated list of payment methods.
fn parse_payment_methods(raw: &str) -> Result<Vec<PaymentMethod>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            PaymentMethod::parse(s).map_err(|e| {
                ConfigError::InvalidEnvVar("ANDAR_NO_REFERENCE_METHODS".to_string(), e.to_string())
            })
        })
        .collect()
}

/// Validate that the JWT secret meets minimum length requirements.
fn validate_jwt_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("contains placeholder pattern {pattern:?}"),
            ));
        }
    }

    // Check entropy
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("entropy too low ({entropy:.2} bits/char, need {MIN_ENTROPY_BITS_PER_CHAR})"),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use andar_core::ShippingMethod;

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
    fn test_shannon_entropy_high() {
        // Random-looking string should have high entropy
        let entropy = shannon_entropy("aB3$xY9!mK2@nL5#");
        assert!(entropy > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here", "TEST_VAR");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_changeme() {
        let result = validate_secret_strength("changeme123", "TEST_VAR");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        // High-entropy random string
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_jwt_secret_too_short() {
        let secret = SecretString::from("short");
        let result = validate_jwt_secret(&secret, "TEST_JWT");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_jwt_secret_valid_length() {
        let secret = SecretString::from("a".repeat(32));
        let result = validate_jwt_secret(&secret, "TEST_JWT");
        assert!(result.is_ok());
    }

    #[test]
    fn test_parse_payment_methods() {
        let methods = parse_payment_methods("card").unwrap();
        assert_eq!(methods, vec![PaymentMethod::Card]);

        let methods = parse_payment_methods("card, yape").unwrap();
        assert_eq!(methods, vec![PaymentMethod::Card, PaymentMethod::Yape]);

        let methods = parse_payment_methods("").unwrap();
        assert!(methods.is_empty());

        assert!(parse_payment_methods("bitcoin").is_err());
    }

    #[test]
    fn test_requires_transaction_reference() {
        let config = test_config();
        assert!(!config.requires_transaction_reference(PaymentMethod::Card));
        assert!(config.requires_transaction_reference(PaymentMethod::Yape));
        assert!(config.requires_transaction_reference(PaymentMethod::Plin));
        assert!(config.requires_transaction_reference(PaymentMethod::BankTransfer));
    }

    #[test]
    fn test_shipping_cost_by_method() {
        let config = test_config();
        assert_eq!(config.shipping_cost(ShippingMethod::Ship), Decimal::new(1500, 2));
        assert_eq!(config.shipping_cost(ShippingMethod::Pickup), Decimal::ZERO);
    }

    #[test]
    fn test_socket_addr() {
        let config = test_config();
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 5000);
    }

    #[test]
    fn test_smtp_config_debug_redacts_password() {
        let config = SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: "mailer".to_string(),
            password: SecretString::from("super_secret_smtp_password"),
            from_address: "pedidos@andar.pe".to_string(),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("smtp.example.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_smtp_password"));
    }
}
