//! Account models.
//!
//! The password hash lives only inside [`User`] and is never serialized;
//! API responses use [`PublicUser`].

use andar_core::{Email, Role, UserId};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::Address;

/// A registered account, as loaded from the database.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    /// Argon2 hash of the credential. Never leaves the server.
    pub password_hash: String,
    pub role: Role,
    pub addresses: Vec<Address>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// The view of this account that is safe to return to clients.
    #[must_use]
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            addresses: self.addresses.clone(),
            created_at: self.created_at,
        }
    }
}

/// Client-facing account view, without the credential.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: Role,
    pub addresses: Vec<Address>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_public_view_omits_credential() {
        let user = User {
            id: UserId::new(1),
            name: "Ana".to_string(),
            email: Email::parse("ana@example.com").unwrap(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$abc$def".to_string(),
            role: Role::Customer,
            addresses: vec![],
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&user.public()).unwrap();
        assert!(json.contains("ana@example.com"));
        assert!(!json.contains("argon2"));
        assert!(!json.contains("passwordHash"));
    }
}
