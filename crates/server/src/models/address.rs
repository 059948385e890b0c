//! Postal address, used both for saved user addresses and order shipping.

use serde::{Deserialize, Serialize};

/// A delivery address.
///
/// Street, district, and city are the fields required for the `ship`
/// shipping method; the rest are free-form extras.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    pub street: String,
    /// Door or apartment number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub district: String,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    /// Landmark or delivery note ("frente al parque").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl Address {
    /// Whether the fields required for shipping are present and non-blank.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.street.trim().is_empty()
            && !self.district.trim().is_empty()
            && !self.city.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_address() {
        let addr = Address {
            street: "Av. Arequipa 1234".to_string(),
            unit: Some("Dpto 5".to_string()),
            district: "Miraflores".to_string(),
            city: "Lima".to_string(),
            postal_code: Some("15074".to_string()),
            reference: None,
        };
        assert!(addr.is_complete());
    }

    #[test]
    fn test_incomplete_address() {
        let addr = Address {
            street: "Av. Arequipa 1234".to_string(),
            district: String::new(),
            city: "Lima".to_string(),
            ..Address::default()
        };
        assert!(!addr.is_complete());

        let blank = Address {
            street: "   ".to_string(),
            district: "Miraflores".to_string(),
            city: "Lima".to_string(),
            ..Address::default()
        };
        assert!(!blank.is_complete());
    }
}
