//! Domain enums for orders, users, and payment.
//!
//! All enums serialize as `snake_case` strings and are stored as TEXT in
//! PostgreSQL. `parse` is strict: values outside the enumerated set are
//! rejected, which is how the API surfaces invalid status updates.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when a string is not a member of a domain enum.
#[derive(thiserror::Error, Debug, Clone)]
#[error("invalid {kind}: {value:?}")]
pub struct ParseEnumError {
    /// Which enum was being parsed (e.g. "order status").
    pub kind: &'static str,
    /// The offending input.
    pub value: String,
}

macro_rules! impl_text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// All members of the enumerated set.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The canonical string form.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }

            /// Parse from the canonical string form.
            ///
            /// # Errors
            ///
            /// Returns [`ParseEnumError`] for any value outside the set.
            pub fn parse(s: &str) -> Result<Self, ParseEnumError> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ParseEnumError {
                        kind: $kind,
                        value: other.to_owned(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <String as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <String as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, ::sqlx::error::BoxDynError> {
                let s = <String as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
                Ok(Self::parse(&s)?)
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <&str as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
            }
        }
    };
}

/// Order lifecycle status.
///
/// An administrator may move an order to any member of the set from any
/// prior status. There is no transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl_text_enum!(OrderStatus, "order status", {
    Pending => "pending",
    Processing => "processing",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

/// User role for access control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Customer,
    Administrator,
}

impl_text_enum!(Role, "role", {
    Customer => "customer",
    Administrator => "administrator",
});

/// How an order reaches the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShippingMethod {
    /// Picked up at the store; no address required.
    Pickup,
    /// Delivered to a shipping address; street, district, and city required.
    Ship,
}

impl_text_enum!(ShippingMethod, "shipping method", {
    Pickup => "pickup",
    Ship => "ship",
});

/// Accepted payment methods.
///
/// Non-card methods settle out of band and carry a customer-supplied
/// transaction reference; which methods are exempt from the reference is
/// configuration, not hard-coded here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Credit or debit card.
    Card,
    /// Yape mobile wallet.
    Yape,
    /// Plin mobile wallet.
    Plin,
    /// Direct bank transfer.
    BankTransfer,
}

impl_text_enum!(PaymentMethod, "payment method", {
    Card => "card",
    Yape => "yape",
    Plin => "plin",
    BankTransfer => "bank_transfer",
});

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_parse_roundtrip() {
        for status in OrderStatus::ALL {
            assert_eq!(OrderStatus::parse(status.as_str()).unwrap(), *status);
        }
    }

    #[test]
    fn test_order_status_rejects_unknown() {
        let err = OrderStatus::parse("refunded").unwrap_err();
        assert_eq!(err.kind, "order status");
        assert_eq!(err.value, "refunded");
    }

    #[test]
    fn test_order_status_default_is_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn test_order_status_serde_snake_case() {
        let json = serde_json::to_string(&OrderStatus::Shipped).unwrap();
        assert_eq!(json, "\"shipped\"");

        let parsed: OrderStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(parsed, OrderStatus::Cancelled);
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("administrator").unwrap(), Role::Administrator);
        assert_eq!(Role::parse("customer").unwrap(), Role::Customer);
        assert!(Role::parse("superuser").is_err());
    }

    #[test]
    fn test_shipping_method_parse() {
        assert_eq!(ShippingMethod::parse("pickup").unwrap(), ShippingMethod::Pickup);
        assert_eq!(ShippingMethod::parse("ship").unwrap(), ShippingMethod::Ship);
        assert!(ShippingMethod::parse("drone").is_err());
    }

    #[test]
    fn test_payment_method_serde() {
        let json = serde_json::to_string(&PaymentMethod::BankTransfer).unwrap();
        assert_eq!(json, "\"bank_transfer\"");

        let parsed: PaymentMethod = serde_json::from_str("\"yape\"").unwrap();
        assert_eq!(parsed, PaymentMethod::Yape);
    }

    #[test]
    fn test_payment_method_from_str() {
        let method: PaymentMethod = "plin".parse().unwrap();
        assert_eq!(method, PaymentMethod::Plin);
    }
}
