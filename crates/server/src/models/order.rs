//! Order models.
//!
//! An order is written exactly once by the checkout workflow. Its lines are
//! denormalized snapshots of the catalog at placement time, so later product
//! edits never alter order history. Only `status` is mutable afterwards.

use andar_core::{Email, OrderId, OrderStatus, PaymentMethod, ProductId, ShippingMethod, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::Address;

/// A placed order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    /// Present only when the customer was authenticated; guest orders carry
    /// contact fields instead.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub customer_name: String,
    pub customer_email: Email,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    pub lines: Vec<OrderLine>,
    pub shipping_method: ShippingMethod,
    /// `None` for pickup orders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<Address>,
    pub payment_method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_reference: Option<String>,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub total: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// Immutable line snapshot: what was bought, at what price, at that moment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub size: String,
    pub color: String,
    pub sku: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl OrderLine {
    /// Line total (unit price × quantity).
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_line_total() {
        let line = OrderLine {
            product_id: ProductId::new(1),
            product_name: "Zapatilla Urbana".to_string(),
            size: "40".to_string(),
            color: "Negro".to_string(),
            sku: "URB-40-NEG".to_string(),
            quantity: 2,
            unit_price: Decimal::new(5000, 2),
        };
        assert_eq!(line.line_total(), Decimal::new(10000, 2));
    }

    #[test]
    fn test_guest_order_serializes_without_user_id() {
        let order = Order {
            id: OrderId::new(1),
            user_id: None,
            customer_name: "Luis".to_string(),
            customer_email: Email::parse("luis@example.com").unwrap(),
            customer_phone: Some("+51 999 888 777".to_string()),
            lines: vec![],
            shipping_method: ShippingMethod::Pickup,
            shipping_address: None,
            payment_method: PaymentMethod::Yape,
            transaction_reference: Some("YP-123".to_string()),
            subtotal: Decimal::ZERO,
            shipping_cost: Decimal::ZERO,
            total: Decimal::ZERO,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&order).unwrap();
        assert!(!json.contains("userId"));
        assert!(!json.contains("shippingAddress"));
        assert!(json.contains("\"status\":\"pending\""));
        assert!(json.contains("\"shippingMethod\":\"pickup\""));
    }
}
