//! Order placement workflow.
//!
//! Validates a proposed order against the live catalog, decrements stock,
//! snapshots lines, and persists the order - all inside one transaction, so
//! a failure anywhere leaves no stock decremented and no order row behind.
//! Stock itself is taken with a conditional UPDATE (`stock = stock - n WHERE
//! stock >= n`), so two concurrent orders can never both take the last pair.
//!
//! Totals are recomputed here from catalog prices and the configured
//! shipping fee; caller-supplied totals are only ever checked, never
//! trusted. The confirmation email is enqueued in the same transaction and
//! delivered later by the outbox worker - its failure cannot fail an order.

use andar_core::{Email, EmailError, PaymentMethod, ProductId, ShippingMethod, UserId};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;

use crate::config::ServerConfig;
use crate::db::{RepositoryError, orders, outbox, products};
use crate::models::order::{Order, OrderLine};
use crate::models::Address;

/// `POST /api/orders` request body.
///
/// Everything is optional at the serde level so that missing fields surface
/// as workflow validation errors, each naming the offending field, instead
/// of an opaque deserialization failure.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaceOrderRequest {
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub items: Vec<RequestedLine>,
    pub shipping_method: Option<ShippingMethod>,
    pub shipping_address: Option<Address>,
    pub payment_method: Option<PaymentMethod>,
    pub transaction_reference: Option<String>,
    /// Client-computed totals; checked against the server's own numbers
    /// when present, never stored as-is.
    pub subtotal: Option<Decimal>,
    pub shipping_cost: Option<Decimal>,
    pub total: Option<Decimal>,
}

/// One requested line: which variant, how many.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestedLine {
    pub product_id: ProductId,
    pub variant_sku: String,
    pub quantity: i32,
}

/// Why an order was refused. Each variant is a distinct, client-visible
/// reason; nothing is mutated when any of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("customerEmail is not a valid email address: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("shipping address needs street, district, and city")]
    IncompleteAddress,

    #[error("payment method {0} requires a transaction reference")]
    MissingTransactionReference(PaymentMethod),

    #[error("quantity for {sku} must be at least 1")]
    InvalidQuantity { sku: String },

    #[error("product {0} not found or unavailable")]
    ProductUnavailable(ProductId),

    #[error("variant {sku} not found for product {product_id}")]
    VariantNotFound { product_id: ProductId, sku: String },

    #[error("insufficient stock for {sku}: requested {requested}, available {available}")]
    InsufficientStock {
        sku: String,
        requested: i32,
        available: i32,
    },

    #[error("{field} does not match the server-computed value {computed}")]
    TotalMismatch {
        field: &'static str,
        supplied: Decimal,
        computed: Decimal,
    },

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// A request that passed field validation: every mandatory value present
/// and typed, address and reference policy already enforced.
#[derive(Debug)]
struct OrderIntent {
    customer_name: String,
    customer_email: Email,
    customer_phone: Option<String>,
    items: Vec<RequestedLine>,
    shipping_method: ShippingMethod,
    shipping_address: Option<Address>,
    payment_method: PaymentMethod,
    transaction_reference: Option<String>,
}

/// Order placement service.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
    config: &'a ServerConfig,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, config: &'a ServerConfig) -> Self {
        Self { pool, config }
    }

    /// Place an order.
    ///
    /// `user_id` is present when the request carried a valid bearer token;
    /// guest checkout passes `None` and relies on the contact fields.
    ///
    /// # Errors
    ///
    /// Returns a [`CheckoutError`] naming the violated rule. On any error
    /// the transaction rolls back and no stock is decremented.
    pub async fn place_order(
        &self,
        request: PlaceOrderRequest,
        user_id: Option<UserId>,
    ) -> Result<Order, CheckoutError> {
        let supplied_subtotal = request.subtotal;
        let supplied_total = request.total;
        let intent = validate_request(request, self.config)?;

        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        // Validate and take stock line by line, in the order given.
        let mut lines = Vec::with_capacity(intent.items.len());
        for item in &intent.items {
            let line = reserve_line(&mut tx, item).await?;
            lines.push(line);
        }

        let subtotal = compute_subtotal(&lines);
        let shipping_cost = self.config.shipping_cost(intent.shipping_method);
        let total = subtotal + shipping_cost;

        // Erroring out here drops the transaction, rolling the decrements back.
        verify_supplied("subtotal", supplied_subtotal, subtotal)?;
        verify_supplied("total", supplied_total, total)?;

        let new_order = orders::NewOrder {
            user_id,
            customer_name: intent.customer_name,
            customer_email: intent.customer_email,
            customer_phone: intent.customer_phone,
            shipping_method: intent.shipping_method,
            shipping_address: intent.shipping_address,
            payment_method: intent.payment_method,
            transaction_reference: intent.transaction_reference,
            subtotal,
            shipping_cost,
            total,
            lines,
        };

        let order = orders::insert_order(&mut tx, &new_order).await?;
        outbox::enqueue(&mut tx, order.id, order.customer_email.as_str()).await?;

        tx.commit().await.map_err(RepositoryError::from)?;

        info!(
            order_id = %order.id,
            lines = order.lines.len(),
            total = %order.total,
            "order placed"
        );

        Ok(order)
    }
}

/// Look up one requested line and take its stock.
///
/// The conditional decrement is the authority on availability; the
/// preceding stock read only exists to report a useful `available` count.
async fn reserve_line(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    item: &RequestedLine,
) -> Result<OrderLine, CheckoutError> {
    let lookup = products::lookup_variant(&mut **tx, item.product_id, &item.variant_sku).await?;

    let Some(lookup) = lookup else {
        // Distinguish "no such product" from "product has no such SKU".
        if products::product_exists(&mut **tx, item.product_id).await? {
            return Err(CheckoutError::VariantNotFound {
                product_id: item.product_id,
                sku: item.variant_sku.clone(),
            });
        }
        return Err(CheckoutError::ProductUnavailable(item.product_id));
    };

    if !lookup.active {
        return Err(CheckoutError::ProductUnavailable(item.product_id));
    }

    if lookup.stock < item.quantity {
        return Err(CheckoutError::InsufficientStock {
            sku: item.variant_sku.clone(),
            requested: item.quantity,
            available: lookup.stock,
        });
    }

    let taken = products::try_decrement_stock(&mut **tx, &item.variant_sku, item.quantity).await?;
    if !taken {
        // A concurrent order won the race between our read and the update.
        let available = products::lookup_variant(&mut **tx, item.product_id, &item.variant_sku)
            .await?
            .map_or(0, |l| l.stock);
        return Err(CheckoutError::InsufficientStock {
            sku: item.variant_sku.clone(),
            requested: item.quantity,
            available,
        });
    }

    Ok(OrderLine {
        product_id: item.product_id,
        product_name: lookup.product_name,
        size: lookup.size,
        color: lookup.color,
        sku: item.variant_sku.clone(),
        quantity: item.quantity,
        unit_price: lookup.unit_price,
    })
}

/// Field validation: the fail-fast sequence that runs before any database
/// access. Pure, so every rule is unit-testable.
fn validate_request(
    request: PlaceOrderRequest,
    config: &ServerConfig,
) -> Result<OrderIntent, CheckoutError> {
    let customer_name = request
        .customer_name
        .filter(|s| !s.trim().is_empty())
        .ok_or(CheckoutError::MissingField("customerName"))?;
    let customer_email = request
        .customer_email
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(CheckoutError::MissingField("customerEmail"))?;
    let customer_email = Email::parse(customer_email)?;
    let shipping_method = request
        .shipping_method
        .ok_or(CheckoutError::MissingField("shippingMethod"))?;
    let payment_method = request
        .payment_method
        .ok_or(CheckoutError::MissingField("paymentMethod"))?;
    if request.items.is_empty() {
        return Err(CheckoutError::MissingField("items"));
    }

    for item in &request.items {
        if item.quantity < 1 {
            return Err(CheckoutError::InvalidQuantity {
                sku: item.variant_sku.clone(),
            });
        }
    }

    // Pickup needs no address and stores none, even if one was sent.
    let shipping_address = match shipping_method {
        ShippingMethod::Ship => {
            let address = request
                .shipping_address
                .ok_or(CheckoutError::IncompleteAddress)?;
            if !address.is_complete() {
                return Err(CheckoutError::IncompleteAddress);
            }
            Some(address)
        }
        ShippingMethod::Pickup => None,
    };

    let transaction_reference = request
        .transaction_reference
        .filter(|s| !s.trim().is_empty());
    if config.requires_transaction_reference(payment_method) && transaction_reference.is_none() {
        return Err(CheckoutError::MissingTransactionReference(payment_method));
    }

    // Client totals are advisory: verified here, recomputed authoritatively
    // after the lines are priced.
    if let Some(supplied) = request.shipping_cost {
        let computed = config.shipping_cost(shipping_method);
        if supplied != computed {
            return Err(CheckoutError::TotalMismatch {
                field: "shippingCost",
                supplied,
                computed,
            });
        }
    }

    Ok(OrderIntent {
        customer_name,
        customer_email,
        customer_phone: request.customer_phone.filter(|s| !s.trim().is_empty()),
        items: request.items,
        shipping_method,
        shipping_address,
        payment_method,
        transaction_reference,
    })
}

/// Sum of unit price × quantity over the snapshotted lines.
fn compute_subtotal(lines: &[OrderLine]) -> Decimal {
    lines.iter().map(OrderLine::line_total).sum()
}

/// Reject a client-supplied amount that disagrees with the server's own.
fn verify_supplied(
    field: &'static str,
    supplied: Option<Decimal>,
    computed: Decimal,
) -> Result<(), CheckoutError> {
    match supplied {
        Some(supplied) if supplied != computed => Err(CheckoutError::TotalMismatch {
            field,
            supplied,
            computed,
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

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

    fn ship_address() -> Address {
        Address {
            street: "Av. Brasil 500".to_string(),
            district: "Magdalena".to_string(),
            city: "Lima".to_string(),
            ..Address::default()
        }
    }

    fn valid_request() -> PlaceOrderRequest {
        PlaceOrderRequest {
            customer_name: Some("Rosa Quispe".to_string()),
            customer_email: Some("rosa@example.com".to_string()),
            items: vec![RequestedLine {
                product_id: ProductId::new(1),
                variant_sku: "S-40-BLK".to_string(),
                quantity: 2,
            }],
            shipping_method: Some(ShippingMethod::Ship),
            shipping_address: Some(ship_address()),
            payment_method: Some(PaymentMethod::Card),
            ..PlaceOrderRequest::default()
        }
    }

    #[test]
    fn test_valid_request_passes() {
        let intent = validate_request(valid_request(), &test_config()).unwrap();
        assert_eq!(intent.customer_email.as_str(), "rosa@example.com");
        assert!(intent.shipping_address.is_some());
    }

    #[test]
    fn test_missing_name() {
        let mut req = valid_request();
        req.customer_name = None;
        assert!(matches!(
            validate_request(req, &test_config()),
            Err(CheckoutError::MissingField("customerName"))
        ));
    }

    #[test]
    fn test_blank_email_is_missing() {
        let mut req = valid_request();
        req.customer_email = Some("   ".to_string());
        assert!(matches!(
            validate_request(req, &test_config()),
            Err(CheckoutError::MissingField("customerEmail"))
        ));
    }

    #[test]
    fn test_malformed_email_is_its_own_error() {
        // Present but invalid is not the same refusal as absent.
        let mut req = valid_request();
        req.customer_email = Some("rosa-at-example.com".to_string());
        assert!(matches!(
            validate_request(req, &test_config()),
            Err(CheckoutError::InvalidEmail(EmailError::MissingAtSymbol))
        ));
    }

    #[test]
    fn test_empty_items() {
        let mut req = valid_request();
        req.items.clear();
        assert!(matches!(
            validate_request(req, &test_config()),
            Err(CheckoutError::MissingField("items"))
        ));
    }

    #[test]
    fn test_zero_quantity() {
        let mut req = valid_request();
        req.items[0].quantity = 0;
        assert!(matches!(
            validate_request(req, &test_config()),
            Err(CheckoutError::InvalidQuantity { .. })
        ));
    }

    #[test]
    fn test_ship_requires_complete_address() {
        let mut req = valid_request();
        req.shipping_address = Some(Address {
            street: "Av. Brasil 500".to_string(),
            ..Address::default()
        });
        assert!(matches!(
            validate_request(req, &test_config()),
            Err(CheckoutError::IncompleteAddress)
        ));

        let mut req = valid_request();
        req.shipping_address = None;
        assert!(matches!(
            validate_request(req, &test_config()),
            Err(CheckoutError::IncompleteAddress)
        ));
    }

    #[test]
    fn test_pickup_needs_no_address() {
        let mut req = valid_request();
        req.shipping_method = Some(ShippingMethod::Pickup);
        req.shipping_address = None;

        let intent = validate_request(req, &test_config()).unwrap();
        assert!(intent.shipping_address.is_none());
    }

    #[test]
    fn test_pickup_discards_supplied_address() {
        let mut req = valid_request();
        req.shipping_method = Some(ShippingMethod::Pickup);

        let intent = validate_request(req, &test_config()).unwrap();
        assert!(intent.shipping_address.is_none());
    }

    #[test]
    fn test_non_card_requires_reference() {
        let mut req = valid_request();
        req.payment_method = Some(PaymentMethod::Yape);
        req.transaction_reference = None;
        assert!(matches!(
            validate_request(req, &test_config()),
            Err(CheckoutError::MissingTransactionReference(PaymentMethod::Yape))
        ));

        let mut req = valid_request();
        req.payment_method = Some(PaymentMethod::Yape);
        req.transaction_reference = Some("YP-20260830-001".to_string());
        let intent = validate_request(req, &test_config()).unwrap();
        assert_eq!(intent.transaction_reference.as_deref(), Some("YP-20260830-001"));
    }

    #[test]
    fn test_card_exempt_from_reference_is_configuration() {
        // Default config exempts card
        let req = valid_request();
        assert!(validate_request(req, &test_config()).is_ok());

        // A config that exempts nothing requires it even for card
        let mut strict = test_config();
        strict.no_reference_methods.clear();
        assert!(matches!(
            validate_request(valid_request(), &strict),
            Err(CheckoutError::MissingTransactionReference(PaymentMethod::Card))
        ));
    }

    #[test]
    fn test_blank_reference_counts_as_missing() {
        let mut req = valid_request();
        req.payment_method = Some(PaymentMethod::BankTransfer);
        req.transaction_reference = Some("  ".to_string());
        assert!(matches!(
            validate_request(req, &test_config()),
            Err(CheckoutError::MissingTransactionReference(_))
        ));
    }

    #[test]
    fn test_supplied_shipping_cost_verified() {
        let mut req = valid_request();
        req.shipping_cost = Some(Decimal::ZERO); // ship costs 15.00, not 0
        assert!(matches!(
            validate_request(req, &test_config()),
            Err(CheckoutError::TotalMismatch { field: "shippingCost", .. })
        ));

        let mut req = valid_request();
        req.shipping_cost = Some(Decimal::new(1500, 2));
        assert!(validate_request(req, &test_config()).is_ok());
    }

    #[test]
    fn test_subtotal_is_price_times_quantity() {
        // One line, qty 2 at 50.00 -> subtotal 100.00
        let lines = vec![OrderLine {
            product_id: ProductId::new(1),
            product_name: "Zapatilla Clásica".to_string(),
            size: "40".to_string(),
            color: "Negro".to_string(),
            sku: "S-40-BLK".to_string(),
            quantity: 2,
            unit_price: Decimal::new(5000, 2),
        }];
        assert_eq!(compute_subtotal(&lines), Decimal::new(10000, 2));
    }

    #[test]
    fn test_subtotal_sums_multiple_lines() {
        let line = |qty: i32, cents: i64| OrderLine {
            product_id: ProductId::new(1),
            product_name: "x".to_string(),
            size: "40".to_string(),
            color: "Negro".to_string(),
            sku: "X".to_string(),
            quantity: qty,
            unit_price: Decimal::new(cents, 2),
        };
        let lines = vec![line(2, 5000), line(1, 19990)];
        assert_eq!(compute_subtotal(&lines), Decimal::new(29990, 2));
    }

    #[test]
    fn test_supplied_totals_verified_against_computed() {
        // Absent values pass; matching values pass; disagreement is an error.
        assert!(verify_supplied("total", None, Decimal::new(11500, 2)).is_ok());
        assert!(verify_supplied("total", Some(Decimal::new(11500, 2)), Decimal::new(11500, 2)).is_ok());
        assert!(matches!(
            verify_supplied("total", Some(Decimal::new(9900, 2)), Decimal::new(11500, 2)),
            Err(CheckoutError::TotalMismatch { field: "total", .. })
        ));
    }
}
