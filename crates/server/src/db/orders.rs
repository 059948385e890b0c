//! Order repository.
//!
//! Order insertion is a free function over a transaction so checkout can
//! bundle it with the stock decrements and the outbox row; reads and the
//! status update go through [`OrderRepository`].

use andar_core::{Email, OrderId, OrderStatus, PaymentMethod, ProductId, ShippingMethod, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use super::RepositoryError;
use crate::models::order::{Order, OrderLine};
use crate::models::Address;

/// Everything checkout has resolved about an order, ready to persist.
#[derive(Debug)]
pub struct NewOrder {
    pub user_id: Option<UserId>,
    pub customer_name: String,
    pub customer_email: Email,
    pub customer_phone: Option<String>,
    pub shipping_method: ShippingMethod,
    pub shipping_address: Option<Address>,
    pub payment_method: PaymentMethod,
    pub transaction_reference: Option<String>,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub total: Decimal,
    pub lines: Vec<OrderLine>,
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: Option<i32>,
    customer_name: String,
    customer_email: String,
    customer_phone: Option<String>,
    shipping_method: String,
    shipping_street: Option<String>,
    shipping_unit: Option<String>,
    shipping_district: Option<String>,
    shipping_city: Option<String>,
    shipping_postal_code: Option<String>,
    shipping_reference: Option<String>,
    payment_method: String,
    transaction_reference: Option<String>,
    subtotal: Decimal,
    shipping_cost: Decimal,
    total: Decimal,
    status: String,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct LineRow {
    order_id: i32,
    product_id: i32,
    product_name: String,
    size: String,
    color: String,
    sku: String,
    quantity: i32,
    unit_price: Decimal,
}

impl From<LineRow> for OrderLine {
    fn from(row: LineRow) -> Self {
        Self {
            product_id: ProductId::new(row.product_id),
            product_name: row.product_name,
            size: row.size,
            color: row.color,
            sku: row.sku,
            quantity: row.quantity,
            unit_price: row.unit_price,
        }
    }
}

impl OrderRow {
    fn into_order(self, lines: Vec<OrderLine>) -> Result<Order, RepositoryError> {
        let corrupt = |what: &str, detail: String| {
            RepositoryError::DataCorruption(format!("invalid {what} in database: {detail}"))
        };

        let customer_email =
            Email::parse(&self.customer_email).map_err(|e| corrupt("email", e.to_string()))?;
        let shipping_method = ShippingMethod::parse(&self.shipping_method)
            .map_err(|e| corrupt("shipping method", e.to_string()))?;
        let payment_method = PaymentMethod::parse(&self.payment_method)
            .map_err(|e| corrupt("payment method", e.to_string()))?;
        let status =
            OrderStatus::parse(&self.status).map_err(|e| corrupt("status", e.to_string()))?;

        // Pickup orders store no address columns at all.
        let shipping_address = self.shipping_street.map(|street| Address {
            street,
            unit: self.shipping_unit,
            district: self.shipping_district.unwrap_or_default(),
            city: self.shipping_city.unwrap_or_default(),
            postal_code: self.shipping_postal_code,
            reference: self.shipping_reference,
        });

        Ok(Order {
            id: OrderId::new(self.id),
            user_id: self.user_id.map(UserId::new),
            customer_name: self.customer_name,
            customer_email,
            customer_phone: self.customer_phone,
            lines,
            shipping_method,
            shipping_address,
            payment_method,
            transaction_reference: self.transaction_reference,
            subtotal: self.subtotal,
            shipping_cost: self.shipping_cost,
            total: self.total,
            status,
            created_at: self.created_at,
        })
    }
}

const ORDER_COLUMNS: &str = "id, user_id, customer_name, customer_email, customer_phone, \
     shipping_method, shipping_street, shipping_unit, shipping_district, shipping_city, \
     shipping_postal_code, shipping_reference, payment_method, transaction_reference, \
     subtotal, shipping_cost, total, status, created_at";

/// Insert an order and its line snapshots inside an open transaction.
///
/// The caller owns the transaction; nothing is visible until it commits.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub async fn insert_order(
    tx: &mut Transaction<'_, Postgres>,
    new_order: &NewOrder,
) -> Result<Order, RepositoryError> {
    let address = new_order.shipping_address.as_ref();

    let row: OrderRow = sqlx::query_as(&format!(
        "INSERT INTO orders (user_id, customer_name, customer_email, customer_phone,
             shipping_method, shipping_street, shipping_unit, shipping_district,
             shipping_city, shipping_postal_code, shipping_reference,
             payment_method, transaction_reference, subtotal, shipping_cost, total, status)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(new_order.user_id.map(|id| id.as_i32()))
    .bind(&new_order.customer_name)
    .bind(new_order.customer_email.as_str())
    .bind(&new_order.customer_phone)
    .bind(new_order.shipping_method.as_str())
    .bind(address.map(|a| a.street.clone()))
    .bind(address.and_then(|a| a.unit.clone()))
    .bind(address.map(|a| a.district.clone()))
    .bind(address.map(|a| a.city.clone()))
    .bind(address.and_then(|a| a.postal_code.clone()))
    .bind(address.and_then(|a| a.reference.clone()))
    .bind(new_order.payment_method.as_str())
    .bind(&new_order.transaction_reference)
    .bind(new_order.subtotal)
    .bind(new_order.shipping_cost)
    .bind(new_order.total)
    .bind(OrderStatus::Pending.as_str())
    .fetch_one(&mut **tx)
    .await?;

    for line in &new_order.lines {
        sqlx::query(
            "INSERT INTO order_lines
                 (order_id, product_id, product_name, size, color, sku, quantity, unit_price)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(row.id)
        .bind(line.product_id.as_i32())
        .bind(&line.product_name)
        .bind(&line.size)
        .bind(&line.color)
        .bind(&line.sku)
        .bind(line.quantity)
        .bind(line.unit_price)
        .execute(&mut **tx)
        .await?;
    }

    row.into_order(new_order.lines.clone())
}

/// Repository for order reads and status updates.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get one order with its line snapshots.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
                .bind(id.as_i32())
                .fetch_optional(self.pool)
                .await?;

        let Some(row) = row else { return Ok(None) };

        let lines: Vec<LineRow> = sqlx::query_as(
            "SELECT order_id, product_id, product_name, size, color, sku, quantity, unit_price
             FROM order_lines WHERE order_id = $1 ORDER BY id",
        )
        .bind(row.id)
        .fetch_all(self.pool)
        .await?;

        Ok(Some(
            row.into_order(lines.into_iter().map(Into::into).collect())?,
        ))
    }

    /// All orders, newest first (administrator view).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        self.attach_lines(rows).await
    }

    /// Orders belonging to one user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        self.attach_lines(rows).await
    }

    /// Set an order's status. Any member of the enumerated set is accepted
    /// for any prior status.
    ///
    /// Returns `Ok(None)` if the order does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError> {
        let updated = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(id.as_i32())
            .bind(status.as_str())
            .execute(self.pool)
            .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.get(id).await
    }

    async fn attach_lines(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let lines: Vec<LineRow> = sqlx::query_as(
            "SELECT order_id, product_id, product_name, size, color, sku, quantity, unit_price
             FROM order_lines WHERE order_id = ANY($1) ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut by_order: std::collections::HashMap<i32, Vec<OrderLine>> =
            std::collections::HashMap::new();
        for line in lines {
            by_order.entry(line.order_id).or_default().push(line.into());
        }

        rows.into_iter()
            .map(|row| {
                let lines = by_order.remove(&row.id).unwrap_or_default();
                row.into_order(lines)
            })
            .collect()
    }
}
