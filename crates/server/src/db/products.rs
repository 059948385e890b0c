//! Catalog repository.
//!
//! Stock mutation happens through [`try_decrement_stock`], a single
//! conditional UPDATE. Checkout calls it inside one transaction per order so
//! concurrent orders can never both take the last pair.

use andar_core::{ProductId, VariantId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use super::RepositoryError;
use crate::models::product::{Product, ProductInput, Variant};

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    description: String,
    price: Decimal,
    images: Vec<String>,
    category: String,
    brand: String,
    active: bool,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct VariantRow {
    id: i32,
    product_id: i32,
    size: String,
    color: String,
    sku: String,
    stock: i32,
}

impl ProductRow {
    fn into_product(self, variants: Vec<Variant>) -> Product {
        Product {
            id: ProductId::new(self.id),
            name: self.name,
            description: self.description,
            price: self.price,
            images: self.images,
            category: self.category,
            brand: self.brand,
            variants,
            active: self.active,
            created_at: self.created_at,
        }
    }
}

impl From<VariantRow> for Variant {
    fn from(row: VariantRow) -> Self {
        Self {
            id: VariantId::new(row.id),
            size: row.size,
            color: row.color,
            sku: row.sku,
            stock: row.stock,
        }
    }
}

/// Repository for catalog database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all active products with their variants.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_active(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(
            "SELECT id, name, description, price, images, category, brand, active, created_at
             FROM products WHERE active ORDER BY created_at DESC",
        )
        .fetch_all(self.pool)
        .await?;

        let variants: Vec<VariantRow> = sqlx::query_as(
            "SELECT v.id, v.product_id, v.size, v.color, v.sku, v.stock
             FROM variants v JOIN products p ON p.id = v.product_id
             WHERE p.active ORDER BY v.id",
        )
        .fetch_all(self.pool)
        .await?;

        let mut by_product: std::collections::HashMap<i32, Vec<Variant>> =
            std::collections::HashMap::new();
        for v in variants {
            by_product.entry(v.product_id).or_default().push(v.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let variants = by_product.remove(&row.id).unwrap_or_default();
                row.into_product(variants)
            })
            .collect())
    }

    /// Get one product by id, with its variants.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(
            "SELECT id, name, description, price, images, category, brand, active, created_at
             FROM products WHERE id = $1",
        )
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else { return Ok(None) };

        let variants: Vec<VariantRow> = sqlx::query_as(
            "SELECT id, product_id, size, color, sku, stock
             FROM variants WHERE product_id = $1 ORDER BY id",
        )
        .bind(row.id)
        .fetch_all(self.pool)
        .await?;

        Ok(Some(
            row.into_product(variants.into_iter().map(Into::into).collect()),
        ))
    }

    /// Create a product with its variants.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a SKU already exists elsewhere
    /// in the catalog, `RepositoryError::Database` otherwise.
    pub async fn create(&self, input: &ProductInput) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row: ProductRow = sqlx::query_as(
            "INSERT INTO products (name, description, price, images, category, brand, active)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id, name, description, price, images, category, brand, active, created_at",
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price)
        .bind(&input.images)
        .bind(&input.category)
        .bind(&input.brand)
        .bind(input.active)
        .fetch_one(&mut *tx)
        .await?;

        let variants = insert_variants(&mut tx, row.id, input).await?;
        tx.commit().await?;

        Ok(row.into_product(variants))
    }

    /// Replace a product and its variant list.
    ///
    /// Returns `Ok(None)` if the product does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on SKU collision,
    /// `RepositoryError::Database` otherwise.
    pub async fn update(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Option<Product>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<ProductRow> = sqlx::query_as(
            "UPDATE products
             SET name = $2, description = $3, price = $4, images = $5,
                 category = $6, brand = $7, active = $8
             WHERE id = $1
             RETURNING id, name, description, price, images, category, brand, active, created_at",
        )
        .bind(id.as_i32())
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price)
        .bind(&input.images)
        .bind(&input.category)
        .bind(&input.brand)
        .bind(input.active)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else { return Ok(None) };

        sqlx::query("DELETE FROM variants WHERE product_id = $1")
            .bind(row.id)
            .execute(&mut *tx)
            .await?;

        let variants = insert_variants(&mut tx, row.id, input).await?;
        tx.commit().await?;

        Ok(Some(row.into_product(variants)))
    }

    /// Delete a product. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

async fn insert_variants(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    product_id: i32,
    input: &ProductInput,
) -> Result<Vec<Variant>, RepositoryError> {
    let mut variants = Vec::with_capacity(input.variants.len());
    for v in &input.variants {
        let row: VariantRow = sqlx::query_as(
            "INSERT INTO variants (product_id, size, color, sku, stock)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, product_id, size, color, sku, stock",
        )
        .bind(product_id)
        .bind(&v.size)
        .bind(&v.color)
        .bind(&v.sku)
        .bind(v.stock)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| super::map_unique_violation(e, "SKU already exists in the catalog"))?;
        variants.push(row.into());
    }
    Ok(variants)
}

// =============================================================================
// Checkout-facing queries (run inside the order transaction)
// =============================================================================

/// What checkout needs to know about one requested line.
#[derive(Debug, sqlx::FromRow)]
pub struct LineLookup {
    pub product_name: String,
    pub unit_price: Decimal,
    pub active: bool,
    pub size: String,
    pub color: String,
    pub stock: i32,
}

/// Look up a product/variant pair for the given product id and SKU.
///
/// Returns `Ok(None)` when either side is missing. Active/stock checks are
/// the caller's job; this only fetches.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lookup_variant(
    conn: &mut PgConnection,
    product_id: ProductId,
    sku: &str,
) -> Result<Option<LineLookup>, RepositoryError> {
    let row: Option<LineLookup> = sqlx::query_as(
        "SELECT p.name AS product_name, p.price AS unit_price, p.active,
                v.size, v.color, v.stock
         FROM products p JOIN variants v ON v.product_id = p.id
         WHERE p.id = $1 AND v.sku = $2",
    )
    .bind(product_id.as_i32())
    .bind(sku)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

/// Whether a product exists at all (distinguishes `ProductUnavailable`
/// from `VariantNotFound` when [`lookup_variant`] returns nothing).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn product_exists(
    conn: &mut PgConnection,
    product_id: ProductId,
) -> Result<bool, RepositoryError> {
    let row: Option<(i32,)> = sqlx::query_as("SELECT 1 FROM products WHERE id = $1")
        .bind(product_id.as_i32())
        .fetch_optional(conn)
        .await?;
    Ok(row.is_some())
}

/// Atomically decrement stock for a SKU, only if enough remains.
///
/// Returns `true` when the decrement happened. A `false` return means
/// another order got there first (or the SKU vanished); the caller must
/// abort and roll back the surrounding transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn try_decrement_stock(
    conn: &mut PgConnection,
    sku: &str,
    quantity: i32,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query("UPDATE variants SET stock = stock - $2 WHERE sku = $1 AND stock >= $2")
        .bind(sku)
        .bind(quantity)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
