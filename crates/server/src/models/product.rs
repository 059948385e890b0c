//! Catalog models.

use andar_core::{ProductId, VariantId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A catalog product with its purchasable variants.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub images: Vec<String>,
    pub category: String,
    pub brand: String,
    pub variants: Vec<Variant>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// One size/color combination with its own stock.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    #[serde(skip)]
    pub id: VariantId,
    pub size: String,
    pub color: String,
    pub sku: String,
    pub stock: i32,
}

/// Payload for creating or replacing a product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub images: Vec<String>,
    pub category: String,
    pub brand: String,
    pub variants: Vec<VariantInput>,
    #[serde(default = "default_active")]
    pub active: bool,
}

const fn default_active() -> bool {
    true
}

/// Variant payload within a [`ProductInput`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantInput {
    pub size: String,
    pub color: String,
    pub sku: String,
    pub stock: i32,
}

impl ProductInput {
    /// Validate the payload against catalog invariants.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message naming the violated rule.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("product name is required".to_string());
        }
        if self.price < Decimal::ZERO {
            return Err("price must be non-negative".to_string());
        }
        if self.variants.is_empty() {
            return Err("a product needs at least one variant".to_string());
        }
        for variant in &self.variants {
            if variant.sku.trim().is_empty() {
                return Err("every variant needs a SKU".to_string());
            }
            if variant.stock < 0 {
                return Err(format!("stock for {} must be non-negative", variant.sku));
            }
        }
        // SKU uniqueness within the payload; cross-catalog uniqueness is
        // enforced by the database constraint.
        for (i, a) in self.variants.iter().enumerate() {
            if self.variants.iter().skip(i + 1).any(|b| b.sku == a.sku) {
                return Err(format!("duplicate SKU in payload: {}", a.sku));
            }
        }
        Ok(())
    }
}
