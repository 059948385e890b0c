//! Seed the catalog with sample products.
//!
//! Inserts a small shoe catalog for development environments. Running it
//! twice inserts the products twice; SKU uniqueness makes the second run
//! fail, which is a reasonable signal that the catalog is already seeded.

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;

use andar_server::db::{RepositoryError, products::ProductRepository};
use andar_server::models::product::{ProductInput, VariantInput};

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Repository error.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Insert the sample catalog.
///
/// # Errors
///
/// Returns an error if the database is unreachable or an insert fails.
pub async fn sample_catalog() -> Result<(), SeedError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("ANDAR_DATABASE_URL")
        .map(SecretString::from)
        .map_err(|_| SeedError::MissingEnvVar("ANDAR_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let pool = andar_server::db::create_pool(&database_url).await?;
    let repo = ProductRepository::new(&pool);

    for input in sample_products() {
        let product = repo.create(&input).await?;
        tracing::info!(
            "Seeded product: {} (id {}, {} variants)",
            product.name,
            product.id,
            product.variants.len()
        );
    }

    tracing::info!("Catalog seeded!");
    Ok(())
}

fn sample_products() -> Vec<ProductInput> {
    vec![
        ProductInput {
            name: "Zapatilla Urbana".to_owned(),
            description: "Zapatilla urbana de cuero sintético, plantilla acolchada.".to_owned(),
            price: Decimal::new(24990, 2),
            images: vec![],
            category: "zapatillas".to_owned(),
            brand: "Andar".to_owned(),
            variants: vec![
                variant("ZU-40-NEG", "40", "negro", 10),
                variant("ZU-41-NEG", "41", "negro", 10),
                variant("ZU-42-NEG", "42", "negro", 8),
                variant("ZU-41-BLA", "41", "blanco", 5),
            ],
            active: true,
        },
        ProductInput {
            name: "Bota Trekking".to_owned(),
            description: "Bota de trekking impermeable con suela antideslizante.".to_owned(),
            price: Decimal::new(38990, 2),
            images: vec![],
            category: "botas".to_owned(),
            brand: "Andar".to_owned(),
            variants: vec![
                variant("BT-41-MAR", "41", "marrón", 6),
                variant("BT-42-MAR", "42", "marrón", 6),
                variant("BT-43-MAR", "43", "marrón", 4),
            ],
            active: true,
        },
        ProductInput {
            name: "Sandalia Verano".to_owned(),
            description: "Sandalia ligera para el día a día.".to_owned(),
            price: Decimal::new(8990, 2),
            images: vec![],
            category: "sandalias".to_owned(),
            brand: "Andar".to_owned(),
            variants: vec![
                variant("SV-38-AZU", "38", "azul", 12),
                variant("SV-39-AZU", "39", "azul", 12),
            ],
            active: true,
        },
    ]
}

fn variant(sku: &str, size: &str, color: &str, stock: i32) -> VariantInput {
    VariantInput {
        sku: sku.to_owned(),
        size: size.to_owned(),
        color: color.to_owned(),
        stock,
    }
}
