//! Domain models and API payloads.

pub mod address;
pub mod order;
pub mod product;
pub mod user;

pub use address::Address;
pub use order::{Order, OrderLine};
pub use product::{Product, Variant};
pub use user::{PublicUser, User};
