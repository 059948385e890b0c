//! Business logic layered on top of the repositories.

pub mod auth;
pub mod checkout;
pub mod mailer;
pub mod outbox;
