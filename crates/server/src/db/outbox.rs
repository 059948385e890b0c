//! Notification outbox repository.
//!
//! One row per confirmation email. The row is written in the same
//! transaction as its order, so an order either exists together with its
//! intent-to-notify or not at all; delivery happens later, off the request
//! path.

use andar_core::{OrderId, OutboxId};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use super::RepositoryError;

/// Delivery state of one outbox entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboxStatus {
    Pending,
    Sent,
    Failed,
}

impl OutboxStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }
}

/// A pending (or settled) notification.
#[derive(Debug, sqlx::FromRow)]
pub struct OutboxEntry {
    pub id: i32,
    pub order_id: i32,
    pub recipient: String,
    pub status: String,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl OutboxEntry {
    #[must_use]
    pub const fn outbox_id(&self) -> OutboxId {
        OutboxId::new(self.id)
    }

    #[must_use]
    pub const fn order(&self) -> OrderId {
        OrderId::new(self.order_id)
    }
}

/// Enqueue a confirmation email inside the order's transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn enqueue(
    tx: &mut Transaction<'_, Postgres>,
    order_id: OrderId,
    recipient: &str,
) -> Result<(), RepositoryError> {
    sqlx::query("INSERT INTO notification_outbox (order_id, recipient) VALUES ($1, $2)")
        .bind(order_id.as_i32())
        .bind(recipient)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Claim a batch of pending entries for delivery.
///
/// `FOR UPDATE SKIP LOCKED` keeps multiple workers from claiming the same
/// entry; attempts are bumped at claim time so a crashed delivery still
/// counts against the retry budget.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn claim_pending(
    pool: &PgPool,
    max_attempts: i32,
    limit: i64,
) -> Result<Vec<OutboxEntry>, RepositoryError> {
    let entries: Vec<OutboxEntry> = sqlx::query_as(
        "WITH claimed AS (
             SELECT id FROM notification_outbox
             WHERE status = 'pending' AND attempts < $1
             ORDER BY created_at
             LIMIT $2
             FOR UPDATE SKIP LOCKED
         )
         UPDATE notification_outbox o
         SET attempts = o.attempts + 1
         FROM claimed
         WHERE o.id = claimed.id
         RETURNING o.id, o.order_id, o.recipient, o.status, o.attempts,
                   o.last_error, o.created_at, o.sent_at",
    )
    .bind(max_attempts)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(entries)
}

/// Mark an entry delivered.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn mark_sent(pool: &PgPool, id: OutboxId) -> Result<(), RepositoryError> {
    sqlx::query(
        "UPDATE notification_outbox SET status = 'sent', sent_at = now(), last_error = NULL
         WHERE id = $1",
    )
    .bind(id.as_i32())
    .execute(pool)
    .await?;
    Ok(())
}

/// Record a delivery failure. The entry stays `pending` until the retry
/// budget runs out, then flips to `failed`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn mark_failed(
    pool: &PgPool,
    id: OutboxId,
    error: &str,
    max_attempts: i32,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "UPDATE notification_outbox
         SET last_error = $2,
             status = CASE WHEN attempts >= $3 THEN 'failed' ELSE 'pending' END
         WHERE id = $1",
    )
    .bind(id.as_i32())
    .bind(error)
    .bind(max_attempts)
    .execute(pool)
    .await?;
    Ok(())
}
