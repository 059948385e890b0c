//! Notification outbox worker.
//!
//! Drains `notification_outbox` in the background: claims pending entries,
//! renders and sends the confirmation email with a bounded timeout, and
//! records the outcome. Orders are durable long before this runs; a relay
//! outage only delays mail, it never fails or rolls back an order.

use std::time::Duration;

use sqlx::PgPool;
use tracing::{debug, error, warn};

use crate::db::orders::OrderRepository;
use crate::db::outbox;
use crate::services::mailer::Mailer;

/// How often the worker polls for pending notifications.
const POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Upper bound on a single SMTP send.
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivery attempts before an entry is marked `failed` for good.
const MAX_ATTEMPTS: i32 = 5;

/// Entries claimed per poll.
const BATCH_SIZE: i64 = 10;

/// Background worker that delivers queued order confirmations.
pub struct OutboxWorker {
    pool: PgPool,
    mailer: Mailer,
}

impl OutboxWorker {
    /// Create a new worker.
    #[must_use]
    pub const fn new(pool: PgPool, mailer: Mailer) -> Self {
        Self { pool, mailer }
    }

    /// Spawn the worker loop on the runtime. It runs until the process exits.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(POLL_INTERVAL);
            loop {
                ticker.tick().await;
                self.drain_once().await;
            }
        })
    }

    /// Claim and deliver one batch. Each entry settles independently; one
    /// bad address does not block the rest of the batch.
    pub async fn drain_once(&self) {
        let entries = match outbox::claim_pending(&self.pool, MAX_ATTEMPTS, BATCH_SIZE).await {
            Ok(entries) => entries,
            Err(e) => {
                error!(error = %e, "outbox poll failed");
                return;
            }
        };

        if entries.is_empty() {
            return;
        }
        debug!(count = entries.len(), "delivering queued confirmations");

        for entry in entries {
            let outcome = self.deliver(&entry).await;
            let result = match outcome {
                Ok(()) => outbox::mark_sent(&self.pool, entry.outbox_id()).await,
                Err(reason) => {
                    warn!(
                        outbox_id = %entry.outbox_id(),
                        order_id = %entry.order(),
                        attempts = entry.attempts,
                        reason,
                        "confirmation delivery failed"
                    );
                    outbox::mark_failed(&self.pool, entry.outbox_id(), &reason, MAX_ATTEMPTS).await
                }
            };
            if let Err(e) = result {
                error!(outbox_id = %entry.outbox_id(), error = %e, "outbox bookkeeping failed");
            }
        }
    }

    async fn deliver(&self, entry: &outbox::OutboxEntry) -> Result<(), String> {
        let order = OrderRepository::new(&self.pool)
            .get(entry.order())
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("order {} no longer exists", entry.order()))?;

        match tokio::time::timeout(SEND_TIMEOUT, self.mailer.send_order_confirmation(&order)).await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!("send timed out after {SEND_TIMEOUT:?}")),
        }
    }
}
