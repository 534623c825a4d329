//! Periodic sweep flagging unreturned transactions as late.
//!
//! A `waiting` transaction whose return grace has fully elapsed with no
//! recorded return is flipped to `late` in one set-based update. Runs on a
//! fixed interval using `tokio::time::interval`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use bibliobox_db::repositories::TransactionRepo;
use bibliobox_db::DbPool;
use bibliobox_events::bus::topics;
use bibliobox_events::{EventBus, PlatformEvent};

use crate::config::LendingConfig;

/// Run the overdue sweep loop until `cancel` is triggered.
pub async fn run(
    pool: DbPool,
    event_bus: Arc<EventBus>,
    config: LendingConfig,
    cancel: CancellationToken,
) {
    let policy = config.grace_policy();

    tracing::info!(
        interval_secs = config.sweep_interval_secs,
        return_grace_secs = config.return_grace_secs,
        "Overdue sweep started"
    );

    let mut interval = tokio::time::interval(Duration::from_secs(config.sweep_interval_secs));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Overdue sweep stopping");
                break;
            }
            _ = interval.tick() => {
                match TransactionRepo::sweep_overdue(&pool, Utc::now(), &policy).await {
                    Ok(flagged) => {
                        if flagged.is_empty() {
                            tracing::debug!("Overdue sweep: nothing to flag");
                        } else {
                            tracing::info!(count = flagged.len(), "Overdue sweep: flagged late transactions");
                            for transaction in flagged {
                                event_bus.publish(
                                    PlatformEvent::new(topics::TRANSACTION_OVERDUE)
                                        .with_source("transaction", transaction.id)
                                        .with_payload(serde_json::json!({
                                            "user_id": transaction.user_id,
                                            "book_id": transaction.book_id,
                                        })),
                                );
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Overdue sweep failed");
                    }
                }
            }
        }
    }
}
