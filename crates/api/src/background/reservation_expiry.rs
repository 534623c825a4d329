//! Periodic sweep cancelling reservations that were never picked up.
//!
//! A `scheduled` transaction whose pickup grace has elapsed with no pickup
//! is cancelled atomically: schedules soft-cancelled, book copy released,
//! status flipped. Without this a no-show would hold a copy and a locker
//! forever.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use bibliobox_db::repositories::TransactionRepo;
use bibliobox_db::DbPool;
use bibliobox_events::bus::topics;
use bibliobox_events::{EventBus, LockerCommand, PlatformEvent};

use crate::config::LendingConfig;

/// Run the reservation-expiry loop until `cancel` is triggered.
pub async fn run(
    pool: DbPool,
    event_bus: Arc<EventBus>,
    config: LendingConfig,
    cancel: CancellationToken,
) {
    let policy = config.grace_policy();

    tracing::info!(
        interval_secs = config.sweep_interval_secs,
        pickup_grace_secs = config.pickup_grace_secs,
        "Reservation expiry sweep started"
    );

    let mut interval = tokio::time::interval(Duration::from_secs(config.sweep_interval_secs));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Reservation expiry sweep stopping");
                break;
            }
            _ = interval.tick() => {
                match TransactionRepo::sweep_expired_pickups(&pool, Utc::now(), &policy).await {
                    Ok(expired) => {
                        if expired.is_empty() {
                            tracing::debug!("Reservation expiry sweep: nothing to cancel");
                        } else {
                            tracing::info!(count = expired.len(), "Reservation expiry sweep: cancelled unclaimed reservations");
                            for transaction in expired {
                                event_bus.publish(
                                    PlatformEvent::new(topics::TRANSACTION_EXPIRED)
                                        .with_source("transaction", transaction.id)
                                        .with_payload(serde_json::json!({
                                            "user_id": transaction.user_id,
                                            "book_id": transaction.book_id,
                                        })),
                                );
                                event_bus.publish(
                                    PlatformEvent::new(topics::LOCKER_REVOKED)
                                        .with_source("locker", transaction.locker_id)
                                        .with_payload(
                                            serde_json::to_value(LockerCommand::revoke(
                                                transaction.locker_id,
                                                transaction.user_id,
                                                transaction.id,
                                            ))
                                            .unwrap_or_default(),
                                        ),
                                );
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Reservation expiry sweep failed");
                    }
                }
            }
        }
    }
}
