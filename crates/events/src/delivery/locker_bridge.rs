//! Best-effort delivery of locker access commands to the hardware bridge.
//!
//! The ESP32 fleet sits behind a small HTTP bridge; whenever a locker is
//! assigned or revoked, [`LockerBridge`] POSTs a [`LockerCommand`] to
//! `{base_url}/lockers/{locker_id}/commands`. Failed attempts are retried
//! up to three times with exponential backoff (1 s, 2 s, 4 s) and then
//! dropped with an error log — device signalling never fails the owning
//! transaction.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use bibliobox_core::types::{DbId, Timestamp};

use crate::bus::{topics, PlatformEvent};

/// Retry delays in seconds (exponential backoff: 1s, 2s, 4s).
const RETRY_DELAYS_SECS: [u64; 3] = [1, 2, 4];

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Bridge endpoint configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Base URL of the hardware bridge, e.g. `http://bridge.local:8080`.
    pub base_url: String,
}

impl BridgeConfig {
    /// Load from the `LOCKER_BRIDGE_URL` env var.
    ///
    /// Returns `None` when unset or empty — the bridge is optional and the
    /// caller simply does not spawn the delivery task.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("LOCKER_BRIDGE_URL").ok()?;
        let base_url = base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return None;
        }
        Some(Self { base_url })
    }
}

// ---------------------------------------------------------------------------
// Command payload
// ---------------------------------------------------------------------------

/// Access command understood by the locker firmware.
///
/// Serialized both into the bridge request body and into the payload of the
/// `locker.assigned` / `locker.revoked` platform events, so the bridge task
/// can reconstruct the command from any event it receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockerCommand {
    /// `"assign"` or `"revoke"`.
    pub action: String,
    pub locker_id: DbId,
    pub user_id: DbId,
    pub transaction_id: DbId,
    /// Present on assignment only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<Timestamp>,
    /// Present on assignment only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<Timestamp>,
}

impl LockerCommand {
    /// Grant a user access to a locker for a time window.
    pub fn assign(
        locker_id: DbId,
        user_id: DbId,
        transaction_id: DbId,
        start_time: Timestamp,
        end_time: Timestamp,
    ) -> Self {
        Self {
            action: "assign".into(),
            locker_id,
            user_id,
            transaction_id,
            start_time: Some(start_time),
            end_time: Some(end_time),
        }
    }

    /// Revoke a user's access to a locker.
    pub fn revoke(locker_id: DbId, user_id: DbId, transaction_id: DbId) -> Self {
        Self {
            action: "revoke".into(),
            locker_id,
            user_id,
            transaction_id,
            start_time: None,
            end_time: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for bridge delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The bridge returned a non-2xx status code.
    #[error("Bridge returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// LockerBridge
// ---------------------------------------------------------------------------

/// Delivers locker access commands to the hardware bridge.
pub struct LockerBridge {
    client: reqwest::Client,
    base_url: String,
}

impl LockerBridge {
    /// Create a new bridge delivery service with a pre-configured HTTP client.
    pub fn new(config: BridgeConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self {
            client,
            base_url: config.base_url,
        }
    }

    /// Run the delivery loop.
    ///
    /// Subscribes to the event bus via `receiver`, filters for the locker
    /// topics, and delivers each command. The loop exits when the channel
    /// is closed (i.e. the [`EventBus`](crate::bus::EventBus) is dropped).
    pub async fn run(self, mut receiver: broadcast::Receiver<PlatformEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.handle_event(&event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Locker bridge lagged, commands were dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, locker bridge shutting down");
                    break;
                }
            }
        }
    }

    /// Deliver the command carried by a locker event; ignore everything else.
    async fn handle_event(&self, event: &PlatformEvent) {
        if event.event_type != topics::LOCKER_ASSIGNED
            && event.event_type != topics::LOCKER_REVOKED
        {
            return;
        }

        let command: LockerCommand = match serde_json::from_value(event.payload.clone()) {
            Ok(command) => command,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    event_type = %event.event_type,
                    "Locker event payload is not a valid command"
                );
                return;
            }
        };

        match self.deliver(&command).await {
            Ok(()) => {
                tracing::info!(
                    locker_id = command.locker_id,
                    user_id = command.user_id,
                    transaction_id = command.transaction_id,
                    action = %command.action,
                    "Locker command delivered"
                );
            }
            Err(e) => {
                // Best-effort by contract: log and move on.
                tracing::error!(
                    error = %e,
                    locker_id = command.locker_id,
                    action = %command.action,
                    "Locker command delivery failed after retries"
                );
            }
        }
    }

    /// Deliver a command to the bridge with retry.
    ///
    /// Retries up to 3 times with exponential backoff before giving up.
    /// Returns `Ok(())` on the first successful attempt.
    pub async fn deliver(&self, command: &LockerCommand) -> Result<(), BridgeError> {
        let url = format!("{}/lockers/{}/commands", self.base_url, command.locker_id);

        let mut last_err: Option<BridgeError> = None;

        for (attempt, delay_secs) in RETRY_DELAYS_SECS.iter().enumerate() {
            match self.attempt(&url, command).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        url = %url,
                        error = %e,
                        "Locker command delivery attempt failed, retrying"
                    );
                    last_err = Some(e);
                    tokio::time::sleep(Duration::from_secs(*delay_secs)).await;
                }
            }
        }

        // Final attempt after the last backoff.
        match self.attempt(&url, command).await {
            Ok(()) => Ok(()),
            Err(e) => Err(last_err.unwrap_or(e)),
        }
    }

    /// One delivery attempt.
    async fn attempt(&self, url: &str, command: &LockerCommand) -> Result<(), BridgeError> {
        let response = self.client.post(url).json(command).send().await?;
        if !response.status().is_success() {
            return Err(BridgeError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn window_start() -> Timestamp {
        Utc.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap()
    }

    #[test]
    fn assign_command_carries_the_window() {
        let end = window_start() + chrono::Duration::hours(2);
        let command = LockerCommand::assign(3, 7, 42, window_start(), end);

        let json = serde_json::to_value(&command).unwrap();
        assert_eq!(json["action"], "assign");
        assert_eq!(json["locker_id"], 3);
        assert_eq!(json["user_id"], 7);
        assert_eq!(json["transaction_id"], 42);
        assert!(json.get("start_time").is_some());
        assert!(json.get("end_time").is_some());
    }

    #[test]
    fn revoke_command_omits_the_window() {
        let command = LockerCommand::revoke(3, 7, 42);

        let json = serde_json::to_value(&command).unwrap();
        assert_eq!(json["action"], "revoke");
        assert!(json.get("start_time").is_none());
        assert!(json.get("end_time").is_none());
    }

    #[test]
    fn command_round_trips_through_event_payload() {
        let end = window_start() + chrono::Duration::hours(2);
        let command = LockerCommand::assign(5, 9, 77, window_start(), end);

        let payload = serde_json::to_value(&command).unwrap();
        let parsed: LockerCommand = serde_json::from_value(payload).unwrap();
        assert_eq!(parsed, command);
    }

    #[test]
    fn bridge_config_trims_trailing_slash() {
        // SAFETY: test-only env mutation, no concurrent readers.
        std::env::set_var("LOCKER_BRIDGE_URL", "http://bridge.local:8080/");
        let config = BridgeConfig::from_env().expect("config should load");
        assert_eq!(config.base_url, "http://bridge.local:8080");
        std::env::remove_var("LOCKER_BRIDGE_URL");
    }
}
