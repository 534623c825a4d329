//! Borrow-transaction lifecycle rules.
//!
//! This module lives in `core` (zero internal deps) so the repository layer,
//! the HTTP handlers, and the background sweeps all share one definition of
//! the lifecycle: which transitions are legal, how grace windows cut off
//! pickup, and whether a return lands `Finished` or `Late`.

use chrono::Duration;

use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Grace policy
// ---------------------------------------------------------------------------

/// Wall-clock allowances injected from configuration.
///
/// All three values were hard-coded (and mutually inconsistent) call-site
/// literals in the legacy system; they are a single injected policy here.
#[derive(Debug, Clone, Copy)]
pub struct GracePolicy {
    /// How long after `scheduled_pickup_time` a pickup is still accepted.
    pub pickup_grace: Duration,
    /// How long after `scheduled_return_time` a return still counts as on time.
    pub return_grace: Duration,
    /// Length of the locker hold reserved for a pickup or drop-off.
    pub locker_window: Duration,
}

impl GracePolicy {
    /// Latest instant (inclusive) at which a pickup is accepted.
    pub fn pickup_cutoff(&self, scheduled_pickup: Timestamp) -> Timestamp {
        scheduled_pickup + self.pickup_grace
    }

    /// Latest instant (inclusive) at which a return still lands `Finished`.
    pub fn return_cutoff(&self, scheduled_return: Timestamp) -> Timestamp {
        scheduled_return + self.return_grace
    }
}

// ---------------------------------------------------------------------------
// Pickup guard
// ---------------------------------------------------------------------------

/// Why a pickup confirmation was rejected on timing grounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickupTiming {
    /// `now < scheduled_pickup_time` — the pickup window has not opened.
    NotYetOpen,
    /// `now > scheduled_pickup_time + pickup_grace` — the window has closed.
    GraceExpired,
}

/// Check the pickup timing window.
///
/// The window is `[scheduled_pickup_time, scheduled_pickup_time + grace]`,
/// inclusive at both ends: a pickup at exactly the cutoff is accepted, one
/// second later is not.
pub fn check_pickup_timing(
    now: Timestamp,
    scheduled_pickup: Timestamp,
    policy: &GracePolicy,
) -> Result<(), PickupTiming> {
    if now < scheduled_pickup {
        return Err(PickupTiming::NotYetOpen);
    }
    if now > policy.pickup_cutoff(scheduled_pickup) {
        return Err(PickupTiming::GraceExpired);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Return classification
// ---------------------------------------------------------------------------

/// Terminal state a confirmed return lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnClass {
    /// Returned within `scheduled_return_time + return_grace` (inclusive).
    OnTime,
    /// Returned after the grace cutoff.
    Overdue,
}

/// Classify a return instant against the scheduled return time.
pub fn classify_return(
    now: Timestamp,
    scheduled_return: Timestamp,
    policy: &GracePolicy,
) -> ReturnClass {
    if now <= policy.return_cutoff(scheduled_return) {
        ReturnClass::OnTime
    } else {
        ReturnClass::Overdue
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Transaction status IDs matching `transaction_statuses` seed data
/// (1-based SMALLSERIAL).
///
/// The IDs are intentionally duplicated from the `db` crate's
/// `TransactionStatus` enum because `core` must have zero internal deps.
pub mod state_machine {
    /// Returns the set of valid target status IDs reachable from `from_status`.
    ///
    /// Terminal states (Finished=3, Late=4, Canceled=5) return an empty
    /// slice. The one post-terminal mutation — recording the physical
    /// return of an already-`Late` book — keeps the status at `Late` and is
    /// therefore not a transition.
    pub fn valid_transitions(from_status: i16) -> &'static [i16] {
        match from_status {
            // Scheduled -> Waiting (pickup), Canceled
            1 => &[2, 5],
            // Waiting -> Finished (on-time return), Late (overdue)
            2 => &[3, 4],
            // Terminal states: Finished, Late, Canceled
            3 | 4 | 5 => &[],
            // Unknown status: no transitions allowed
            _ => &[],
        }
    }

    /// Check whether a transition from `from` to `to` is valid.
    pub fn can_transition(from: i16, to: i16) -> bool {
        valid_transitions(from).contains(&to)
    }

    /// Human-readable name for a status ID (for error messages).
    pub fn status_name(id: i16) -> &'static str {
        match id {
            1 => "scheduled",
            2 => "waiting",
            3 => "finished",
            4 => "late",
            5 => "canceled",
            _ => "unknown",
        }
    }
}
