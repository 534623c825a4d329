//! Background tasks and scheduled jobs.
//!
//! Each submodule provides a long-running async function intended to be
//! spawned via `tokio::spawn`. All tasks accept a [`CancellationToken`]
//! for graceful shutdown.
//!
//! The sweeps replace the legacy client-side polling: correctness no
//! longer depends on a browser being open.

pub mod overdue_sweep;
pub mod reservation_expiry;
