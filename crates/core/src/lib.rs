//! Domain core for the bibliobox lending platform.
//!
//! Pure types and logic shared by the repository and API layers:
//! the error taxonomy, half-open time windows, and the borrow-transaction
//! lifecycle rules (grace windows, guards, valid transitions). No I/O.

pub mod error;
pub mod interval;
pub mod lending;
pub mod types;
