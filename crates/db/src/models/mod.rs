//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize` DTOs for the operations that create or mutate it

pub mod book;
pub mod event;
pub mod locker;
pub mod locker_schedule;
pub mod status;
pub mod transaction;
