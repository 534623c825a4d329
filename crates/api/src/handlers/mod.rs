//! Request handlers, one module per resource.

pub mod books;
pub mod events;
pub mod lockers;
pub mod schedules;
pub mod transactions;
