//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` (or, for statements that must join an enclosing
//! database transaction, any `PgExecutor`) as the first argument.

pub mod book_repo;
pub mod event_repo;
pub mod locker_repo;
pub mod locker_schedule_repo;
pub mod transaction_repo;

pub use book_repo::BookRepo;
pub use event_repo::EventRepo;
pub use locker_repo::LockerRepo;
pub use locker_schedule_repo::LockerScheduleRepo;
pub use transaction_repo::TransactionRepo;
