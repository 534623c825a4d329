//! Status helper enums mapping to SMALLSERIAL/SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding `*_statuses` database table.

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Borrow-transaction lifecycle status.
    TransactionStatus {
        /// Borrow created, awaiting pickup.
        Scheduled = 1,
        /// Picked up; the book is out, awaiting return.
        Waiting = 2,
        /// Returned within the grace window.
        Finished = 3,
        /// Overdue — swept past the return grace, or returned after it.
        Late = 4,
        /// Cancelled before pickup.
        Canceled = 5,
    }
}

define_status_enum! {
    /// Locker-schedule status.
    ScheduleStatus {
        /// Live claim on the locker.
        Scheduled = 1,
        /// Soft-cancelled; the row is retained for audit.
        Cancelled = 2,
    }
}
