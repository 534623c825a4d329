//! External delivery channels.
//!
//! Currently one: the locker hardware bridge. Delivery is always
//! best-effort — a failed delivery is logged and dropped, never propagated
//! back to the flow that published the event.

pub mod locker_bridge;
