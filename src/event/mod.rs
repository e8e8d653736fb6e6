//! Event Module - audit trail
//!
//! - `log`: `EventLog`, `Event`, `EventKind`

mod log;

pub use log::{Event, EventKind, EventLog};
