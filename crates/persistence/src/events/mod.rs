//! Audit event log
//!
//! Append-only JSONL files, one per day, read back for history views.

pub mod replay;
pub mod store;

pub use replay::{EventFilter, EventReader};
pub use store::EventStore;
