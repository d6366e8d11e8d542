//! Audit trail: every lifecycle mutation is recorded as an event.
//!
//! Events are emitted through an [`AuditHandle`] and persisted by an
//! [`AuditWriter`] running as a background task, so request handlers never
//! wait on the audit table.

mod events;
mod handle;
mod sqlite;
mod store;
mod writer;

pub use events::*;
pub use handle::*;
pub use sqlite::*;
pub use store::*;
pub use writer::*;
