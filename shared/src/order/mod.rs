//! Table order types
//!
//! - Types: table numbers, order lines and their identity
//! - Snapshots: the full state of one table's order
//! - Events: facts emitted after each committed mutation
//! - View: the observer-side reducer over events and snapshots

pub mod event;
pub mod snapshot;
pub mod types;
pub mod view;

// Re-exports
pub use event::{TableEvent, TableEventKind};
pub use snapshot::TableOrder;
pub use types::*;
pub use view::{ApplyOutcome, MirrorView};
