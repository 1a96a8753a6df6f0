//! Shared types for the café edge node
//!
//! Types used by both the edge server and its observers: catalog models,
//! table orders and events, sales, customers, message bus frames and error
//! codes.

pub mod error;
pub mod message;
pub mod models;
pub mod order;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

// Message bus re-exports (for convenient access)
pub use message::{BusMessage, EventType};
