//! Data models
//!
//! Shared between cafe-edge and its clients (via API and message bus).
//! All IDs are `i64` snowflakes except order ids, which are UUID strings.

pub mod category;
pub mod customer;
pub mod product;
pub mod sale;

// Re-exports
pub use category::*;
pub use customer::*;
pub use product::*;
pub use sale::*;
