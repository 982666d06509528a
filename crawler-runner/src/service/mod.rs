//! Service layer
//!
//! Services contain the crawler's business logic. The log store merges
//! fetched lines into per-owner, per-day files without duplicating lines
//! that are already stored.
//!
//! Services are trait-based to enable testing and dependency injection.

pub mod error;
mod log_store;

// Re-export traits
pub use log_store::LogStore;

// Re-export implementations
pub use log_store::{FileLogStore, MergeReport};
