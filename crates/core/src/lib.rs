//! Core types and traits for wishid
//!
//! This crate defines the foundational types used throughout the system:
//! - EntityType: Tag partitioning the counter namespace (wish, focus area, ...)
//! - Id / CounterRow: Issued identifiers and their persisted counters
//! - Error: Error taxonomy shared by stores and allocators
//! - Traits: The outbound store contract (CounterStore, CounterTransaction)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::{CounterStore, CounterTransaction};
pub use types::{CounterRow, EntityType, Id, UpsertBranch};
