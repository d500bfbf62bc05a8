//! Testing utilities for counter stores
//!
//! - **Fault injection**: one-shot failures at well-defined transaction points,
//!   used to check that failed allocations leave no trace in the counter table

mod fault;

pub use fault::{FailPoint, FaultInjector, FaultKind};
