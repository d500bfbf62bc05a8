//! Id Allocator Integration Tests
//!
//! Tests for both allocation strategies against the in-memory and SQLite
//! counter stores: sequencing, concurrency, failure atomicity and
//! configuration-driven construction.

#[path = "../common/mod.rs"]
mod common;

mod concurrent;
mod properties;
mod sequential;
mod upsert_reporting;
