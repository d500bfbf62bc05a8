//! Core types for id allocation
//!
//! This module defines the foundational types shared by every store and
//! allocator:
//! - EntityType: Tag partitioning the counter namespace
//! - Id: Issued identifier
//! - CounterRow: The persisted `(type, value)` pair
//! - UpsertBranch: Which branch an insert-or-update statement took

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier handed out by an allocator
///
/// Always `>= 1` when returned from a successful allocation.
pub type Id = u64;

/// Tag partitioning the counter namespace
///
/// Each entity type owns an independent id sequence. The store accepts any
/// `u16`; values it has never seen simply start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityType(u16);

impl EntityType {
    /// Wish pages
    pub const WISH: EntityType = EntityType(0);

    /// Focus area pages
    pub const FOCUS_AREA: EntityType = EntityType(1);

    /// All entity types known to this crate
    pub const KNOWN: [EntityType; 2] = [EntityType::WISH, EntityType::FOCUS_AREA];

    /// Create an entity type from its raw tag
    pub const fn new(raw: u16) -> Self {
        EntityType(raw)
    }

    /// Raw tag as stored in the counter table
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Whether this is one of [`EntityType::KNOWN`]
    pub fn is_known(self) -> bool {
        Self::KNOWN.contains(&self)
    }

    /// Human-readable name
    ///
    /// Unknown tags render as `type-<n>`.
    pub fn name(self) -> String {
        match self {
            EntityType::WISH => "wish".to_string(),
            EntityType::FOCUS_AREA => "focus-area".to_string(),
            EntityType(raw) => format!("type-{}", raw),
        }
    }

    /// Parse a known entity type name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "wish" => Some(EntityType::WISH),
            "focus-area" | "focus_area" => Some(EntityType::FOCUS_AREA),
            _ => None,
        }
    }
}

impl From<u16> for EntityType {
    fn from(raw: u16) -> Self {
        EntityType(raw)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// One persisted counter
///
/// `value` is the last id issued for `entity_type`. At most one row exists
/// per entity type and its value never decreases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterRow {
    /// Counter partition
    pub entity_type: EntityType,
    /// Last issued id
    pub value: Id,
}

impl CounterRow {
    /// Create a row
    pub fn new(entity_type: EntityType, value: Id) -> Self {
        CounterRow { entity_type, value }
    }
}

/// Branch taken by an insert-or-update-on-conflict statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertBranch {
    /// No row existed; a row with value 1 was inserted
    Inserted,
    /// A row existed; its value was incremented
    Updated,
}
