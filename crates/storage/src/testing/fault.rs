//! Fault injection for counter stores
//!
//! Faults are armed per [`FailPoint`] and fire once each, in the order they
//! were armed. A fired fault surfaces as an ordinary store error, so tests can
//! check that allocations abort cleanly and leave the counter table untouched.
//!
//! # Example
//!
//! ```ignore
//! use wishid_storage::testing::{FailPoint, FaultKind};
//!
//! store.faults().fail_next(FailPoint::Commit);
//! assert!(allocator.new_id(EntityType::WISH).is_err());
//! assert_eq!(store.committed_value(EntityType::WISH), None);
//! ```

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use wishid_core::{Error, Result};

/// Point in a transaction where a fault can be injected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    /// Starting a transaction
    Begin,
    /// After a row lock is taken, before the locked read returns
    LockedRead,
    /// Any row write (insert, update, upsert)
    Write,
    /// Commit, before writes become visible
    Commit,
}

impl fmt::Display for FailPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailPoint::Begin => "begin",
            FailPoint::LockedRead => "locked-read",
            FailPoint::Write => "write",
            FailPoint::Commit => "commit",
        };
        f.write_str(name)
    }
}

/// Kind of error an armed fault produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Non-retryable `InjectedFault`
    Fatal,
    /// Retryable `Busy`, as if the backend were contended
    Busy,
}

/// One-shot fault registry
#[derive(Debug, Default)]
pub struct FaultInjector {
    armed: Mutex<HashMap<FailPoint, VecDeque<FaultKind>>>,
    triggered: AtomicU64,
}

impl FaultInjector {
    /// Create an injector with nothing armed
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next operation reaching `point` with a fatal fault
    pub fn fail_next(&self, point: FailPoint) {
        self.arm(point, FaultKind::Fatal, 1);
    }

    /// Fail the next `times` operations reaching `point`
    pub fn arm(&self, point: FailPoint, kind: FaultKind, times: usize) {
        let mut armed = self.armed.lock();
        let queue = armed.entry(point).or_default();
        queue.extend(std::iter::repeat(kind).take(times));
    }

    /// Disarm every pending fault
    pub fn clear(&self) {
        self.armed.lock().clear();
    }

    /// Number of faults fired so far
    pub fn triggered(&self) -> u64 {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Number of faults still armed at `point`
    pub fn pending(&self, point: FailPoint) -> usize {
        self.armed.lock().get(&point).map_or(0, VecDeque::len)
    }

    /// Fire the next fault armed at `point`, if any
    pub fn check(&self, point: FailPoint) -> Result<()> {
        let kind = {
            let mut armed = self.armed.lock();
            match armed.get_mut(&point).and_then(VecDeque::pop_front) {
                Some(kind) => kind,
                None => return Ok(()),
            }
        };

        self.triggered.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(point = %point, ?kind, "fault injected");

        Err(match kind {
            FaultKind::Fatal => Error::InjectedFault(point.to_string()),
            FaultKind::Busy => Error::Busy(format!("injected at {}", point)),
        })
    }
}
