//! # Submission Debounce
//!
//! Per-operation-kind duplicate-submission guard.
//!
//! A double-tapped "record sale" button must not create two sales. The guard
//! rejects a second same-kind submission inside the window; it is NOT a lock
//! and provides no mutual exclusion between different operation kinds or
//! different processes.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

/// Default debounce window between same-kind submissions.
pub const SUBMIT_DEBOUNCE: Duration = Duration::from_secs(5);

/// The operation kinds the guard distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Sale,
    Return,
    Receiving,
    Expense,
    Product,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OpKind::Sale => "sale",
            OpKind::Return => "return",
            OpKind::Receiving => "receiving",
            OpKind::Expense => "expense",
            OpKind::Product => "product",
        };
        f.write_str(label)
    }
}

/// Tracks the last accepted submission per operation kind.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    last: HashMap<OpKind, Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Debouncer {
            window,
            last: HashMap::new(),
        }
    }

    /// Checks whether a submission of `kind` is allowed now.
    /// Returns the remaining wait on rejection.
    pub fn check(&self, kind: OpKind) -> Result<(), Duration> {
        self.check_at(kind, Instant::now())
    }

    /// Records an accepted submission of `kind`.
    pub fn mark(&mut self, kind: OpKind) {
        self.mark_at(kind, Instant::now());
    }

    fn check_at(&self, kind: OpKind, now: Instant) -> Result<(), Duration> {
        if let Some(last) = self.last.get(&kind) {
            let elapsed = now.saturating_duration_since(*last);
            if elapsed < self.window {
                return Err(self.window - elapsed);
            }
        }
        Ok(())
    }

    fn mark_at(&mut self, kind: OpKind, now: Instant) {
        self.last.insert(kind, now);
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Debouncer::new(SUBMIT_DEBOUNCE)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
