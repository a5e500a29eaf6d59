//! # Engine Error Types
//!
//! What callers of the ledger see.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  ValidationError ─► CoreError ──┐                                       │
//! │                                 ├──► EngineError ──► Caller             │
//! │  StoreError ────────────────────┘                                       │
//! │                                                                         │
//! │  EngineError::Persistence means the in-memory books may have diverged   │
//! │  from the tree: the caller must trigger reload() to resynchronize.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::debounce::OpKind;
use argent_core::{CoreError, EntryId, ValidationError};
use argent_store::StoreError;

/// Errors surfaced by ledger operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Costing or validation failure. Branch state is untouched.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The branch id is not in the directory.
    #[error("Branch not found: {0}")]
    BranchNotFound(String),

    /// No ledger entry with this id in the addressed collection.
    #[error("{kind} entry not found: {id}")]
    EntryNotFound { kind: &'static str, id: EntryId },

    /// The actor may not perform this operation.
    ///
    /// ## When This Occurs
    /// - Non-admin actor not assigned to the branch
    /// - Non-admin attempting a correction, product management,
    ///   branch creation or a salary expense
    #[error("{username} is not authorized to {action}")]
    Unauthorized { username: String, action: String },

    /// Same-kind operation submitted again inside the debounce window.
    /// A duplicate-submission guard, not a lock: nothing was recorded.
    #[error("Duplicate {kind} submission: retry in {remaining_ms} ms")]
    DuplicateSubmission { kind: OpKind, remaining_ms: u64 },

    /// Persisting the mutation failed. In-memory state may be ahead of the
    /// tree; reload() to resynchronize.
    #[error("Persistence failed, reload required: {0}")]
    Persistence(#[from] StoreError),
}

impl EngineError {
    /// Creates an Unauthorized error.
    pub fn unauthorized(username: impl Into<String>, action: impl Into<String>) -> Self {
        EngineError::Unauthorized {
            username: username.into(),
            action: action.into(),
        }
    }

    /// Creates an EntryNotFound error.
    pub fn entry_not_found(kind: &'static str, id: EntryId) -> Self {
        EngineError::EntryNotFound { kind, id }
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Core(CoreError::Validation(err))
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
