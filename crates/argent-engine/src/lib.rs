//! # Argent Engine
//!
//! The operation layer of the Argent inventory ledger: one [`Ledger`] context
//! per process, generic over the persistence gateway.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          argent-engine                                  │
//! │                                                                         │
//! │   Caller (UI, CLI, tests)                                               │
//! │        │ Actor + branch id + draft                                      │
//! │        ▼                                                                │
//! │   Ledger<G> ── debounce ── validate ── authorize                        │
//! │        │                                                                │
//! │        ├── BranchDirectory    (who may touch which branch)              │
//! │        ├── BranchBook         (per-branch collections, revision)        │
//! │        ├── argent-core        (costing arithmetic, on value copies)     │
//! │        └── G: PersistenceGateway (one merge write per mutation)         │
//! │        │                                                                │
//! │        └── broadcast::Sender<MutationEvent>  (view refresh)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust,ignore
//! use argent_engine::{Actor, Ledger, LedgerConfig, SaleDraft};
//! use argent_store::{JsonStore, StoreConfig};
//!
//! let store = JsonStore::open(StoreConfig::new("tree.json")).await?;
//! let mut ledger = Ledger::load(store, LedgerConfig::new()).await?;
//!
//! let sara = Actor::user("sara");
//! let sale = ledger.record_sale(&sara, branch_id, draft).await?;
//! ```

pub mod book;
pub mod debounce;
pub mod directory;
pub mod error;
pub mod events;
pub mod ledger;
pub mod report;

pub use book::BranchBook;
pub use debounce::{Debouncer, OpKind, SUBMIT_DEBOUNCE};
pub use directory::{Actor, BranchDirectory, BranchInfo, Role};
pub use error::{EngineError, EngineResult};
pub use events::{MutationEvent, MutationKind};
pub use ledger::{
    ExpenseDraft, ExpenseUpdate, Ledger, LedgerConfig, ProductDraft, ProductUpdate,
    ReceivingDraft, ReceivingUpdate, ReturnDraft, ReturnUpdate, SaleDraft, SaleUpdate,
};
pub use report::{MovementReport, MovementRow};
