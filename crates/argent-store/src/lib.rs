//! # argent-store: Persistence Gateway for Argent Ledger
//!
//! This crate owns the path-addressed JSON tree that holds all branch data.
//! The tree layout mirrors the legacy store so existing data loads unchanged.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Argent Ledger Data Flow                            │
//! │                                                                         │
//! │  Engine operation (record_sale)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   argent-store (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │ Gateway trait │    │   JsonStore   │    │    Paths     │  │   │
//! │  │   │ (gateway.rs)  │    │  (gateway.rs) │    │  (path.rs)   │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ read / write  │◄───│ Mutex<Value>  │    │ branchData/* │  │   │
//! │  │   │ write_at_root │    │ atomic flush  │    │ branchMeta.. │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 ledger.json  (one file, one tree)               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`gateway`] - The gateway trait and the JSON file store
//! - [`path`] - Tree path helpers
//! - [`error`] - Store error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use argent_store::{JsonStore, PersistenceGateway, StoreConfig};
//!
//! let store = JsonStore::open(StoreConfig::new("./data/ledger.json")).await?;
//! let branch = store.read("branchData/b1").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod gateway;
pub mod path;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{StoreError, StoreResult};
pub use gateway::{JsonStore, PersistenceGateway, StoreConfig};
