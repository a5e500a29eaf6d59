//! # Tree Paths
//!
//! Slash-separated paths into the persisted JSON tree. The layout mirrors
//! the legacy store so existing trees load unchanged:
//!
//! ```text
//! branchMetadata/{branchId}   → { name, users }
//! branchData/{branchId}       → { products, sales, returns, receiving,
//!                                 expenses, revision, lastUpdated }
//! ```

/// Root of per-branch ledger data.
pub const BRANCH_DATA: &str = "branchData";

/// Root of branch metadata (names and assigned users).
pub const BRANCH_METADATA: &str = "branchMetadata";

/// Path to one branch's ledger collections.
pub fn branch_data(branch_id: &str) -> String {
    format!("{BRANCH_DATA}/{branch_id}")
}

/// Path to one branch's metadata.
pub fn branch_metadata(branch_id: &str) -> String {
    format!("{BRANCH_METADATA}/{branch_id}")
}

/// Splits a path into non-empty segments. `""` addresses the root.
pub fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}
