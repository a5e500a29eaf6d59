//! # Mutation Events
//!
//! After a mutation commits and persists, the ledger broadcasts what
//! happened so dependent views (reports, product pickers, dashboards) can
//! refresh. Delivery is best-effort: a slow or absent subscriber never blocks
//! or fails an operation.

/// What kind of mutation committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    SaleRecorded,
    SaleEdited,
    SaleDeleted,
    ReturnRecorded,
    ReturnEdited,
    ReturnDeleted,
    ReceivingRecorded,
    ReceivingEdited,
    ReceivingDeleted,
    ExpenseRecorded,
    ExpenseEdited,
    ExpenseDeleted,
    ProductAdded,
    ProductEdited,
    ProductDeleted,
    BranchCreated,
    TreeRestored,
}

/// A committed mutation, tagged with the branch it touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationEvent {
    pub branch_id: String,
    pub kind: MutationKind,
}

impl MutationEvent {
    pub fn new(branch_id: impl Into<String>, kind: MutationKind) -> Self {
        MutationEvent {
            branch_id: branch_id.into(),
            kind,
        }
    }
}
