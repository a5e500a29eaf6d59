//! # The Ledger
//!
//! The operation processor: one context object owning all branch state,
//! orchestrating every mutation through the same protocol.
//!
//! ## Operation Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Every Mutating Operation                             │
//! │                                                                         │
//! │  1. Debounce check (per operation kind, duplicate-submission guard)    │
//! │  2. Validate input                                                      │
//! │  3. Authorize (admin, or assigned to the branch; corrections,          │
//! │     product management, branches and salaries are admin-only)          │
//! │     On acceptance the debounce window is armed, so a rapid retry       │
//! │     is rejected even if a later step fails.                            │
//! │  4. Look up branch and product                                          │
//! │  5. Run costing on value copies                                         │
//! │  6. Commit copies + splice the ledger entry                             │
//! │  7. Persist the touched collections in one merge write                  │
//! │     (revision bumped; the store rejects stale writers)                  │
//! │  8. Emit a mutation event                                               │
//! │                                                                         │
//! │  Steps 1-5 cannot dirty book state: a validation, authorization or     │
//! │  costing failure leaves books untouched. A step-7 failure leaves       │
//! │  memory ahead of the tree; the caller must reload().                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Corrections
//! Edits and deletes address entries by surrogate id, reverse the original
//! stock effect at the configured [`CostingPolicy`], then apply the new one.
//! Because the arithmetic runs on copies, an infeasible edit (new sale
//! quantity exceeding post-reversal stock) surfaces `InsufficientStock`
//! without touching anything.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use argent_core::{
    costing, validation, CoreError, CostingPolicy, EntryId, ExpenseEntry, ExpenseKind,
    PaymentMethod, ProductStock, ReceivingEntry, ReturnEntry, SaleEntry, SaleRecordType,
    ValidationError,
};
use argent_store::{path as tree_path, PersistenceGateway, StoreError};

use crate::book::BranchBook;
use crate::debounce::{Debouncer, OpKind, SUBMIT_DEBOUNCE};
use crate::directory::{Actor, BranchDirectory, BranchInfo};
use crate::error::{EngineError, EngineResult};
use crate::events::{MutationEvent, MutationKind};
use crate::report::{product_movement, MovementReport};

// =============================================================================
// Configuration
// =============================================================================

/// Ledger configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = LedgerConfig::new()
///     .policy(CostingPolicy::ExactSnapshot)
///     .debounce_window(Duration::from_secs(5));
/// let ledger = Ledger::load(store, config).await?;
/// ```
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Reversal policy for sale corrections.
    pub policy: CostingPolicy,

    /// Debounce window between same-kind submissions.
    /// `Duration::ZERO` disables the guard (tests).
    pub debounce_window: Duration,
}

impl LedgerConfig {
    pub fn new() -> Self {
        LedgerConfig {
            policy: CostingPolicy::default(),
            debounce_window: SUBMIT_DEBOUNCE,
        }
    }

    /// Sets the sale reversal policy.
    pub fn policy(mut self, policy: CostingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the debounce window.
    pub fn debounce_window(mut self, window: Duration) -> Self {
        self.debounce_window = window;
        self
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig::new()
    }
}

// =============================================================================
// Operation Inputs
// =============================================================================

/// Input for recording a sale.
#[derive(Debug, Clone)]
pub struct SaleDraft {
    pub product: String,
    /// Grams sold.
    pub quantity: f64,
    /// Total sale price, not per gram.
    pub total_price: f64,
    /// Business date chosen by the operator; the entry timestamp combines it
    /// with the current time of day.
    pub sale_date: NaiveDate,
    pub customer_phone: String,
    pub customer_details: String,
    pub details: String,
    pub payment_method: PaymentMethod,
}

/// Editable fields of a sale.
#[derive(Debug, Clone)]
pub struct SaleUpdate {
    pub quantity: f64,
    pub total_price: f64,
}

/// Input for recording a customer return.
#[derive(Debug, Clone)]
pub struct ReturnDraft {
    pub product: String,
    pub quantity: f64,
    pub refund_amount: f64,
    pub reason: String,
}

/// Editable fields of a return.
#[derive(Debug, Clone)]
pub struct ReturnUpdate {
    pub quantity: f64,
    pub refund_amount: f64,
}

/// Input for recording a stock receipt.
#[derive(Debug, Clone)]
pub struct ReceivingDraft {
    pub product: String,
    pub quantity: f64,
    /// Cost per gram for this batch.
    pub unit_cost: f64,
    pub supplier: String,
}

/// Editable fields of a receipt.
#[derive(Debug, Clone)]
pub struct ReceivingUpdate {
    pub quantity: f64,
    pub unit_cost: f64,
    pub supplier: String,
}

/// Input for recording an expense.
#[derive(Debug, Clone)]
pub struct ExpenseDraft {
    /// Total currency spent. For scrap purchases, also the cost basis added.
    pub amount: f64,
    pub description: String,
    pub kind: ExpenseKind,
}

/// Editable fields of an expense. The kind is fixed at recording time.
#[derive(Debug, Clone)]
pub struct ExpenseUpdate {
    pub amount: f64,
    pub description: String,
}

/// Input for creating a product directly (admin stock intake).
#[derive(Debug, Clone)]
pub struct ProductDraft {
    pub name: String,
    pub quantity: f64,
    /// Total cost basis for the initial quantity. May be zero.
    pub total_cost: f64,
}

/// Manual product correction: every field is overwritten as given.
#[derive(Debug, Clone)]
pub struct ProductUpdate {
    pub name: String,
    pub quantity: f64,
    pub cost_basis_total: f64,
}

/// Which collections a mutation touched (and must persist).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Part {
    Products,
    Sales,
    Returns,
    Receiving,
    Expenses,
}

// =============================================================================
// Ledger
// =============================================================================

/// The multi-branch ledger.
///
/// Owns the branch directory, the in-memory books and the persistence
/// gateway. All state flows through here; there are no globals.
#[derive(Debug)]
pub struct Ledger<G> {
    gateway: G,
    directory: BranchDirectory,
    books: HashMap<String, BranchBook>,
    policy: CostingPolicy,
    debounce: Debouncer,
    events: broadcast::Sender<MutationEvent>,
}

impl<G: PersistenceGateway> Ledger<G> {
    /// Loads all branch state from the gateway.
    pub async fn load(gateway: G, config: LedgerConfig) -> EngineResult<Self> {
        let (events, _) = broadcast::channel(64);
        let mut ledger = Ledger {
            gateway,
            directory: BranchDirectory::default(),
            books: HashMap::new(),
            policy: config.policy,
            debounce: Debouncer::new(config.debounce_window),
            events,
        };
        ledger.reload().await?;
        Ok(ledger)
    }

    /// Re-reads the whole tree, replacing directory and books.
    ///
    /// ## When To Call
    /// - After any operation failed with [`EngineError::Persistence`]
    /// - When another writer is known to have committed
    pub async fn reload(&mut self) -> EngineResult<()> {
        let metadata = self
            .gateway
            .read(tree_path::BRANCH_METADATA)
            .await?
            .unwrap_or_else(|| Value::Object(Map::new()));
        let directory = BranchDirectory::from_tree(metadata).map_err(StoreError::from)?;

        let data = self
            .gateway
            .read(tree_path::BRANCH_DATA)
            .await?
            .unwrap_or_else(|| Value::Object(Map::new()));
        let books: HashMap<String, BranchBook> =
            serde_json::from_value(data).map_err(StoreError::from)?;

        self.directory = directory;
        self.books = books;
        info!(branches = self.books.len(), "Ledger state loaded");
        Ok(())
    }

    // =========================================================================
    // Read Access
    // =========================================================================

    /// The branch directory.
    pub fn directory(&self) -> &BranchDirectory {
        &self.directory
    }

    /// The persistence gateway (for export flows and tests).
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// The configured reversal policy.
    pub fn policy(&self) -> CostingPolicy {
        self.policy
    }

    /// Subscribes to mutation events.
    pub fn subscribe(&self) -> broadcast::Receiver<MutationEvent> {
        self.events.subscribe()
    }

    pub fn products(&self, branch_id: &str) -> EngineResult<&[ProductStock]> {
        Ok(&self.book(branch_id)?.products)
    }

    pub fn sales(&self, branch_id: &str) -> EngineResult<&[SaleEntry]> {
        Ok(&self.book(branch_id)?.sales)
    }

    pub fn returns(&self, branch_id: &str) -> EngineResult<&[ReturnEntry]> {
        Ok(&self.book(branch_id)?.returns)
    }

    pub fn receiving(&self, branch_id: &str) -> EngineResult<&[ReceivingEntry]> {
        Ok(&self.book(branch_id)?.receiving)
    }

    pub fn expenses(&self, branch_id: &str) -> EngineResult<&[ExpenseEntry]> {
        Ok(&self.book(branch_id)?.expenses)
    }

    /// Current persisted revision of a branch.
    pub fn revision(&self, branch_id: &str) -> EngineResult<u64> {
        Ok(self.book(branch_id)?.revision)
    }

    /// Sales movement report for one product in a date window.
    pub fn movement(
        &self,
        branch_id: &str,
        product: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> EngineResult<MovementReport> {
        Ok(product_movement(self.book(branch_id)?, product, from, to))
    }

    // =========================================================================
    // Sales
    // =========================================================================

    /// Records a sale: grams leave stock at the current average cost.
    pub async fn record_sale(
        &mut self,
        actor: &Actor,
        branch_id: &str,
        draft: SaleDraft,
    ) -> EngineResult<SaleEntry> {
        self.check_debounce(OpKind::Sale)?;
        validation::validate_product_name(&draft.product)?;
        validation::validate_quantity(draft.quantity)?;
        validation::validate_positive_amount(draft.total_price, "sale price")?;
        validation::validate_details(&draft.details)?;
        self.authorize(actor, branch_id, "record sales")?;
        // Armed as soon as the submission is accepted for processing, so a
        // failed save still debounces the rapid retry.
        self.debounce.mark(OpKind::Sale);

        let book = self.book(branch_id)?;
        let product_idx = book
            .product_index(&draft.product)
            .ok_or_else(|| CoreError::ProductNotFound(draft.product.clone()))?;

        let mut stock = book.products[product_idx].clone();
        let applied = costing::apply_sale(&mut stock, draft.quantity)?;
        if applied.clamp.any() {
            warn!(branch = branch_id, product = %draft.product, "Stock clamped to zero recording sale");
        }

        let snapshot = matches!(self.policy, CostingPolicy::ExactSnapshot);
        let entry = SaleEntry {
            id: EntryId::new(),
            date: sale_timestamp(draft.sale_date, Utc::now()),
            product: draft.product,
            quantity: draft.quantity,
            price: draft.total_price,
            customer_phone: draft.customer_phone,
            customer_details: draft.customer_details,
            details: draft.details,
            payment_method: draft.payment_method,
            user: actor.username.clone(),
            record_type: SaleRecordType::Sale,
            unit_cost_at_sale: snapshot.then_some(applied.unit_cost),
        };

        let book = self.book_mut(branch_id)?;
        book.products[product_idx] = stock;
        book.sales.push(entry.clone());

        self.persist(branch_id, &[Part::Products, Part::Sales]).await?;
        self.emit(branch_id, MutationKind::SaleRecorded);
        info!(branch = branch_id, product = %entry.product, quantity = entry.quantity, "Sale recorded");
        Ok(entry)
    }

    /// Edits a sale's quantity and price: the original stock effect is
    /// reversed, then the new one applied. Infeasible edits leave state
    /// untouched.
    pub async fn edit_sale(
        &mut self,
        actor: &Actor,
        branch_id: &str,
        entry_id: EntryId,
        update: SaleUpdate,
    ) -> EngineResult<SaleEntry> {
        Self::require_admin(actor, "edit sales")?;
        validation::validate_quantity(update.quantity)?;
        validation::validate_positive_amount(update.total_price, "sale price")?;

        let policy = self.policy;
        let book = self.book(branch_id)?;
        let sale_idx = book
            .sale_index(entry_id)
            .ok_or_else(|| EngineError::entry_not_found("sale", entry_id))?;
        let original = book.sales[sale_idx].clone();
        let product_idx = book
            .product_index(&original.product)
            .ok_or_else(|| CoreError::ProductNotFound(original.product.clone()))?;

        let mut stock = book.products[product_idx].clone();
        costing::reverse_sale(&mut stock, original.quantity, original.unit_cost_at_sale, policy);
        let applied = costing::apply_sale(&mut stock, update.quantity)?;
        if applied.clamp.any() {
            warn!(branch = branch_id, product = %original.product, "Stock clamped to zero editing sale");
        }

        let snapshot = matches!(policy, CostingPolicy::ExactSnapshot);
        let book = self.book_mut(branch_id)?;
        book.products[product_idx] = stock;
        let entry = &mut book.sales[sale_idx];
        entry.quantity = update.quantity;
        entry.price = update.total_price;
        entry.unit_cost_at_sale = snapshot.then_some(applied.unit_cost);
        let entry = entry.clone();

        self.persist(branch_id, &[Part::Products, Part::Sales]).await?;
        self.emit(branch_id, MutationKind::SaleEdited);
        info!(branch = branch_id, sale = %entry.id, "Sale edited");
        Ok(entry)
    }

    /// Deletes a sale, restoring the sold grams. If the product has since
    /// been deleted only the record is removed, stock untouched.
    pub async fn delete_sale(
        &mut self,
        actor: &Actor,
        branch_id: &str,
        entry_id: EntryId,
    ) -> EngineResult<()> {
        Self::require_admin(actor, "delete sales")?;

        let policy = self.policy;
        let book = self.book(branch_id)?;
        let sale_idx = book
            .sale_index(entry_id)
            .ok_or_else(|| EngineError::entry_not_found("sale", entry_id))?;
        let original = book.sales[sale_idx].clone();

        let mut parts = vec![Part::Sales];
        let stock_change = match book.product_index(&original.product) {
            Some(idx) => {
                let mut stock = book.products[idx].clone();
                costing::reverse_sale(
                    &mut stock,
                    original.quantity,
                    original.unit_cost_at_sale,
                    policy,
                );
                parts.push(Part::Products);
                Some((idx, stock))
            }
            None => {
                warn!(branch = branch_id, product = %original.product, "Product missing, record-only sale delete");
                None
            }
        };

        let book = self.book_mut(branch_id)?;
        if let Some((idx, stock)) = stock_change {
            book.products[idx] = stock;
        }
        book.sales.remove(sale_idx);

        self.persist(branch_id, &parts).await?;
        self.emit(branch_id, MutationKind::SaleDeleted);
        info!(branch = branch_id, sale = %entry_id, "Sale deleted");
        Ok(())
    }

    // =========================================================================
    // Returns
    // =========================================================================

    /// Records a customer return. An unknown product is created with the
    /// returned grams at zero cost basis.
    pub async fn record_return(
        &mut self,
        actor: &Actor,
        branch_id: &str,
        draft: ReturnDraft,
    ) -> EngineResult<ReturnEntry> {
        self.check_debounce(OpKind::Return)?;
        validation::validate_product_name(&draft.product)?;
        validation::validate_quantity(draft.quantity)?;
        validation::validate_non_negative_amount(draft.refund_amount, "refund")?;
        validation::validate_reason(&draft.reason)?;
        self.authorize(actor, branch_id, "record returns")?;
        self.debounce.mark(OpKind::Return);

        let book = self.book(branch_id)?;
        let existing = book.product_index(&draft.product);
        let updated_stock = match existing {
            Some(idx) => {
                let mut stock = book.products[idx].clone();
                costing::apply_return(&mut stock, draft.quantity);
                Some(stock)
            }
            None => None,
        };

        let entry = ReturnEntry {
            id: EntryId::new(),
            date: Utc::now(),
            product: draft.product.clone(),
            quantity: draft.quantity,
            refund_amount: draft.refund_amount,
            reason: draft.reason,
            user: actor.username.clone(),
        };

        let book = self.book_mut(branch_id)?;
        match (existing, updated_stock) {
            (Some(idx), Some(stock)) => book.products[idx] = stock,
            _ => book
                .products
                .push(ProductStock::zero_cost(draft.product, draft.quantity)),
        }
        book.returns.push(entry.clone());

        self.persist(branch_id, &[Part::Products, Part::Returns]).await?;
        self.emit(branch_id, MutationKind::ReturnRecorded);
        info!(branch = branch_id, product = %entry.product, quantity = entry.quantity, "Return recorded");
        Ok(entry)
    }

    /// Edits a return's quantity and refund. If the product has since been
    /// deleted only the record is updated, stock untouched.
    pub async fn edit_return(
        &mut self,
        actor: &Actor,
        branch_id: &str,
        entry_id: EntryId,
        update: ReturnUpdate,
    ) -> EngineResult<ReturnEntry> {
        Self::require_admin(actor, "edit returns")?;
        validation::validate_quantity(update.quantity)?;
        validation::validate_non_negative_amount(update.refund_amount, "refund")?;

        let book = self.book(branch_id)?;
        let return_idx = book
            .return_index(entry_id)
            .ok_or_else(|| EngineError::entry_not_found("return", entry_id))?;
        let original = book.returns[return_idx].clone();

        let mut parts = vec![Part::Returns];
        let stock_change = match book.product_index(&original.product) {
            Some(idx) => {
                let mut stock = book.products[idx].clone();
                let clamp = costing::reverse_return(&mut stock, original.quantity);
                if clamp.any() {
                    warn!(branch = branch_id, product = %original.product, "Stock clamped to zero reversing return");
                }
                costing::apply_return(&mut stock, update.quantity);
                parts.push(Part::Products);
                Some((idx, stock))
            }
            None => {
                warn!(branch = branch_id, product = %original.product, "Product missing, record-only return edit");
                None
            }
        };

        let book = self.book_mut(branch_id)?;
        if let Some((idx, stock)) = stock_change {
            book.products[idx] = stock;
        }
        let entry = &mut book.returns[return_idx];
        entry.quantity = update.quantity;
        entry.refund_amount = update.refund_amount;
        let entry = entry.clone();

        self.persist(branch_id, &parts).await?;
        self.emit(branch_id, MutationKind::ReturnEdited);
        info!(branch = branch_id, entry = %entry.id, "Return edited");
        Ok(entry)
    }

    /// Deletes a return, removing the returned grams again.
    pub async fn delete_return(
        &mut self,
        actor: &Actor,
        branch_id: &str,
        entry_id: EntryId,
    ) -> EngineResult<()> {
        Self::require_admin(actor, "delete returns")?;

        let book = self.book(branch_id)?;
        let return_idx = book
            .return_index(entry_id)
            .ok_or_else(|| EngineError::entry_not_found("return", entry_id))?;
        let original = book.returns[return_idx].clone();

        let mut parts = vec![Part::Returns];
        let stock_change = match book.product_index(&original.product) {
            Some(idx) => {
                let mut stock = book.products[idx].clone();
                let clamp = costing::reverse_return(&mut stock, original.quantity);
                if clamp.any() {
                    warn!(branch = branch_id, product = %original.product, "Stock clamped to zero reversing return");
                }
                parts.push(Part::Products);
                Some((idx, stock))
            }
            None => {
                warn!(branch = branch_id, product = %original.product, "Product missing, record-only return delete");
                None
            }
        };

        let book = self.book_mut(branch_id)?;
        if let Some((idx, stock)) = stock_change {
            book.products[idx] = stock;
        }
        book.returns.remove(return_idx);

        self.persist(branch_id, &parts).await?;
        self.emit(branch_id, MutationKind::ReturnDeleted);
        info!(branch = branch_id, entry = %entry_id, "Return deleted");
        Ok(())
    }

    // =========================================================================
    // Receiving
    // =========================================================================

    /// Records a stock receipt. An unknown product is created with the batch
    /// quantity and cost.
    pub async fn record_receiving(
        &mut self,
        actor: &Actor,
        branch_id: &str,
        draft: ReceivingDraft,
    ) -> EngineResult<ReceivingEntry> {
        self.check_debounce(OpKind::Receiving)?;
        validation::validate_product_name(&draft.product)?;
        validation::validate_quantity(draft.quantity)?;
        validation::validate_unit_cost(draft.unit_cost)?;
        validation::validate_supplier(&draft.supplier)?;
        self.authorize(actor, branch_id, "record receipts")?;
        self.debounce.mark(OpKind::Receiving);

        let book = self.book(branch_id)?;
        let existing = book.product_index(&draft.product);
        let updated_stock = match existing {
            Some(idx) => {
                let mut stock = book.products[idx].clone();
                costing::apply_receipt(&mut stock, draft.quantity, draft.unit_cost);
                Some(stock)
            }
            None => None,
        };

        let entry = ReceivingEntry {
            id: EntryId::new(),
            date: Utc::now(),
            product: draft.product.clone(),
            quantity: draft.quantity,
            unit_cost: draft.unit_cost,
            supplier: draft.supplier,
            user: actor.username.clone(),
        };

        let book = self.book_mut(branch_id)?;
        match (existing, updated_stock) {
            (Some(idx), Some(stock)) => book.products[idx] = stock,
            _ => book.products.push(ProductStock::new(
                draft.product,
                draft.quantity,
                draft.quantity * draft.unit_cost,
            )),
        }
        book.receiving.push(entry.clone());

        self.persist(branch_id, &[Part::Products, Part::Receiving]).await?;
        self.emit(branch_id, MutationKind::ReceivingRecorded);
        info!(branch = branch_id, product = %entry.product, quantity = entry.quantity, "Receipt recorded");
        Ok(entry)
    }

    /// Edits a receipt: the original batch is backed out, the new one
    /// applied.
    pub async fn edit_receiving(
        &mut self,
        actor: &Actor,
        branch_id: &str,
        entry_id: EntryId,
        update: ReceivingUpdate,
    ) -> EngineResult<ReceivingEntry> {
        Self::require_admin(actor, "edit receipts")?;
        validation::validate_quantity(update.quantity)?;
        validation::validate_unit_cost(update.unit_cost)?;
        validation::validate_supplier(&update.supplier)?;

        let book = self.book(branch_id)?;
        let entry_idx = book
            .receiving_index(entry_id)
            .ok_or_else(|| EngineError::entry_not_found("receiving", entry_id))?;
        let original = book.receiving[entry_idx].clone();
        let product_idx = book
            .product_index(&original.product)
            .ok_or_else(|| CoreError::ProductNotFound(original.product.clone()))?;

        let mut stock = book.products[product_idx].clone();
        let clamp = costing::reverse_receipt(&mut stock, original.quantity, original.unit_cost);
        if clamp.any() {
            warn!(branch = branch_id, product = %original.product, "Stock clamped to zero reversing receipt");
        }
        costing::apply_receipt(&mut stock, update.quantity, update.unit_cost);

        let book = self.book_mut(branch_id)?;
        book.products[product_idx] = stock;
        let entry = &mut book.receiving[entry_idx];
        entry.quantity = update.quantity;
        entry.unit_cost = update.unit_cost;
        entry.supplier = update.supplier;
        let entry = entry.clone();

        self.persist(branch_id, &[Part::Products, Part::Receiving]).await?;
        self.emit(branch_id, MutationKind::ReceivingEdited);
        info!(branch = branch_id, entry = %entry.id, "Receipt edited");
        Ok(entry)
    }

    /// Deletes a receipt, backing its batch out of stock. If the product has
    /// since been deleted only the record is removed, stock untouched.
    pub async fn delete_receiving(
        &mut self,
        actor: &Actor,
        branch_id: &str,
        entry_id: EntryId,
    ) -> EngineResult<()> {
        Self::require_admin(actor, "delete receipts")?;

        let book = self.book(branch_id)?;
        let entry_idx = book
            .receiving_index(entry_id)
            .ok_or_else(|| EngineError::entry_not_found("receiving", entry_id))?;
        let original = book.receiving[entry_idx].clone();

        let mut parts = vec![Part::Receiving];
        let stock_change = match book.product_index(&original.product) {
            Some(idx) => {
                let mut stock = book.products[idx].clone();
                let clamp =
                    costing::reverse_receipt(&mut stock, original.quantity, original.unit_cost);
                if clamp.any() {
                    warn!(branch = branch_id, product = %original.product, "Stock clamped to zero reversing receipt");
                }
                parts.push(Part::Products);
                Some((idx, stock))
            }
            None => {
                warn!(branch = branch_id, product = %original.product, "Product missing, record-only receipt delete");
                None
            }
        };

        let book = self.book_mut(branch_id)?;
        if let Some((idx, stock)) = stock_change {
            book.products[idx] = stock;
        }
        book.receiving.remove(entry_idx);

        self.persist(branch_id, &parts).await?;
        self.emit(branch_id, MutationKind::ReceivingDeleted);
        info!(branch = branch_id, entry = %entry_id, "Receipt deleted");
        Ok(())
    }

    // =========================================================================
    // Expenses
    // =========================================================================

    /// Records an expense. Scrap purchases add the purchased grams to the
    /// named product at the expense amount; salaries are admin-only.
    pub async fn record_expense(
        &mut self,
        actor: &Actor,
        branch_id: &str,
        draft: ExpenseDraft,
    ) -> EngineResult<ExpenseEntry> {
        self.check_debounce(OpKind::Expense)?;
        validation::validate_positive_amount(draft.amount, "expense amount")?;
        validation::validate_details(&draft.description)?;
        match &draft.kind {
            ExpenseKind::Salary { employee } => {
                Self::require_admin(actor, "record salary expenses")?;
                validation::validate_username(employee)?;
            }
            ExpenseKind::ScrapPurchase { product, quantity } => {
                validation::validate_product_name(product)?;
                validation::validate_quantity(*quantity)?;
            }
            ExpenseKind::Other { label } => {
                if label.trim().is_empty() {
                    return Err(ValidationError::Required {
                        field: "expense type".to_string(),
                    }
                    .into());
                }
            }
        }
        self.authorize(actor, branch_id, "record expenses")?;
        self.debounce.mark(OpKind::Expense);

        let mut parts = vec![Part::Expenses];
        let stock_change = if let ExpenseKind::ScrapPurchase { product, quantity } = &draft.kind {
            let book = self.book(branch_id)?;
            // Scrap needs an existing product row to absorb the grams.
            let idx = book
                .product_index(product)
                .ok_or_else(|| CoreError::ProductNotFound(product.clone()))?;
            let mut stock = book.products[idx].clone();
            costing::apply_scrap_purchase(&mut stock, *quantity, draft.amount);
            parts.push(Part::Products);
            Some((idx, stock))
        } else {
            self.book(branch_id)?;
            None
        };

        let entry = ExpenseEntry {
            id: EntryId::new(),
            date: Utc::now(),
            amount: draft.amount,
            description: draft.description,
            user: actor.username.clone(),
            kind: draft.kind,
        };

        let book = self.book_mut(branch_id)?;
        if let Some((idx, stock)) = stock_change {
            book.products[idx] = stock;
        }
        book.expenses.push(entry.clone());

        self.persist(branch_id, &parts).await?;
        self.emit(branch_id, MutationKind::ExpenseRecorded);
        info!(branch = branch_id, kind = entry.kind.type_label(), amount = entry.amount, "Expense recorded");
        Ok(entry)
    }

    /// Edits an expense's amount and description. For a scrap purchase the
    /// cost basis shifts by the amount delta; the grams are fixed at
    /// recording time.
    pub async fn edit_expense(
        &mut self,
        actor: &Actor,
        branch_id: &str,
        entry_id: EntryId,
        update: ExpenseUpdate,
    ) -> EngineResult<ExpenseEntry> {
        Self::require_admin(actor, "edit expenses")?;
        validation::validate_positive_amount(update.amount, "expense amount")?;
        validation::validate_details(&update.description)?;

        let book = self.book(branch_id)?;
        let entry_idx = book
            .expense_index(entry_id)
            .ok_or_else(|| EngineError::entry_not_found("expense", entry_id))?;
        let original = book.expenses[entry_idx].clone();

        let mut parts = vec![Part::Expenses];
        let mut stock_change = None;
        if let ExpenseKind::ScrapPurchase { product, .. } = &original.kind {
            let delta = update.amount - original.amount;
            if delta != 0.0 {
                match book.product_index(product) {
                    Some(idx) => {
                        let mut stock = book.products[idx].clone();
                        let clamp = costing::adjust_scrap_amount(&mut stock, delta);
                        if clamp.any() {
                            warn!(branch = branch_id, product = %product, "Cost basis clamped to zero editing scrap expense");
                        }
                        parts.push(Part::Products);
                        stock_change = Some((idx, stock));
                    }
                    None => {
                        warn!(branch = branch_id, product = %product, "Product missing, record-only expense edit");
                    }
                }
            }
        }

        let book = self.book_mut(branch_id)?;
        if let Some((idx, stock)) = stock_change {
            book.products[idx] = stock;
        }
        let entry = &mut book.expenses[entry_idx];
        entry.amount = update.amount;
        entry.description = update.description;
        let entry = entry.clone();

        self.persist(branch_id, &parts).await?;
        self.emit(branch_id, MutationKind::ExpenseEdited);
        info!(branch = branch_id, entry = %entry.id, "Expense edited");
        Ok(entry)
    }

    /// Deletes an expense. A scrap purchase backs its grams and cost out of
    /// the product.
    pub async fn delete_expense(
        &mut self,
        actor: &Actor,
        branch_id: &str,
        entry_id: EntryId,
    ) -> EngineResult<()> {
        Self::require_admin(actor, "delete expenses")?;

        let book = self.book(branch_id)?;
        let entry_idx = book
            .expense_index(entry_id)
            .ok_or_else(|| EngineError::entry_not_found("expense", entry_id))?;
        let original = book.expenses[entry_idx].clone();

        let mut parts = vec![Part::Expenses];
        let mut stock_change = None;
        if let ExpenseKind::ScrapPurchase { product, quantity } = &original.kind {
            match book.product_index(product) {
                Some(idx) => {
                    let mut stock = book.products[idx].clone();
                    let clamp =
                        costing::reverse_scrap_purchase(&mut stock, *quantity, original.amount);
                    if clamp.any() {
                        warn!(branch = branch_id, product = %product, "Stock clamped to zero reversing scrap purchase");
                    }
                    parts.push(Part::Products);
                    stock_change = Some((idx, stock));
                }
                None => {
                    warn!(branch = branch_id, product = %product, "Product missing, record-only expense delete");
                }
            }
        }

        let book = self.book_mut(branch_id)?;
        if let Some((idx, stock)) = stock_change {
            book.products[idx] = stock;
        }
        book.expenses.remove(entry_idx);

        self.persist(branch_id, &parts).await?;
        self.emit(branch_id, MutationKind::ExpenseDeleted);
        info!(branch = branch_id, entry = %entry_id, "Expense deleted");
        Ok(())
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Creates a product with an initial quantity and total cost, merging
    /// into an existing row of the same name.
    pub async fn add_product(
        &mut self,
        actor: &Actor,
        branch_id: &str,
        draft: ProductDraft,
    ) -> EngineResult<ProductStock> {
        self.check_debounce(OpKind::Product)?;
        Self::require_admin(actor, "manage products")?;
        validation::validate_product_name(&draft.name)?;
        validation::validate_quantity(draft.quantity)?;
        validation::validate_non_negative_amount(draft.total_cost, "total cost")?;
        self.debounce.mark(OpKind::Product);

        let book = self.book_mut(branch_id)?;
        let stock = match book.product_index(&draft.name) {
            Some(idx) => {
                let row = &mut book.products[idx];
                row.quantity += draft.quantity;
                row.cost_basis_total += draft.total_cost;
                row.clone()
            }
            None => {
                let row = ProductStock::new(draft.name, draft.quantity, draft.total_cost);
                book.products.push(row.clone());
                row
            }
        };

        self.persist(branch_id, &[Part::Products]).await?;
        self.emit(branch_id, MutationKind::ProductAdded);
        info!(branch = branch_id, product = %stock.name, "Product added");
        Ok(stock)
    }

    /// Manual product correction: overwrites name, quantity and cost basis
    /// as given. The ledger is NOT touched; this is the escape hatch for
    /// counting corrections.
    pub async fn edit_product(
        &mut self,
        actor: &Actor,
        branch_id: &str,
        product: &str,
        update: ProductUpdate,
    ) -> EngineResult<ProductStock> {
        Self::require_admin(actor, "manage products")?;
        validation::validate_product_name(&update.name)?;
        validation::validate_stock_level(update.quantity)?;
        validation::validate_non_negative_amount(update.cost_basis_total, "cost basis")?;

        let book = self.book(branch_id)?;
        let idx = book
            .product_index(product)
            .ok_or_else(|| CoreError::ProductNotFound(product.to_string()))?;
        if update.name != product && book.product_index(&update.name).is_some() {
            return Err(ValidationError::Duplicate {
                field: "product name".to_string(),
                value: update.name,
            }
            .into());
        }

        let book = self.book_mut(branch_id)?;
        let row = &mut book.products[idx];
        row.name = update.name;
        row.quantity = update.quantity;
        row.cost_basis_total = update.cost_basis_total;
        let stock = row.clone();

        self.persist(branch_id, &[Part::Products]).await?;
        self.emit(branch_id, MutationKind::ProductEdited);
        info!(branch = branch_id, product = %stock.name, "Product edited");
        Ok(stock)
    }

    /// Deletes a product row. Ledger entries that reference it survive;
    /// corrections against them become record-only.
    pub async fn delete_product(
        &mut self,
        actor: &Actor,
        branch_id: &str,
        product: &str,
    ) -> EngineResult<()> {
        Self::require_admin(actor, "manage products")?;

        let book = self.book_mut(branch_id)?;
        let idx = book
            .product_index(product)
            .ok_or_else(|| CoreError::ProductNotFound(product.to_string()))?;
        book.products.remove(idx);

        self.persist(branch_id, &[Part::Products]).await?;
        self.emit(branch_id, MutationKind::ProductDeleted);
        info!(branch = branch_id, product = %product, "Product deleted");
        Ok(())
    }

    // =========================================================================
    // Branches & Tree
    // =========================================================================

    /// Creates a branch with empty collections. Metadata and book are
    /// written in one root-level merge.
    pub async fn create_branch(
        &mut self,
        actor: &Actor,
        name: impl Into<String>,
        users: Vec<String>,
    ) -> EngineResult<String> {
        Self::require_admin(actor, "create branches")?;
        let name = name.into();
        validation::validate_branch_name(&name)?;
        if self.directory.name_taken(&name) {
            return Err(ValidationError::Duplicate {
                field: "branch name".to_string(),
                value: name,
            }
            .into());
        }

        let branch_id = Uuid::new_v4().to_string();
        let info = BranchInfo {
            name,
            users,
        };
        let book = BranchBook {
            last_updated: Some(Utc::now()),
            ..BranchBook::default()
        };

        let mut metadata = Map::new();
        metadata.insert(
            branch_id.clone(),
            serde_json::to_value(&info).map_err(StoreError::from)?,
        );
        let mut data = Map::new();
        data.insert(
            branch_id.clone(),
            serde_json::to_value(&book).map_err(StoreError::from)?,
        );
        let mut patch = Map::new();
        patch.insert(tree_path::BRANCH_METADATA.to_string(), Value::Object(metadata));
        patch.insert(tree_path::BRANCH_DATA.to_string(), Value::Object(data));

        self.gateway.write("", Value::Object(patch)).await?;
        self.directory.insert(branch_id.clone(), info);
        self.books.insert(branch_id.clone(), book);

        self.emit(&branch_id, MutationKind::BranchCreated);
        info!(branch = %branch_id, "Branch created");
        Ok(branch_id)
    }

    /// Snapshot of the whole tree, for backups.
    pub async fn export_tree(&self) -> EngineResult<Value> {
        Ok(self
            .gateway
            .read("")
            .await?
            .unwrap_or_else(|| Value::Object(Map::new())))
    }

    /// Replaces the whole tree from a backup and reloads.
    /// The emitted event carries an empty branch id: everything changed.
    pub async fn restore_tree(&mut self, actor: &Actor, tree: Value) -> EngineResult<()> {
        Self::require_admin(actor, "restore backups")?;
        self.gateway.write_at_root(tree).await?;
        self.reload().await?;
        self.emit("", MutationKind::TreeRestored);
        info!("Tree restored from backup");
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn book(&self, branch_id: &str) -> EngineResult<&BranchBook> {
        self.books
            .get(branch_id)
            .ok_or_else(|| EngineError::BranchNotFound(branch_id.to_string()))
    }

    fn book_mut(&mut self, branch_id: &str) -> EngineResult<&mut BranchBook> {
        self.books
            .get_mut(branch_id)
            .ok_or_else(|| EngineError::BranchNotFound(branch_id.to_string()))
    }

    /// Admin, or assigned to the branch.
    fn authorize(&self, actor: &Actor, branch_id: &str, action: &str) -> EngineResult<()> {
        if actor.is_admin() || self.directory.is_assigned(branch_id, &actor.username) {
            Ok(())
        } else {
            Err(EngineError::unauthorized(&actor.username, action))
        }
    }

    fn require_admin(actor: &Actor, action: &str) -> EngineResult<()> {
        if actor.is_admin() {
            Ok(())
        } else {
            Err(EngineError::unauthorized(&actor.username, action))
        }
    }

    fn check_debounce(&self, kind: OpKind) -> EngineResult<()> {
        self.debounce
            .check(kind)
            .map_err(|remaining| EngineError::DuplicateSubmission {
                kind,
                remaining_ms: remaining.as_millis() as u64,
            })
    }

    fn emit(&self, branch_id: &str, kind: MutationKind) {
        // No subscribers is fine.
        let _ = self.events.send(MutationEvent::new(branch_id, kind));
    }

    /// Persists the touched collections of a branch in one merge write,
    /// bumping the revision the store checks against.
    async fn persist(&mut self, branch_id: &str, parts: &[Part]) -> EngineResult<()> {
        let book = self.book_mut(branch_id)?;
        book.revision += 1;
        book.last_updated = Some(Utc::now());
        let revision = book.revision;

        let mut patch = Map::new();
        for part in parts {
            let (key, value) = match part {
                Part::Products => ("products", serde_json::to_value(&book.products)),
                Part::Sales => ("sales", serde_json::to_value(&book.sales)),
                Part::Returns => ("returns", serde_json::to_value(&book.returns)),
                Part::Receiving => ("receiving", serde_json::to_value(&book.receiving)),
                Part::Expenses => ("expenses", serde_json::to_value(&book.expenses)),
            };
            patch.insert(key.to_string(), value.map_err(StoreError::from)?);
        }
        patch.insert("revision".to_string(), Value::from(revision));
        patch.insert(
            "lastUpdated".to_string(),
            serde_json::to_value(book.last_updated).map_err(StoreError::from)?,
        );

        match self
            .gateway
            .write(&tree_path::branch_data(branch_id), Value::Object(patch))
            .await
        {
            Ok(()) => {
                debug!(branch = branch_id, revision, "Branch persisted");
                Ok(())
            }
            Err(e) => {
                warn!(branch = branch_id, error = %e, "Persist failed; in-memory state is ahead, reload required");
                Err(e.into())
            }
        }
    }
}

/// Combines the operator-chosen business date with the current time of day.
fn sale_timestamp(sale_date: NaiveDate, now: DateTime<Utc>) -> DateTime<Utc> {
    sale_date.and_time(now.time()).and_utc()
}

// =============================================================================
// Unit Tests
// =============================================================================
