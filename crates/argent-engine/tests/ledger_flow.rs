//! End-to-end ledger flows against an in-memory store: recording,
//! corrections, authorization, debounce, branch provisioning and the
//! concurrent-writer guard.

use std::time::Duration;

use serde_json::json;

use argent_core::{CoreError, CostingPolicy, ExpenseKind, PaymentMethod, ValidationError};
use argent_engine::{
    Actor, EngineError, ExpenseDraft, Ledger, LedgerConfig, MutationKind, ProductDraft,
    ProductUpdate, ReceivingDraft, ReturnDraft, ReturnUpdate, SaleDraft, SaleUpdate,
};
use argent_store::{JsonStore, PersistenceGateway, StoreConfig, StoreError};

const BRANCH: &str = "b-downtown";

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

/// One branch, one product: 100 g of ring-925 bought for 200 (average 2/g).
async fn seeded_store() -> JsonStore {
    let store = JsonStore::open(StoreConfig::in_memory())
        .await
        .expect("open in-memory store");
    store
        .write_at_root(json!({
            "branchMetadata": {
                BRANCH: { "name": "downtown", "users": ["sara"] },
            },
            "branchData": {
                BRANCH: {
                    "products": [
                        { "name": "ring-925", "quantity": 100.0, "purchasePrice": 200.0 }
                    ],
                },
            },
        }))
        .await
        .expect("seed tree");
    store
}

/// Debounce disabled so tests can submit back to back.
async fn ledger() -> Ledger<JsonStore> {
    let config = LedgerConfig::new().debounce_window(Duration::ZERO);
    Ledger::load(seeded_store().await, config)
        .await
        .expect("load ledger")
}

fn sale_draft(product: &str, quantity: f64, total_price: f64) -> SaleDraft {
    SaleDraft {
        product: product.to_string(),
        quantity,
        total_price,
        sale_date: chrono::Utc::now().date_naive(),
        customer_phone: String::new(),
        customer_details: String::new(),
        details: String::new(),
        payment_method: PaymentMethod::Cash,
    }
}

fn return_draft(product: &str, quantity: f64, refund_amount: f64) -> ReturnDraft {
    ReturnDraft {
        product: product.to_string(),
        quantity,
        refund_amount,
        reason: "changed mind".to_string(),
    }
}

// =============================================================================
// Recording & Costing
// =============================================================================

#[tokio::test]
async fn test_sale_consumes_stock_at_average_cost() {
    let mut ledger = ledger().await;
    let sara = Actor::user("sara");

    let sale = ledger
        .record_sale(&sara, BRANCH, sale_draft("ring-925", 40.0, 400.0))
        .await
        .unwrap();
    assert_eq!(sale.user, "sara");
    // Default policy records no snapshot.
    assert_eq!(sale.unit_cost_at_sale, None);

    let stock = &ledger.products(BRANCH).unwrap()[0];
    assert!(approx(stock.quantity, 60.0));
    assert!(approx(stock.cost_basis_total, 120.0));

    // The persisted tree carries the same figures plus the bumped revision.
    let branch = ledger
        .gateway()
        .read("branchData/b-downtown")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(branch["products"][0]["quantity"], 60.0);
    assert_eq!(branch["products"][0]["purchasePrice"], 120.0);
    assert_eq!(branch["revision"], 1);
    assert_eq!(branch["sales"][0]["type"], "sale");
}

#[tokio::test]
async fn test_receipt_blends_into_average() {
    let mut ledger = ledger().await;
    let sara = Actor::user("sara");

    ledger
        .record_receiving(
            &sara,
            BRANCH,
            ReceivingDraft {
                product: "ring-925".to_string(),
                quantity: 50.0,
                unit_cost: 5.0,
                supplier: "al-noor".to_string(),
            },
        )
        .await
        .unwrap();

    // 100 g @ 200 + 50 g @ 5/g = 150 g @ 450, average 3/g.
    let stock = &ledger.products(BRANCH).unwrap()[0];
    assert!(approx(stock.quantity, 150.0));
    assert!(approx(stock.cost_basis_total, 450.0));

    ledger
        .record_sale(&sara, BRANCH, sale_draft("ring-925", 30.0, 300.0))
        .await
        .unwrap();
    let stock = &ledger.products(BRANCH).unwrap()[0];
    assert!(approx(stock.quantity, 120.0));
    assert!(approx(stock.cost_basis_total, 360.0));
}

#[tokio::test]
async fn test_insufficient_stock_rejected_without_side_effects() {
    let mut ledger = ledger().await;
    let sara = Actor::user("sara");

    let err = ledger
        .record_sale(&sara, BRANCH, sale_draft("ring-925", 200.0, 1000.0))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Core(CoreError::InsufficientStock { .. })
    ));

    assert!(ledger.sales(BRANCH).unwrap().is_empty());
    let stock = &ledger.products(BRANCH).unwrap()[0];
    assert!(approx(stock.quantity, 100.0));
    assert_eq!(ledger.revision(BRANCH).unwrap(), 0);
}

#[tokio::test]
async fn test_unknown_product_sale_rejected() {
    let mut ledger = ledger().await;
    let err = ledger
        .record_sale(&Actor::user("sara"), BRANCH, sale_draft("chain-925", 1.0, 10.0))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Core(CoreError::ProductNotFound(_))
    ));
}

// =============================================================================
// Corrections
// =============================================================================

#[tokio::test]
async fn test_edit_sale_reverses_then_applies() {
    let mut ledger = ledger().await;
    let admin = Actor::admin("boss");

    let sale = ledger
        .record_sale(&admin, BRANCH, sale_draft("ring-925", 40.0, 400.0))
        .await
        .unwrap();

    ledger
        .edit_sale(
            &admin,
            BRANCH,
            sale.id,
            SaleUpdate {
                quantity: 10.0,
                total_price: 100.0,
            },
        )
        .await
        .unwrap();

    // 40 g reversed at average 2/g, 10 g re-applied: 90 g @ 180.
    let stock = &ledger.products(BRANCH).unwrap()[0];
    assert!(approx(stock.quantity, 90.0));
    assert!(approx(stock.cost_basis_total, 180.0));
    assert!(approx(ledger.sales(BRANCH).unwrap()[0].quantity, 10.0));
}

#[tokio::test]
async fn test_infeasible_edit_leaves_state_untouched() {
    let mut ledger = ledger().await;
    let admin = Actor::admin("boss");

    let sale = ledger
        .record_sale(&admin, BRANCH, sale_draft("ring-925", 40.0, 400.0))
        .await
        .unwrap();
    let revision_before = ledger.revision(BRANCH).unwrap();

    let err = ledger
        .edit_sale(
            &admin,
            BRANCH,
            sale.id,
            SaleUpdate {
                quantity: 1000.0,
                total_price: 100.0,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Core(CoreError::InsufficientStock { .. })
    ));

    let stock = &ledger.products(BRANCH).unwrap()[0];
    assert!(approx(stock.quantity, 60.0));
    assert!(approx(stock.cost_basis_total, 120.0));
    assert!(approx(ledger.sales(BRANCH).unwrap()[0].quantity, 40.0));
    assert_eq!(ledger.revision(BRANCH).unwrap(), revision_before);
}

#[tokio::test]
async fn test_delete_sale_restores_stock() {
    let mut ledger = ledger().await;
    let admin = Actor::admin("boss");

    let sale = ledger
        .record_sale(&admin, BRANCH, sale_draft("ring-925", 40.0, 400.0))
        .await
        .unwrap();
    ledger.delete_sale(&admin, BRANCH, sale.id).await.unwrap();

    let stock = &ledger.products(BRANCH).unwrap()[0];
    assert!(approx(stock.quantity, 100.0));
    assert!(approx(stock.cost_basis_total, 200.0));
    assert!(ledger.sales(BRANCH).unwrap().is_empty());
}

#[tokio::test]
async fn test_exact_snapshot_policy_restores_recorded_cost() {
    let config = LedgerConfig::new()
        .policy(CostingPolicy::ExactSnapshot)
        .debounce_window(Duration::ZERO);
    let mut ledger = Ledger::load(seeded_store().await, config).await.unwrap();
    let admin = Actor::admin("boss");

    // Sold at average 2/g; the snapshot is recorded.
    let sale = ledger
        .record_sale(&admin, BRANCH, sale_draft("ring-925", 40.0, 400.0))
        .await
        .unwrap();
    assert_eq!(sale.unit_cost_at_sale, Some(2.0));

    // A pricier batch shifts the current average to 4.5/g.
    ledger
        .record_receiving(
            &admin,
            BRANCH,
            ReceivingDraft {
                product: "ring-925".to_string(),
                quantity: 60.0,
                unit_cost: 7.0,
                supplier: "al-noor".to_string(),
            },
        )
        .await
        .unwrap();

    // Deleting the sale restores exactly 40 g * 2/g, not the current average.
    ledger.delete_sale(&admin, BRANCH, sale.id).await.unwrap();
    let stock = &ledger.products(BRANCH).unwrap()[0];
    assert!(approx(stock.quantity, 160.0));
    assert!(approx(stock.cost_basis_total, 620.0));
}

// =============================================================================
// Returns
// =============================================================================

#[tokio::test]
async fn test_return_of_unknown_product_creates_zero_cost_row() {
    let mut ledger = ledger().await;
    let sara = Actor::user("sara");

    ledger
        .record_return(&sara, BRANCH, return_draft("bracelet-925", 5.0, 60.0))
        .await
        .unwrap();

    let products = ledger.products(BRANCH).unwrap();
    let row = products.iter().find(|p| p.name == "bracelet-925").unwrap();
    assert!(approx(row.quantity, 5.0));
    assert!(approx(row.cost_basis_total, 0.0));
    assert!(approx(row.average_unit_cost(), 0.0));
}

#[tokio::test]
async fn test_delete_return_removes_at_pre_removal_average() {
    let mut ledger = ledger().await;
    let admin = Actor::admin("boss");

    let entry = ledger
        .record_return(&admin, BRANCH, return_draft("ring-925", 10.0, 25.0))
        .await
        .unwrap();
    let stock = &ledger.products(BRANCH).unwrap()[0];
    assert!(approx(stock.quantity, 110.0));
    assert!(approx(stock.cost_basis_total, 220.0));

    ledger.delete_return(&admin, BRANCH, entry.id).await.unwrap();
    let stock = &ledger.products(BRANCH).unwrap()[0];
    assert!(approx(stock.quantity, 100.0));
    assert!(approx(stock.cost_basis_total, 200.0));
}

// =============================================================================
// Expenses
// =============================================================================

#[tokio::test]
async fn test_scrap_purchase_adds_stock_and_reverses() {
    let mut ledger = ledger().await;
    let sara = Actor::user("sara");
    let admin = Actor::admin("boss");

    let entry = ledger
        .record_expense(
            &sara,
            BRANCH,
            ExpenseDraft {
                amount: 300.0,
                description: "scrap lot".to_string(),
                kind: ExpenseKind::ScrapPurchase {
                    product: "ring-925".to_string(),
                    quantity: 50.0,
                },
            },
        )
        .await
        .unwrap();

    let stock = &ledger.products(BRANCH).unwrap()[0];
    assert!(approx(stock.quantity, 150.0));
    assert!(approx(stock.cost_basis_total, 500.0));

    ledger.delete_expense(&admin, BRANCH, entry.id).await.unwrap();
    let stock = &ledger.products(BRANCH).unwrap()[0];
    assert!(approx(stock.quantity, 100.0));
    assert!(approx(stock.cost_basis_total, 200.0));
}

#[tokio::test]
async fn test_salary_expense_is_admin_only() {
    let mut ledger = ledger().await;
    let draft = ExpenseDraft {
        amount: 1500.0,
        description: String::new(),
        kind: ExpenseKind::Salary {
            employee: "sara".to_string(),
        },
    };

    let err = ledger
        .record_expense(&Actor::user("sara"), BRANCH, draft.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized { .. }));

    let entry = ledger
        .record_expense(&Actor::admin("boss"), BRANCH, draft)
        .await
        .unwrap();
    assert_eq!(entry.kind.type_label(), "salary");
}

// =============================================================================
// Authorization
// =============================================================================

#[tokio::test]
async fn test_unassigned_user_rejected() {
    let mut ledger = ledger().await;
    let err = ledger
        .record_sale(&Actor::user("omar"), BRANCH, sale_draft("ring-925", 1.0, 10.0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized { .. }));
}

#[tokio::test]
async fn test_corrections_are_admin_only() {
    let mut ledger = ledger().await;
    let sara = Actor::user("sara");

    let sale = ledger
        .record_sale(&sara, BRANCH, sale_draft("ring-925", 10.0, 100.0))
        .await
        .unwrap();

    let err = ledger
        .edit_sale(
            &sara,
            BRANCH,
            sale.id,
            SaleUpdate {
                quantity: 5.0,
                total_price: 50.0,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized { .. }));

    let err = ledger.delete_sale(&sara, BRANCH, sale.id).await.unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized { .. }));
}

// =============================================================================
// Debounce
// =============================================================================

#[tokio::test]
async fn test_rapid_resubmission_rejected_per_kind() {
    // Default 5 s window.
    let mut ledger = Ledger::load(seeded_store().await, LedgerConfig::new())
        .await
        .unwrap();
    let sara = Actor::user("sara");

    ledger
        .record_sale(&sara, BRANCH, sale_draft("ring-925", 1.0, 10.0))
        .await
        .unwrap();

    let err = ledger
        .record_sale(&sara, BRANCH, sale_draft("ring-925", 1.0, 10.0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::DuplicateSubmission { .. }));
    assert_eq!(ledger.sales(BRANCH).unwrap().len(), 1);

    // A different operation kind is not blocked.
    ledger
        .record_return(&sara, BRANCH, return_draft("ring-925", 1.0, 5.0))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_failed_persist_still_debounces_retry() {
    // Default 5 s window.
    let mut ledger = Ledger::load(seeded_store().await, LedgerConfig::new())
        .await
        .unwrap();
    let sara = Actor::user("sara");

    // A concurrent writer makes the next persist fail as stale.
    ledger
        .gateway()
        .write("branchData/b-downtown", json!({ "revision": 5 }))
        .await
        .unwrap();

    let err = ledger
        .record_sale(&sara, BRANCH, sale_draft("ring-925", 1.0, 10.0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Persistence(_)));

    // The window was armed when the submission was accepted, so the rapid
    // retry is rejected instead of racing the same failure again.
    let err = ledger
        .record_sale(&sara, BRANCH, sale_draft("ring-925", 1.0, 10.0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::DuplicateSubmission { .. }));
}

// =============================================================================
// Record-Only Corrections
// =============================================================================
// Deleting a product leaves its ledger entries behind; corrections against
// them must still go through, touching only the record.

#[tokio::test]
async fn test_delete_sale_after_product_removed_is_record_only() {
    let mut ledger = ledger().await;
    let admin = Actor::admin("boss");

    let sale = ledger
        .record_sale(&admin, BRANCH, sale_draft("ring-925", 40.0, 400.0))
        .await
        .unwrap();
    ledger.delete_product(&admin, BRANCH, "ring-925").await.unwrap();

    ledger.delete_sale(&admin, BRANCH, sale.id).await.unwrap();
    assert!(ledger.sales(BRANCH).unwrap().is_empty());
    // No stock reversal: the row stays gone.
    assert!(ledger.products(BRANCH).unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_receiving_after_product_removed_is_record_only() {
    let mut ledger = ledger().await;
    let admin = Actor::admin("boss");

    let receipt = ledger
        .record_receiving(
            &admin,
            BRANCH,
            ReceivingDraft {
                product: "ring-925".to_string(),
                quantity: 50.0,
                unit_cost: 2.0,
                supplier: "al-noor".to_string(),
            },
        )
        .await
        .unwrap();
    ledger.delete_product(&admin, BRANCH, "ring-925").await.unwrap();

    ledger.delete_receiving(&admin, BRANCH, receipt.id).await.unwrap();
    assert!(ledger.receiving(BRANCH).unwrap().is_empty());
    assert!(ledger.products(BRANCH).unwrap().is_empty());
}

#[tokio::test]
async fn test_return_corrections_after_product_removed_are_record_only() {
    let mut ledger = ledger().await;
    let admin = Actor::admin("boss");

    let entry = ledger
        .record_return(&admin, BRANCH, return_draft("ring-925", 10.0, 25.0))
        .await
        .unwrap();
    ledger.delete_product(&admin, BRANCH, "ring-925").await.unwrap();

    let edited = ledger
        .edit_return(
            &admin,
            BRANCH,
            entry.id,
            ReturnUpdate {
                quantity: 4.0,
                refund_amount: 10.0,
            },
        )
        .await
        .unwrap();
    assert!(approx(edited.quantity, 4.0));
    assert!(ledger.products(BRANCH).unwrap().is_empty());

    ledger.delete_return(&admin, BRANCH, entry.id).await.unwrap();
    assert!(ledger.returns(BRANCH).unwrap().is_empty());
    assert!(ledger.products(BRANCH).unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_scrap_expense_after_product_removed_is_record_only() {
    let mut ledger = ledger().await;
    let admin = Actor::admin("boss");

    let entry = ledger
        .record_expense(
            &admin,
            BRANCH,
            ExpenseDraft {
                amount: 300.0,
                description: String::new(),
                kind: ExpenseKind::ScrapPurchase {
                    product: "ring-925".to_string(),
                    quantity: 50.0,
                },
            },
        )
        .await
        .unwrap();
    ledger.delete_product(&admin, BRANCH, "ring-925").await.unwrap();

    ledger.delete_expense(&admin, BRANCH, entry.id).await.unwrap();
    assert!(ledger.expenses(BRANCH).unwrap().is_empty());
    assert!(ledger.products(BRANCH).unwrap().is_empty());
}

// =============================================================================
// Product Management
// =============================================================================

#[tokio::test]
async fn test_product_management_flow() {
    let mut ledger = ledger().await;
    let admin = Actor::admin("boss");

    // Adding an existing name merges quantities and cost.
    ledger
        .add_product(
            &admin,
            BRANCH,
            ProductDraft {
                name: "ring-925".to_string(),
                quantity: 20.0,
                total_cost: 100.0,
            },
        )
        .await
        .unwrap();
    let stock = &ledger.products(BRANCH).unwrap()[0];
    assert!(approx(stock.quantity, 120.0));
    assert!(approx(stock.cost_basis_total, 300.0));

    ledger
        .add_product(
            &admin,
            BRANCH,
            ProductDraft {
                name: "chain-925".to_string(),
                quantity: 30.0,
                total_cost: 90.0,
            },
        )
        .await
        .unwrap();

    // Renaming onto a taken name is rejected.
    let err = ledger
        .edit_product(
            &admin,
            BRANCH,
            "chain-925",
            ProductUpdate {
                name: "ring-925".to_string(),
                quantity: 30.0,
                cost_basis_total: 90.0,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Core(CoreError::Validation(ValidationError::Duplicate { .. }))
    ));

    // A correction may zero a product out.
    ledger
        .edit_product(
            &admin,
            BRANCH,
            "chain-925",
            ProductUpdate {
                name: "chain-925".to_string(),
                quantity: 0.0,
                cost_basis_total: 0.0,
            },
        )
        .await
        .unwrap();

    ledger.delete_product(&admin, BRANCH, "chain-925").await.unwrap();
    assert_eq!(ledger.products(BRANCH).unwrap().len(), 1);

    let err = ledger
        .add_product(
            &Actor::user("sara"),
            BRANCH,
            ProductDraft {
                name: "pendant".to_string(),
                quantity: 1.0,
                total_cost: 1.0,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized { .. }));
}

// =============================================================================
// Branch Provisioning
// =============================================================================

#[tokio::test]
async fn test_create_branch_provisions_metadata_and_book() {
    let mut ledger = ledger().await;
    let admin = Actor::admin("boss");

    let branch_id = ledger
        .create_branch(&admin, "harbor", vec!["omar".to_string()])
        .await
        .unwrap();
    assert_eq!(ledger.directory().resolve_id("harbor"), Some(branch_id.as_str()));
    assert!(ledger.products(&branch_id).unwrap().is_empty());

    // The assigned user can operate, the branch just has no stock yet.
    let err = ledger
        .record_sale(
            &Actor::user("omar"),
            &branch_id,
            sale_draft("ring-925", 1.0, 10.0),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Core(CoreError::ProductNotFound(_))
    ));

    // Both subtrees were written.
    let meta = ledger
        .gateway()
        .read(&format!("branchMetadata/{branch_id}"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(meta["name"], "harbor");

    let err = ledger
        .create_branch(&admin, "harbor", vec![])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Core(CoreError::Validation(ValidationError::Duplicate { .. }))
    ));
}

// =============================================================================
// Concurrency & Recovery
// =============================================================================

#[tokio::test]
async fn test_stale_writer_rejected_until_reload() {
    let mut ledger = ledger().await;
    let sara = Actor::user("sara");

    // Another terminal commits revision 5 behind this ledger's back.
    ledger
        .gateway()
        .write(
            "branchData/b-downtown",
            json!({
                "revision": 5,
                "products": [
                    { "name": "ring-925", "quantity": 80.0, "purchasePrice": 160.0 }
                ],
            }),
        )
        .await
        .unwrap();

    // This ledger still believes revision 0 and offers 1: rejected.
    let err = ledger
        .record_sale(&sara, BRANCH, sale_draft("ring-925", 10.0, 100.0))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Persistence(StoreError::StaleWrite { stored: 5, .. })
    ));

    // Reload resynchronizes; the next submission goes through on top of the
    // concurrent writer's state.
    ledger.reload().await.unwrap();
    let stock = &ledger.products(BRANCH).unwrap()[0];
    assert!(approx(stock.quantity, 80.0));

    ledger
        .record_sale(&sara, BRANCH, sale_draft("ring-925", 10.0, 100.0))
        .await
        .unwrap();
    assert_eq!(ledger.revision(BRANCH).unwrap(), 6);
    let stock = &ledger.products(BRANCH).unwrap()[0];
    assert!(approx(stock.quantity, 70.0));
}

#[tokio::test]
async fn test_backup_and_restore_round_trip() {
    let mut ledger = ledger().await;
    let admin = Actor::admin("boss");

    ledger
        .record_sale(&admin, BRANCH, sale_draft("ring-925", 40.0, 400.0))
        .await
        .unwrap();
    let backup = ledger.export_tree().await.unwrap();

    ledger
        .record_sale(&admin, BRANCH, sale_draft("ring-925", 20.0, 200.0))
        .await
        .unwrap();
    assert_eq!(ledger.sales(BRANCH).unwrap().len(), 2);

    ledger.restore_tree(&admin, backup).await.unwrap();
    assert_eq!(ledger.sales(BRANCH).unwrap().len(), 1);
    let stock = &ledger.products(BRANCH).unwrap()[0];
    assert!(approx(stock.quantity, 60.0));

    let err = ledger
        .restore_tree(&Actor::user("sara"), json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized { .. }));
}

// =============================================================================
// Events
// =============================================================================

#[tokio::test]
async fn test_mutations_are_broadcast() {
    let mut ledger = ledger().await;
    let mut events = ledger.subscribe();

    ledger
        .record_sale(&Actor::user("sara"), BRANCH, sale_draft("ring-925", 1.0, 10.0))
        .await
        .unwrap();

    let event = events.recv().await.unwrap();
    assert_eq!(event.branch_id, BRANCH);
    assert_eq!(event.kind, MutationKind::SaleRecorded);
}
