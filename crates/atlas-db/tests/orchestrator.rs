//! Orchestrated-save integration tests: the full pipeline over a real
//! SQLite database - allocation, validation, root/children persistence,
//! history, side effects, and all-or-nothing rollback.

use std::sync::Arc;

use uuid::Uuid;

use atlas_core::clock::{Clock, FixedClock};
use atlas_core::sequence::{IntervalScope, SequenceTemplate};
use atlas_core::workflow::{action, object_type, status};
use atlas_core::{
    CheckOutDocument, CheckOutLine, CoreError, PurchaseInvoice, PurchaseInvoiceLine,
    TransitionRegistry, TransitionRequest,
};
use atlas_db::{
    CheckOutRepository, Database, DbConfig, DbError, InvoiceRepository, SaveOrchestrator,
};

const ORG_UNIT: i64 = 1;

fn clock() -> FixedClock {
    FixedClock::at_date(2024, 3, 7)
}

async fn fresh_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// Orchestrator for the check-out module with its counter provisioned.
async fn check_out_orchestrator(db: &Database) -> SaveOrchestrator<CheckOutRepository> {
    db.sequences()
        .provision(
            object_type::INVENTORY_CHECK_OUT,
            IntervalScope::Day {
                year: 2024,
                month: 3,
                day: 7,
            },
            &SequenceTemplate::new("CO-", ""),
            0,
        )
        .await
        .unwrap();

    SaveOrchestrator::new(
        db.clone(),
        db.check_outs(),
        TransitionRegistry::built_in(),
        Arc::new(clock()),
    )
}

/// Orchestrator for the invoice module with a small reservation pool.
async fn invoice_orchestrator(db: &Database, pool_size: i64) -> SaveOrchestrator<InvoiceRepository> {
    if pool_size > 0 {
        db.reservations()
            .populate(object_type::PURCHASE_INVOICE, 1, pool_size)
            .await
            .unwrap();
    }

    SaveOrchestrator::new(
        db.clone(),
        db.invoices(),
        TransitionRegistry::built_in(),
        Arc::new(clock()),
    )
}

// =============================================================================
// Check-out module (counter allocation)
// =============================================================================

#[tokio::test]
async fn submit_and_approve_end_to_end() {
    let db = fresh_db().await;
    let orchestrator = check_out_orchestrator(&db).await;
    let user = Uuid::new_v4();
    let now = clock().now();

    let mut doc = CheckOutDocument::draft(ORG_UNIT, user, now);
    let mut lines = vec![
        CheckOutLine::new("SKU-1", 2, now),
        CheckOutLine::new("SKU-2", 5, now),
    ];
    let request = TransitionRequest::new(
        action::SUBMIT_AND_APPROVE,
        status::DRAFT,
        user,
        ORG_UNIT,
    )
    .with_remark("urgent restock for till 3");

    let outcome = orchestrator.save(&mut doc, &mut lines, &request).await.unwrap();

    // One allocated code of the configured format
    assert_eq!(outcome.business_code, "CO-2403070001");
    assert!(outcome.created);
    assert_eq!(outcome.resulting_status, status::APPROVED);

    // Root row inserted with that code and status
    let stored = db.check_outs().get_by_id(outcome.root_id).await.unwrap().unwrap();
    assert_eq!(stored.code.as_deref(), Some("CO-2403070001"));
    assert_eq!(stored.status, status::APPROVED);
    assert_eq!(stored.requested_by, user);

    // Both child rows reference the root id
    let stored_lines = db.check_outs().get_lines(outcome.root_id).await.unwrap();
    assert_eq!(stored_lines.len(), 2);
    for line in &stored_lines {
        assert_eq!(line.document_id, Some(outcome.root_id));
    }

    // Exactly one history row, DRAFT → APPROVED
    let history = db
        .history()
        .list_for(outcome.root_id, object_type::INVENTORY_CHECK_OUT)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].from_status, status::DRAFT);
    assert_eq!(history[0].to_status, status::APPROVED);
    assert_eq!(history[0].action_code, action::SUBMIT_AND_APPROVE);
    assert_eq!(history[0].remark.as_deref(), Some("urgent restock for till 3"));

    // One stock decrement per child
    assert_eq!(db.stock().level("SKU-1").await.unwrap(), -2);
    assert_eq!(db.stock().level("SKU-2").await.unwrap(), -5);
}

#[tokio::test]
async fn failed_child_rolls_back_root_and_siblings() {
    let db = fresh_db().await;
    let orchestrator = check_out_orchestrator(&db).await;
    let user = Uuid::new_v4();
    let now = clock().now();

    let mut doc = CheckOutDocument::draft(ORG_UNIT, user, now);
    let mut lines = vec![
        CheckOutLine::new("SKU-1", 2, now),
        // Violates the quantity check constraint; fails at child index 1
        CheckOutLine::new("SKU-2", -5, now),
    ];
    let request = TransitionRequest::new(action::SUBMIT, status::DRAFT, user, ORG_UNIT);

    let err = orchestrator.save(&mut doc, &mut lines, &request).await.unwrap_err();
    assert!(matches!(err, DbError::QueryFailed(_)));

    // State before = state after: no root, no sibling line, no history,
    // and the counter increment was rolled back too
    assert_eq!(db.check_outs().count().await.unwrap(), 0);
    assert_eq!(
        db.sequences()
            .current_number(object_type::INVENTORY_CHECK_OUT)
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn invalid_transition_leaves_no_trace() {
    let db = fresh_db().await;
    let orchestrator = check_out_orchestrator(&db).await;
    let user = Uuid::new_v4();
    let now = clock().now();

    let mut doc = CheckOutDocument::draft(ORG_UNIT, user, now);
    let mut lines = vec![CheckOutLine::new("SKU-1", 1, now)];
    // APPROVE is only legal from SUBMITTED
    let request = TransitionRequest::new(action::APPROVE, status::DRAFT, user, ORG_UNIT);

    let err = orchestrator.save(&mut doc, &mut lines, &request).await.unwrap_err();
    assert!(matches!(
        err,
        DbError::Workflow(CoreError::InvalidTransition { .. })
    ));

    assert_eq!(db.check_outs().count().await.unwrap(), 0);
    assert_eq!(
        db.sequences()
            .current_number(object_type::INVENTORY_CHECK_OUT)
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn history_chains_across_saves() {
    let db = fresh_db().await;
    let orchestrator = check_out_orchestrator(&db).await;
    let user = Uuid::new_v4();
    let now = clock().now();

    let mut doc = CheckOutDocument::draft(ORG_UNIT, user, now);
    let mut lines = vec![CheckOutLine::new("SKU-1", 3, now)];

    // First save: DRAFT --SUBMIT--> SUBMITTED (no side effect yet)
    let submit = TransitionRequest::new(action::SUBMIT, status::DRAFT, user, ORG_UNIT);
    let first = orchestrator.save(&mut doc, &mut lines, &submit).await.unwrap();
    assert_eq!(first.resulting_status, status::SUBMITTED);
    assert_eq!(db.stock().level("SKU-1").await.unwrap(), 0);

    // Second save (update path): SUBMITTED --APPROVE--> APPROVED
    let approve = TransitionRequest::new(action::APPROVE, status::SUBMITTED, user, ORG_UNIT);
    let second = orchestrator.save(&mut doc, &mut lines, &approve).await.unwrap();
    assert_eq!(second.root_id, first.root_id);
    assert!(!second.created);
    // The code allocated on the first save survives the update path
    assert_eq!(second.business_code, first.business_code);

    // N transitions → N rows, each from-status = prior to-status
    let history = db
        .history()
        .list_for(first.root_id, object_type::INVENTORY_CHECK_OUT)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].from_status, history[0].to_status);
    assert_eq!(history[1].to_status, status::APPROVED);

    // Side effect fired exactly once, on approval
    assert_eq!(db.stock().level("SKU-1").await.unwrap(), -3);

    // Update path rewrote the line, not duplicated it
    assert_eq!(db.check_outs().get_lines(first.root_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn update_path_inserts_new_children_alongside_existing() {
    let db = fresh_db().await;
    let orchestrator = check_out_orchestrator(&db).await;
    let user = Uuid::new_v4();
    let now = clock().now();

    let mut doc = CheckOutDocument::draft(ORG_UNIT, user, now);
    let mut lines = vec![CheckOutLine::new("SKU-1", 1, now)];

    let submit = TransitionRequest::new(action::SUBMIT, status::DRAFT, user, ORG_UNIT);
    let first = orchestrator.save(&mut doc, &mut lines, &submit).await.unwrap();
    assert!(lines[0].id.is_some());

    // Reject back to draft, add a line, resubmit
    let reject = TransitionRequest::new(action::REJECT, status::SUBMITTED, user, ORG_UNIT);
    orchestrator.save(&mut doc, &mut lines, &reject).await.unwrap();

    lines[0].quantity = 4;
    lines.push(CheckOutLine::new("SKU-3", 2, now));
    let resubmit = TransitionRequest::new(action::SUBMIT, status::REJECTED, user, ORG_UNIT);
    orchestrator.save(&mut doc, &mut lines, &resubmit).await.unwrap();

    let stored_lines = db.check_outs().get_lines(first.root_id).await.unwrap();
    assert_eq!(stored_lines.len(), 2);
    assert_eq!(stored_lines[0].quantity, 4);
    assert_eq!(stored_lines[1].product_code, "SKU-3");

    let history = db
        .history()
        .list_for(first.root_id, object_type::INVENTORY_CHECK_OUT)
        .await
        .unwrap();
    assert_eq!(history.len(), 3);
}

// =============================================================================
// Invoice module (reservation pool)
// =============================================================================

#[tokio::test]
async fn pool_save_claims_number_in_the_same_transaction() {
    let db = fresh_db().await;
    let orchestrator = invoice_orchestrator(&db, 5).await;
    let user = Uuid::new_v4();
    let now = clock().now();

    let mut invoice = PurchaseInvoice::draft("Acme Wholesale", ORG_UNIT, user, now);
    let mut lines = vec![PurchaseInvoiceLine::new("SKU-1", 10, 499, now)];
    let request = TransitionRequest::new(action::POST, status::DRAFT, user, ORG_UNIT);

    let outcome = orchestrator.save(&mut invoice, &mut lines, &request).await.unwrap();

    assert_eq!(outcome.business_code, "00000001");
    assert_eq!(outcome.resulting_status, status::POSTED);

    // The pool row is permanently bound to the new invoice
    let row = db
        .reservations()
        .find_by_number(object_type::PURCHASE_INVOICE, 1)
        .await
        .unwrap()
        .unwrap();
    assert!(row.is_claimed());
    assert_eq!(row.linked_entity_id, Some(outcome.root_id));
    assert_eq!(row.locked_by_user, Some(user));

    // Goods received on posting
    assert_eq!(db.stock().level("SKU-1").await.unwrap(), 10);
}

#[tokio::test]
async fn exhausted_pool_fails_the_save() {
    let db = fresh_db().await;
    let orchestrator = invoice_orchestrator(&db, 0).await;
    let user = Uuid::new_v4();
    let now = clock().now();

    let mut invoice = PurchaseInvoice::draft("Acme Wholesale", ORG_UNIT, user, now);
    let mut lines = vec![PurchaseInvoiceLine::new("SKU-1", 1, 100, now)];
    let request = TransitionRequest::new(action::POST, status::DRAFT, user, ORG_UNIT);

    let err = orchestrator.save(&mut invoice, &mut lines, &request).await.unwrap_err();
    assert!(matches!(err, DbError::PoolExhausted { .. }));
    assert_eq!(db.invoices().count().await.unwrap(), 0);
}

#[tokio::test]
async fn failed_claim_rolls_back_the_invoice_insert() {
    let db = fresh_db().await;
    let orchestrator = invoice_orchestrator(&db, 5).await;
    let reserving_user = Uuid::new_v4();
    let saving_user = Uuid::new_v4();
    let now = clock().now();

    // One user reserved the number, a different user tries to save with it
    let reserved = db
        .reservations()
        .acquire_and_lock(object_type::PURCHASE_INVOICE, reserving_user)
        .await
        .unwrap()
        .unwrap();

    let mut invoice = PurchaseInvoice::draft("Acme Wholesale", ORG_UNIT, saving_user, now);
    invoice.code = Some(format!("{:08}", reserved.number));
    let mut lines = vec![PurchaseInvoiceLine::new("SKU-1", 1, 100, now)];
    let request = TransitionRequest::new(action::POST, status::DRAFT, saving_user, ORG_UNIT);

    let err = orchestrator.save(&mut invoice, &mut lines, &request).await.unwrap_err();
    assert!(matches!(err, DbError::ClaimFailed { .. }));

    // The entity insert rolled back with the claim - no orphaned invoice
    assert_eq!(db.invoices().count().await.unwrap(), 0);
    assert_eq!(db.stock().level("SKU-1").await.unwrap(), 0);

    // The reservation itself is untouched: still locked by its holder
    let row = db
        .reservations()
        .find_by_number(object_type::PURCHASE_INVOICE, reserved.number)
        .await
        .unwrap()
        .unwrap();
    assert!(row.is_locked);
    assert_eq!(row.locked_by_user, Some(reserving_user));
    assert!(!row.is_claimed());
}

#[tokio::test]
async fn paying_a_posted_invoice_does_not_reapply_stock() {
    let db = fresh_db().await;
    let orchestrator = invoice_orchestrator(&db, 5).await;
    let user = Uuid::new_v4();
    let now = clock().now();

    let mut invoice = PurchaseInvoice::draft("Acme Wholesale", ORG_UNIT, user, now);
    let mut lines = vec![PurchaseInvoiceLine::new("SKU-1", 7, 250, now)];

    let post = TransitionRequest::new(action::POST, status::DRAFT, user, ORG_UNIT);
    let posted = orchestrator.save(&mut invoice, &mut lines, &post).await.unwrap();
    assert_eq!(db.stock().level("SKU-1").await.unwrap(), 7);

    let pay = TransitionRequest::new(action::PAY, status::POSTED, user, ORG_UNIT);
    let paid = orchestrator.save(&mut invoice, &mut lines, &pay).await.unwrap();
    assert_eq!(paid.resulting_status, status::PAID);

    // Stock received once, on entry into the posted/paid states
    assert_eq!(db.stock().level("SKU-1").await.unwrap(), 7);

    let history = db
        .history()
        .list_for(posted.root_id, object_type::PURCHASE_INVOICE)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].from_status, history[0].to_status);
}

#[tokio::test]
async fn post_and_pay_shortcut_receives_goods_once() {
    let db = fresh_db().await;
    let orchestrator = invoice_orchestrator(&db, 5).await;
    let user = Uuid::new_v4();
    let now = clock().now();

    let mut invoice = PurchaseInvoice::draft("Acme Wholesale", ORG_UNIT, user, now);
    let mut lines = vec![PurchaseInvoiceLine::new("SKU-9", 4, 1250, now)];
    let request = TransitionRequest::new(action::POST_AND_PAY, status::DRAFT, user, ORG_UNIT);

    let outcome = orchestrator.save(&mut invoice, &mut lines, &request).await.unwrap();
    assert_eq!(outcome.resulting_status, status::PAID);
    assert_eq!(db.stock().level("SKU-9").await.unwrap(), 4);
}
