//! # Domain Types
//!
//! Core domain types shared by the allocation and workflow subsystems.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────────┐  ┌──────────────────┐  ┌──────────────────┐      │
//! │  │ CheckOutDocument │  │ PurchaseInvoice  │  │  ReservedCode    │      │
//! │  │  ──────────────  │  │  ──────────────  │  │  ──────────────  │      │
//! │  │  id (rowid)      │  │  id (rowid)      │  │  object_type     │      │
//! │  │  code (business) │  │  code (business) │  │  number          │      │
//! │  │  status          │  │  status          │  │  is_locked       │      │
//! │  │  lines ▼         │  │  lines ▼         │  │  linked entity   │      │
//! │  │  CheckOutLine    │  │  InvoiceLine     │  └──────────────────┘      │
//! │  └──────────────────┘  └──────────────────┘                            │
//! │                                                                         │
//! │  ┌──────────────────────┐  ┌──────────────────┐                        │
//! │  │ WorkflowHistoryEntry │  │ TransitionRequest│                        │
//! │  │  append-only audit   │  │  action + actor  │                        │
//! │  └──────────────────────┘  └──────────────────┘                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every document has:
//! - `id`: integer rowid - assigned by the database on insert, `None` before
//! - Business code: (check-out number, invoice number) - human-readable,
//!   allocated from a counter or a reservation pool

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::workflow::{object_type, status, WorkflowAggregate};

// =============================================================================
// Reserved Code
// =============================================================================

/// One pre-generated number in a reservation pool.
///
/// ## Lifecycle
/// ```text
/// unlocked ──acquire──► locked-by-user ──claim──► bound to entity (final)
///     ▲                      │
///     └──────release─────────┘
/// ```
/// A row with a non-null entity binding stays locked forever and is never
/// released back to the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ReservedCode {
    /// Row id.
    pub id: i64,

    /// Object type whose pool this number belongs to.
    pub object_type: String,

    /// The reserved numeric value.
    pub number: i64,

    /// Whether a user currently holds (or has claimed) this number.
    pub is_locked: bool,

    /// User the lock is attributed to.
    pub locked_by_user: Option<Uuid>,

    /// Entity this number is permanently bound to, once claimed.
    pub linked_entity_id: Option<i64>,

    /// Type tag of the bound entity.
    pub linked_entity_type: Option<String>,
}

impl ReservedCode {
    /// Whether the number is permanently bound to an entity.
    #[inline]
    pub fn is_claimed(&self) -> bool {
        self.linked_entity_id.is_some()
    }
}

// =============================================================================
// Workflow History
// =============================================================================

/// Immutable audit row recording one executed transition.
///
/// Created exactly once per committed transition, in the same transaction as
/// the entity change; never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct WorkflowHistoryEntry {
    /// Row id; 0 until the recorder persists the entry and assigns it.
    pub id: i64,

    /// Id of the entity that transitioned.
    pub linked_object_id: i64,

    /// Object-type tag of the entity.
    pub linked_object_type: String,

    /// User who performed the action.
    pub user_id: Uuid,

    /// Org unit the action was performed under.
    pub org_unit_id: i64,

    /// Action tag that triggered the transition.
    pub action_code: String,

    /// Status before the transition.
    pub from_status: String,

    /// Status after the transition.
    pub to_status: String,

    /// Free-text remark supplied by the caller.
    pub remark: Option<String>,

    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl WorkflowHistoryEntry {
    /// Builds an unpersisted entry for one transition.
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        linked_object_id: i64,
        linked_object_type: impl Into<String>,
        user_id: Uuid,
        org_unit_id: i64,
        action_code: impl Into<String>,
        from_status: impl Into<String>,
        to_status: impl Into<String>,
        remark: Option<String>,
        at: DateTime<Utc>,
    ) -> Self {
        WorkflowHistoryEntry {
            id: 0,
            linked_object_id,
            linked_object_type: linked_object_type.into(),
            user_id,
            org_unit_id,
            action_code: action_code.into(),
            from_status: from_status.into(),
            to_status: to_status.into(),
            remark,
            created_at: at,
            modified_at: at,
        }
    }
}

// =============================================================================
// Transition Request
// =============================================================================

/// A caller's request to move an entity through its workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRequest {
    /// Action tag to apply (e.g. `SUBMIT_AND_APPROVE`).
    pub action: String,

    /// Status the caller believes the entity is in.
    pub current_status: String,

    /// Authenticated user performing the action.
    pub user_id: Uuid,

    /// Org unit the action is performed under.
    pub org_unit_id: i64,

    /// Optional free-text remark recorded in history.
    pub remark: Option<String>,
}

impl TransitionRequest {
    /// Creates a request with no remark.
    pub fn new(
        action: impl Into<String>,
        current_status: impl Into<String>,
        user_id: Uuid,
        org_unit_id: i64,
    ) -> Self {
        TransitionRequest {
            action: action.into(),
            current_status: current_status.into(),
            user_id,
            org_unit_id,
            remark: None,
        }
    }

    /// Attaches a remark (builder style).
    pub fn with_remark(mut self, remark: impl Into<String>) -> Self {
        self.remark = Some(remark.into());
        self
    }
}

// =============================================================================
// Workflow Config
// =============================================================================

/// One dated version of an object type's workflow configuration.
///
/// Selects which transition table version applies for a given business date.
/// An open-ended version has no `end_date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct WorkflowConfigVersion {
    pub id: i64,
    pub object_class: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub version: String,
}

// =============================================================================
// Inventory Check-Out
// =============================================================================

/// Root of an inventory check-out document (counter-allocated codes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CheckOutDocument {
    /// Row id; `None` until persisted.
    pub id: Option<i64>,

    /// Allocated check-out number; `None` until allocated.
    pub code: Option<String>,

    /// Current workflow status tag.
    pub status: String,

    /// Org unit the stock leaves from.
    pub org_unit_id: i64,

    /// User who requested the check-out.
    pub requested_by: Uuid,

    /// Optional note shown on the document.
    pub note: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CheckOutDocument {
    /// Creates a fresh draft with no code and no id.
    pub fn draft(org_unit_id: i64, requested_by: Uuid, at: DateTime<Utc>) -> Self {
        CheckOutDocument {
            id: None,
            code: None,
            status: status::DRAFT.to_string(),
            org_unit_id,
            requested_by,
            note: None,
            created_at: at,
            updated_at: at,
        }
    }
}

impl WorkflowAggregate for CheckOutDocument {
    fn object_type(&self) -> &'static str {
        object_type::INVENTORY_CHECK_OUT
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn business_code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    fn set_business_code(&mut self, code: String) {
        self.code = Some(code);
    }

    fn status(&self) -> &str {
        &self.status
    }

    fn set_status(&mut self, status: String) {
        self.status = status;
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}

/// One line of a check-out document.
///
/// References the root by foreign id, backfilled only after the root insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CheckOutLine {
    /// Row id; `None` until persisted.
    pub id: Option<i64>,

    /// Root document id; `None` until backfilled.
    pub document_id: Option<i64>,

    /// Product the line moves stock for.
    pub product_code: String,

    /// Units checked out.
    pub quantity: i64,

    pub created_at: DateTime<Utc>,
}

impl CheckOutLine {
    /// Creates an unpersisted line.
    pub fn new(product_code: impl Into<String>, quantity: i64, at: DateTime<Utc>) -> Self {
        CheckOutLine {
            id: None,
            document_id: None,
            product_code: product_code.into(),
            quantity,
            created_at: at,
        }
    }
}

// =============================================================================
// Purchase Invoice
// =============================================================================

/// Root of a purchase invoice (reservation-pool codes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PurchaseInvoice {
    /// Row id; `None` until persisted.
    pub id: Option<i64>,

    /// Invoice number claimed from the reservation pool; `None` until bound.
    pub code: Option<String>,

    /// Current workflow status tag.
    pub status: String,

    /// Supplier the invoice was received from.
    pub supplier: String,

    /// Org unit receiving the goods.
    pub org_unit_id: i64,

    /// User who entered the invoice.
    pub created_by: Uuid,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PurchaseInvoice {
    /// Creates a fresh draft with no code and no id.
    pub fn draft(
        supplier: impl Into<String>,
        org_unit_id: i64,
        created_by: Uuid,
        at: DateTime<Utc>,
    ) -> Self {
        PurchaseInvoice {
            id: None,
            code: None,
            status: status::DRAFT.to_string(),
            supplier: supplier.into(),
            org_unit_id,
            created_by,
            created_at: at,
            updated_at: at,
        }
    }
}

impl WorkflowAggregate for PurchaseInvoice {
    fn object_type(&self) -> &'static str {
        object_type::PURCHASE_INVOICE
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn business_code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    fn set_business_code(&mut self, code: String) {
        self.code = Some(code);
    }

    fn status(&self) -> &str {
        &self.status
    }

    fn set_status(&mut self, status: String) {
        self.status = status;
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}

/// One line of a purchase invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PurchaseInvoiceLine {
    /// Row id; `None` until persisted.
    pub id: Option<i64>,

    /// Root invoice id; `None` until backfilled.
    pub invoice_id: Option<i64>,

    /// Product the line receives stock for.
    pub product_code: String,

    /// Units received.
    pub quantity: i64,

    /// Cost per unit in cents (integer money, no floats).
    pub unit_cost_cents: i64,

    pub created_at: DateTime<Utc>,
}

impl PurchaseInvoiceLine {
    /// Creates an unpersisted line.
    pub fn new(
        product_code: impl Into<String>,
        quantity: i64,
        unit_cost_cents: i64,
        at: DateTime<Utc>,
    ) -> Self {
        PurchaseInvoiceLine {
            id: None,
            invoice_id: None,
            product_code: product_code.into(),
            quantity,
            unit_cost_cents,
            created_at: at,
        }
    }

    /// Line total in cents.
    #[inline]
    pub fn line_total_cents(&self) -> i64 {
        self.quantity * self.unit_cost_cents
    }
}

// =============================================================================
// Stock Balance
// =============================================================================

/// Running stock quantity per product, adjusted only by status-gated side
/// effects (check-out approval decrements, invoice posting increments).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockBalance {
    pub product_code: String,
    pub quantity: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, FixedClock};

    #[test]
    fn test_draft_check_out_starts_without_identity() {
        let now = FixedClock::at_date(2024, 3, 7).now();
        let doc = CheckOutDocument::draft(1, Uuid::new_v4(), now);
        assert!(doc.id.is_none());
        assert!(doc.code.is_none());
        assert_eq!(doc.status, status::DRAFT);
    }

    #[test]
    fn test_aggregate_accessors() {
        let now = FixedClock::at_date(2024, 3, 7).now();
        let mut doc = CheckOutDocument::draft(1, Uuid::new_v4(), now);

        doc.set_business_code("CO-2403070001".to_string());
        doc.set_status(status::APPROVED.to_string());
        doc.set_id(42);

        assert_eq!(doc.business_code(), Some("CO-2403070001"));
        assert_eq!(doc.status(), status::APPROVED);
        assert_eq!(WorkflowAggregate::id(&doc), Some(42));
        assert_eq!(doc.object_type(), object_type::INVENTORY_CHECK_OUT);
    }

    #[test]
    fn test_invoice_line_total() {
        let now = FixedClock::at_date(2024, 3, 7).now();
        let line = PurchaseInvoiceLine::new("SKU-1", 3, 499, now);
        assert_eq!(line.line_total_cents(), 1497);
    }

    #[test]
    fn test_reserved_code_claimed_flag() {
        let unclaimed = ReservedCode {
            id: 1,
            object_type: object_type::PURCHASE_INVOICE.to_string(),
            number: 100,
            is_locked: true,
            locked_by_user: Some(Uuid::new_v4()),
            linked_entity_id: None,
            linked_entity_type: None,
        };
        assert!(!unclaimed.is_claimed());

        let claimed = ReservedCode {
            linked_entity_id: Some(7),
            linked_entity_type: Some(object_type::PURCHASE_INVOICE.to_string()),
            ..unclaimed
        };
        assert!(claimed.is_claimed());
    }

    #[test]
    fn test_history_entry_record_stamps_both_times() {
        let now = FixedClock::at_date(2024, 3, 7).now();
        let entry = WorkflowHistoryEntry::record(
            9,
            object_type::RECEIPT,
            Uuid::new_v4(),
            1,
            "SUBMIT",
            "DRAFT",
            "COMPLETED",
            None,
            now,
        );
        assert_eq!(entry.id, 0);
        assert_eq!(entry.created_at, entry.modified_at);
    }
}
