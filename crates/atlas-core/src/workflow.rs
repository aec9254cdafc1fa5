//! # Workflow Transition Tables
//!
//! Validation of status changes against per-object-type transition tables.
//!
//! ## Table-Driven Validation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Transition Validation                               │
//! │                                                                         │
//! │  validate("InventoryCheckOut", "DRAFT", "SUBMIT_AND_APPROVE")          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  TransitionRegistry                                                    │
//! │  ├── "InventoryCheckOut" ──► TransitionTable                           │
//! │  │                           (DRAFT, SUBMIT)             → SUBMITTED   │
//! │  │                           (DRAFT, SUBMIT_AND_APPROVE) → APPROVED ◄──│
//! │  │                           (SUBMITTED, APPROVE)        → APPROVED    │
//! │  │                           ...                                        │
//! │  ├── "PurchaseInvoice"   ──► TransitionTable                           │
//! │  ├── "Receipt"           ──► TransitionTable                           │
//! │  └── "Employee"          ──► TransitionTable                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Ok("APPROVED")  - or -  Err(InvalidTransition)                        │
//! │                                                                         │
//! │  One generic component, parameterized by lookup tables.                │
//! │  Tables are data: compiled-in defaults or a JSON config document.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each business entity owns its own table; tables are disjoint and looked
//! up by the entity's object-type tag. Every `(status, action)` pair maps to
//! exactly one resulting status or is absent (illegal).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Well-Known Tags
// =============================================================================

/// Object-type tags of the business modules shipping transition tables.
pub mod object_type {
    pub const INVENTORY_CHECK_OUT: &str = "InventoryCheckOut";
    pub const PURCHASE_INVOICE: &str = "PurchaseInvoice";
    pub const RECEIPT: &str = "Receipt";
    pub const EMPLOYEE: &str = "Employee";
}

/// Status tags used by the built-in tables.
///
/// Tables never share state: "DRAFT" in a check-out table and "DRAFT" in an
/// invoice table are unrelated entries under different object types.
pub mod status {
    pub const DRAFT: &str = "DRAFT";
    pub const SUBMITTED: &str = "SUBMITTED";
    pub const APPROVED: &str = "APPROVED";
    pub const REJECTED: &str = "REJECTED";
    pub const CANCELLED: &str = "CANCELLED";
    pub const POSTED: &str = "POSTED";
    pub const PAID: &str = "PAID";
    pub const VOIDED: &str = "VOIDED";
    pub const COMPLETED: &str = "COMPLETED";
    pub const ONBOARDING: &str = "ONBOARDING";
    pub const ACTIVE: &str = "ACTIVE";
    pub const SUSPENDED: &str = "SUSPENDED";
    pub const TERMINATED: &str = "TERMINATED";
}

/// Action tags used by the built-in tables.
pub mod action {
    pub const SUBMIT: &str = "SUBMIT";
    pub const SUBMIT_AND_APPROVE: &str = "SUBMIT_AND_APPROVE";
    pub const APPROVE: &str = "APPROVE";
    pub const REJECT: &str = "REJECT";
    pub const CANCEL: &str = "CANCEL";
    pub const POST: &str = "POST";
    pub const POST_AND_PAY: &str = "POST_AND_PAY";
    pub const PAY: &str = "PAY";
    pub const VOID: &str = "VOID";
    pub const ACTIVATE: &str = "ACTIVATE";
    pub const SUSPEND: &str = "SUSPEND";
    pub const REINSTATE: &str = "REINSTATE";
    pub const TERMINATE: &str = "TERMINATE";
}

// =============================================================================
// Transition Table
// =============================================================================

/// One rule in serialized table form: `from --action--> to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRule {
    pub from: String,
    pub action: String,
    pub to: String,
}

/// Legal transitions for one object type.
///
/// A plain `(current_status, action) → resulting_status` map. Building a
/// table is infallible; a duplicate pair overwrites (last rule wins), which
/// keeps config reloads simple.
#[derive(Debug, Clone, Default)]
pub struct TransitionTable {
    object_type: String,
    rules: HashMap<(String, String), String>,
}

impl TransitionTable {
    /// Creates an empty table for an object type.
    pub fn new(object_type: impl Into<String>) -> Self {
        TransitionTable {
            object_type: object_type.into(),
            rules: HashMap::new(),
        }
    }

    /// Adds a rule (builder style).
    pub fn rule(mut self, from: &str, action: &str, to: &str) -> Self {
        self.rules
            .insert((from.to_string(), action.to_string()), to.to_string());
        self
    }

    /// The object type this table belongs to.
    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    /// Number of rules in the table.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the table has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Looks up the resulting status for a (status, action) pair.
    pub fn resulting_status(&self, current_status: &str, action: &str) -> Option<&str> {
        self.rules
            .get(&(current_status.to_string(), action.to_string()))
            .map(String::as_str)
    }
}

// =============================================================================
// Transition Registry
// =============================================================================

/// All transition tables, keyed by object-type tag.
///
/// ## Construction
/// - [`TransitionRegistry::built_in`] - the compiled-in tables below
/// - [`TransitionRegistry::from_json`] - a config document of the form
///   `{ "ObjectType": [ { "from": .., "action": .., "to": .. }, .. ] }`
///
/// ## Example
/// ```rust
/// use atlas_core::workflow::{action, object_type, status, TransitionRegistry};
///
/// let registry = TransitionRegistry::built_in();
/// let next = registry
///     .validate(object_type::RECEIPT, status::DRAFT, action::SUBMIT)
///     .unwrap();
/// assert_eq!(next, status::COMPLETED);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TransitionRegistry {
    tables: HashMap<String, TransitionTable>,
}

impl TransitionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        TransitionRegistry::default()
    }

    /// Registry loaded with the built-in tables for every shipping module.
    pub fn built_in() -> Self {
        let mut registry = TransitionRegistry::new();
        registry.register(check_out_table());
        registry.register(purchase_invoice_table());
        registry.register(receipt_table());
        registry.register(employee_table());
        registry
    }

    /// Parses a registry from a JSON config document.
    ///
    /// ## Document Shape
    /// ```json
    /// {
    ///   "Receipt": [
    ///     { "from": "DRAFT", "action": "SUBMIT", "to": "COMPLETED" }
    ///   ]
    /// }
    /// ```
    pub fn from_json(document: &str) -> CoreResult<Self> {
        let parsed: HashMap<String, Vec<TransitionRule>> = serde_json::from_str(document)
            .map_err(|e| CoreError::MalformedTableConfig(e.to_string()))?;

        let mut registry = TransitionRegistry::new();
        for (object_type, rules) in parsed {
            let mut table = TransitionTable::new(&object_type);
            for rule in rules {
                table = table.rule(&rule.from, &rule.action, &rule.to);
            }
            registry.register(table);
        }
        Ok(registry)
    }

    /// Registers (or replaces) a table under its object type.
    pub fn register(&mut self, table: TransitionTable) {
        self.tables.insert(table.object_type().to_string(), table);
    }

    /// Returns the table for an object type, if registered.
    pub fn table(&self, object_type: &str) -> Option<&TransitionTable> {
        self.tables.get(object_type)
    }

    /// Validates a requested transition and computes the resulting status.
    ///
    /// ## Errors
    /// - [`CoreError::EmptyTransitionField`] - empty status or action
    /// - [`CoreError::UnknownObjectType`] - no table for the tag
    /// - [`CoreError::InvalidTransition`] - pair absent from the table
    pub fn validate(
        &self,
        object_type: &str,
        current_status: &str,
        action: &str,
    ) -> CoreResult<&str> {
        if object_type.trim().is_empty() {
            return Err(CoreError::EmptyTransitionField {
                field: "object_type",
            });
        }
        if current_status.trim().is_empty() {
            return Err(CoreError::EmptyTransitionField {
                field: "current_status",
            });
        }
        if action.trim().is_empty() {
            return Err(CoreError::EmptyTransitionField { field: "action" });
        }

        let table = self
            .tables
            .get(object_type)
            .ok_or_else(|| CoreError::UnknownObjectType(object_type.to_string()))?;

        table
            .resulting_status(current_status, action)
            .ok_or_else(|| CoreError::InvalidTransition {
                object_type: object_type.to_string(),
                current_status: current_status.to_string(),
                action: action.to_string(),
            })
    }
}

// =============================================================================
// Built-In Tables
// =============================================================================

/// Inventory check-out lifecycle.
///
/// ```text
/// DRAFT ──SUBMIT──► SUBMITTED ──APPROVE──► APPROVED
///   │                   │    └──REJECT──► REJECTED ──SUBMIT──► SUBMITTED
///   │                   └──CANCEL──► CANCELLED
///   ├──SUBMIT_AND_APPROVE──► APPROVED
///   └──CANCEL──► CANCELLED
/// ```
fn check_out_table() -> TransitionTable {
    TransitionTable::new(object_type::INVENTORY_CHECK_OUT)
        .rule(status::DRAFT, action::SUBMIT, status::SUBMITTED)
        .rule(status::DRAFT, action::SUBMIT_AND_APPROVE, status::APPROVED)
        .rule(status::DRAFT, action::CANCEL, status::CANCELLED)
        .rule(status::SUBMITTED, action::APPROVE, status::APPROVED)
        .rule(status::SUBMITTED, action::REJECT, status::REJECTED)
        .rule(status::SUBMITTED, action::CANCEL, status::CANCELLED)
        .rule(status::REJECTED, action::SUBMIT, status::SUBMITTED)
}

/// Purchase invoice lifecycle.
fn purchase_invoice_table() -> TransitionTable {
    TransitionTable::new(object_type::PURCHASE_INVOICE)
        .rule(status::DRAFT, action::POST, status::POSTED)
        .rule(status::DRAFT, action::POST_AND_PAY, status::PAID)
        .rule(status::DRAFT, action::VOID, status::VOIDED)
        .rule(status::POSTED, action::PAY, status::PAID)
        .rule(status::POSTED, action::VOID, status::VOIDED)
}

/// POS receipt lifecycle.
fn receipt_table() -> TransitionTable {
    TransitionTable::new(object_type::RECEIPT)
        .rule(status::DRAFT, action::SUBMIT, status::COMPLETED)
        .rule(status::DRAFT, action::VOID, status::VOIDED)
        .rule(status::COMPLETED, action::VOID, status::VOIDED)
}

/// Employee lifecycle (HR module).
fn employee_table() -> TransitionTable {
    TransitionTable::new(object_type::EMPLOYEE)
        .rule(status::ONBOARDING, action::ACTIVATE, status::ACTIVE)
        .rule(status::ACTIVE, action::SUSPEND, status::SUSPENDED)
        .rule(status::ACTIVE, action::TERMINATE, status::TERMINATED)
        .rule(status::SUSPENDED, action::REINSTATE, status::ACTIVE)
        .rule(status::SUSPENDED, action::TERMINATE, status::TERMINATED)
}

// =============================================================================
// Workflow Aggregate
// =============================================================================

/// The seam between the save orchestrator and a module's root entity.
///
/// Implemented by every document that moves through a workflow. The
/// orchestrator reads the object-type tag to pick the transition table,
/// assigns allocated business codes, and applies the validated status.
pub trait WorkflowAggregate {
    /// Tag selecting the transition table and sequence counter.
    fn object_type(&self) -> &'static str;

    /// Surrogate id; `None` until the root row is persisted.
    fn id(&self) -> Option<i64>;

    /// Records the id generated by the root insert.
    fn set_id(&mut self, id: i64);

    /// Human-readable business code; `None` until allocated.
    fn business_code(&self) -> Option<&str>;

    /// Assigns a freshly allocated business code.
    fn set_business_code(&mut self, code: String);

    /// Current workflow status tag.
    fn status(&self) -> &str;

    /// Applies the validated resulting status.
    fn set_status(&mut self, status: String);

    /// Stamps the aggregate's modification time.
    fn touch(&mut self, at: chrono::DateTime<chrono::Utc>);
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_submit_from_draft_is_legal() {
        let registry = TransitionRegistry::built_in();
        let next = registry
            .validate(object_type::RECEIPT, status::DRAFT, action::SUBMIT)
            .unwrap();
        assert_eq!(next, status::COMPLETED);
    }

    #[test]
    fn test_undefined_pair_is_rejected() {
        let registry = TransitionRegistry::built_in();
        let err = registry
            .validate(object_type::RECEIPT, status::VOIDED, action::SUBMIT)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
    }

    #[test]
    fn test_unknown_object_type_is_rejected() {
        let registry = TransitionRegistry::built_in();
        let err = registry
            .validate("LibraryLoan", status::DRAFT, action::SUBMIT)
            .unwrap_err();
        assert_eq!(err, CoreError::UnknownObjectType("LibraryLoan".to_string()));
    }

    #[test]
    fn test_empty_inputs_are_rejected() {
        let registry = TransitionRegistry::built_in();
        assert!(matches!(
            registry.validate(object_type::RECEIPT, "", action::SUBMIT),
            Err(CoreError::EmptyTransitionField {
                field: "current_status"
            })
        ));
        assert!(matches!(
            registry.validate(object_type::RECEIPT, status::DRAFT, "  "),
            Err(CoreError::EmptyTransitionField { field: "action" })
        ));
    }

    #[test]
    fn test_check_out_submit_and_approve_shortcut() {
        let registry = TransitionRegistry::built_in();
        let next = registry
            .validate(
                object_type::INVENTORY_CHECK_OUT,
                status::DRAFT,
                action::SUBMIT_AND_APPROVE,
            )
            .unwrap();
        assert_eq!(next, status::APPROVED);
    }

    #[test]
    fn test_tables_are_disjoint_across_object_types() {
        let registry = TransitionRegistry::built_in();
        // POST is an invoice action; it must not leak into the check-out table
        assert!(registry
            .validate(object_type::INVENTORY_CHECK_OUT, status::DRAFT, action::POST)
            .is_err());
        assert!(registry
            .validate(object_type::PURCHASE_INVOICE, status::DRAFT, action::POST)
            .is_ok());
    }

    #[test]
    fn test_employee_lifecycle_round_trip() {
        let registry = TransitionRegistry::built_in();
        let mut current = status::ONBOARDING.to_string();
        for (act, expected) in [
            (action::ACTIVATE, status::ACTIVE),
            (action::SUSPEND, status::SUSPENDED),
            (action::REINSTATE, status::ACTIVE),
            (action::TERMINATE, status::TERMINATED),
        ] {
            current = registry
                .validate(object_type::EMPLOYEE, &current, act)
                .unwrap()
                .to_string();
            assert_eq!(current, expected);
        }
    }

    #[test]
    fn test_registry_from_json() {
        let document = r#"
        {
            "LibraryLoan": [
                { "from": "REQUESTED", "action": "ISSUE", "to": "ISSUED" },
                { "from": "ISSUED", "action": "RETURN", "to": "RETURNED" }
            ]
        }
        "#;
        let registry = TransitionRegistry::from_json(document).unwrap();
        assert_eq!(
            registry.validate("LibraryLoan", "REQUESTED", "ISSUE").unwrap(),
            "ISSUED"
        );
        assert!(registry.validate("LibraryLoan", "RETURNED", "ISSUE").is_err());
    }

    #[test]
    fn test_malformed_json_is_reported() {
        let err = TransitionRegistry::from_json("{ not json }").unwrap_err();
        assert!(matches!(err, CoreError::MalformedTableConfig(_)));
    }

    #[test]
    fn test_last_rule_wins_on_duplicate_pair() {
        let table = TransitionTable::new("T")
            .rule("A", "GO", "B")
            .rule("A", "GO", "C");
        assert_eq!(table.resulting_status("A", "GO"), Some("C"));
        assert_eq!(table.len(), 1);
    }
}
