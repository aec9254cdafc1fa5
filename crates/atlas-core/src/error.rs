//! # Error Types
//!
//! Domain-specific error types for atlas-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  atlas-core errors (this file)                                         │
//! │  └── CoreError        - Workflow / formatting rule violations          │
//! │                                                                         │
//! │  atlas-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  Flow: CoreError → DbError → calling module                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (object type, status, action)
//! 3. Errors are enum variants, never String

use thiserror::Error;

/// Core business logic errors.
///
/// These represent rule violations detected before any storage is touched.
/// An `InvalidTransition` aborts the enclosing save without a single write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The requested (status, action) pair is not in the object type's
    /// transition table.
    ///
    /// ## When This Occurs
    /// - Submitting an already-approved document
    /// - Paying an invoice that was never posted
    /// - Any action the table simply does not define
    #[error("invalid transition for {object_type}: ({current_status}, {action}) is not defined")]
    InvalidTransition {
        object_type: String,
        current_status: String,
        action: String,
    },

    /// No transition table is registered for the object type.
    #[error("no transition table registered for object type: {0}")]
    UnknownObjectType(String),

    /// A transition input (status or action) was empty.
    ///
    /// Empty inputs are rejected up front rather than silently failing a
    /// table lookup.
    #[error("transition field '{field}' must not be empty")]
    EmptyTransitionField { field: &'static str },

    /// A transition-table config document could not be parsed.
    #[error("malformed transition table config: {0}")]
    MalformedTableConfig(String),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = CoreError::InvalidTransition {
            object_type: "Receipt".to_string(),
            current_status: "VOIDED".to_string(),
            action: "SUBMIT".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Receipt"));
        assert!(msg.contains("VOIDED"));
        assert!(msg.contains("SUBMIT"));
    }

    #[test]
    fn test_unknown_object_type_message() {
        let err = CoreError::UnknownObjectType("Mystery".to_string());
        assert_eq!(
            err.to_string(),
            "no transition table registered for object type: Mystery"
        );
    }
}
