//! # atlas-core: Pure Business Logic for Atlas ERP
//!
//! This crate is the **heart** of the Atlas ERP data-access layer. It contains
//! the business rules shared by every module (POS, inventory, library, HR) as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Atlas ERP Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Calling Modules                                │   │
//! │  │    POS receipts ── inventory check-outs ── invoices ── HR      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ atlas-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │ sequence  │  │ workflow  │  │   types   │  │   clock   │  │   │
//! │  │   │  formats  │  │  tables   │  │ documents │  │ injected  │  │   │
//! │  │   │  codes    │  │ validator │  │   lines   │  │   time    │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    atlas-db (Database Layer)                    │   │
//! │  │        counters, reservation pool, history, orchestration       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`sequence`] - Interval scopes, templates, business-code formatting
//! - [`workflow`] - Transition tables, registry, validator, aggregate trait
//! - [`types`] - Domain types (check-out, invoice, history entry, etc.)
//! - [`clock`] - Injected clock abstraction for deterministic timestamps
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Tables Are Data**: Transition rules are lookups, not per-type classes
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod clock;
pub mod error;
pub mod sequence;
pub mod types;
pub mod workflow;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use atlas_core::TransitionRegistry` instead of
// `use atlas_core::workflow::TransitionRegistry`

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::CoreError;
pub use sequence::{format_code, IntervalScope, SequenceTemplate};
pub use types::*;
pub use workflow::{object_type, TransitionRegistry, TransitionTable, WorkflowAggregate};
