//! # atlas-db: Database Layer for Atlas ERP
//!
//! This crate provides database access for the Atlas ERP data-access layer:
//! business-code allocation, workflow transition processing, and the
//! single-transaction save orchestration shared by every module.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Atlas ERP Data Flow                              │
//! │                                                                         │
//! │  Calling module (submit check-out, post invoice, ...)                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     atlas-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌────────────────┐   ┌───────────────┐  │   │
//! │  │   │   Database    │   │  Repositories  │   │ Orchestrator  │  │   │
//! │  │   │   (pool.rs)   │   │ sequence/pool/ │   │ one save =    │  │   │
//! │  │   │               │   │ history/stock  │   │ one tx        │  │   │
//! │  │   │ SqlitePool    │◄──│ checkout/      │◄──│ allocate →    │  │   │
//! │  │   │ Migrations    │   │ invoice        │   │ validate →    │  │   │
//! │  │   └───────────────┘   └────────────────┘   │ persist →     │  │   │
//! │  │                                            │ history →     │  │   │
//! │  │                                            │ side effects  │  │   │
//! │  │                                            └───────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database (WAL mode, foreign keys on)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//! - [`orchestrator`] - Transactional save orchestration
//!
//! ## Usage
//!
//! ```rust,ignore
//! use atlas_db::{Database, DbConfig};
//!
//! // Create database with default config
//! let db = Database::new(DbConfig::new("path/to/atlas.db")).await?;
//!
//! // Allocate a business code
//! let allocation = db.sequences().allocate("InventoryCheckOut").await?;
//!
//! // Or run a full orchestrated save (see orchestrator docs)
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod orchestrator;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use orchestrator::{AggregateStore, AllocationStrategy, SaveOrchestrator, SaveOutcome};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::checkout::CheckOutRepository;
pub use repository::history::HistoryRepository;
pub use repository::invoice::InvoiceRepository;
pub use repository::reservation::ReservationRepository;
pub use repository::sequence::{Allocation, SequenceRepository};
pub use repository::stock::StockRepository;
