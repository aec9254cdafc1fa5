//! # Repository Module
//!
//! Database repository implementations for Atlas ERP.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  Calling module / orchestrator                                         │
//! │       │                                                                 │
//! │       │  db.sequences().allocate("InventoryCheckOut")                  │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  SequenceRepository                                                    │
//! │  ├── allocate_next(conn, object_class)   ← inside a caller's tx        │
//! │  ├── allocate(&self, object_class)       ← owns a small tx             │
//! │  └── provision(&self, ...)                                             │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Associated functions taking `&mut SqliteConnection` are the           │
//! │  transaction-composable half: the orchestrator threads ONE             │
//! │  transaction through all of them.                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`sequence::SequenceRepository`] - counter allocation and provisioning
//! - [`reservation::ReservationRepository`] - pool lock/release/claim
//! - [`history::HistoryRepository`] - workflow audit + config versions
//! - [`checkout::CheckOutRepository`] - inventory check-out aggregate
//! - [`invoice::InvoiceRepository`] - purchase invoice aggregate
//! - [`stock::StockRepository`] - stock balance side-effect target

pub mod checkout;
pub mod history;
pub mod invoice;
pub mod reservation;
pub mod sequence;
pub mod stock;
