//! # Transactional Save Orchestration
//!
//! The single-transaction save every module goes through: allocate a code,
//! validate the workflow transition, persist root and children, record
//! history, apply status-gated side effects, commit.
//!
//! ## Save Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  One Save = One Transaction                             │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    │                                                                    │
//! │    ├─ 1. Allocate business code (if root has none)                     │
//! │    │     Counter strategy  → UPDATE..RETURNING on sequence_counters    │
//! │    │     Pool strategy     → lock lowest free reserved number          │
//! │    │                                                                    │
//! │    ├─ 2. Validate (current_status, action) against transition table    │
//! │    │     Illegal pair → abort before any write                         │
//! │    │                                                                    │
//! │    ├─ 3. Insert root (or update on the update path) → root id          │
//! │    │                                                                    │
//! │    ├─ 4. Claim reserved number for the new root id (pool strategy)     │
//! │    │     Claim misses → whole save rolls back, root included           │
//! │    │                                                                    │
//! │    ├─ 5. Backfill root id into children, persist each in order         │
//! │    │     Any child failure → whole save rolls back                     │
//! │    │                                                                    │
//! │    ├─ 6. Append workflow history row (from → to)                       │
//! │    │                                                                    │
//! │    ├─ 7. Resulting status entered the trigger set?                     │
//! │    │     → apply side effect (stock adjustment) per child              │
//! │    │                                                                    │
//! │  COMMIT   (any error above: transaction drops → automatic rollback)    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No operation here spans two transactions, no lock or reservation survives
//! past the commit/rollback, and no retry happens internally - retry policy
//! belongs to the caller.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqliteConnection;
use tracing::{debug, info};

use atlas_core::sequence::{format_code, IntervalScope, SequenceTemplate};
use atlas_core::{Clock, TransitionRegistry, TransitionRequest, WorkflowAggregate, WorkflowHistoryEntry};

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::history::HistoryRepository;
use crate::repository::reservation::ReservationRepository;
use crate::repository::sequence::SequenceRepository;

// =============================================================================
// Aggregate Store
// =============================================================================

/// How a module obtains business codes for new documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationStrategy {
    /// Increment the object class's current sequence counter.
    Counter,
    /// Claim a number from the pre-populated reservation pool.
    ReservationPool,
}

/// Per-module persistence seam the orchestrator drives.
///
/// A store knows how to write its own root and child rows and what its
/// status-gated side effect is; the orchestrator owns ordering, code
/// allocation, validation, history, and the transaction.
#[async_trait]
pub trait AggregateStore: Send + Sync {
    /// Root document type.
    type Root: WorkflowAggregate + Send + Sync;

    /// Child row type.
    type Child: Send + Sync;

    /// Code allocation strategy for new roots.
    fn allocation(&self) -> AllocationStrategy;

    /// Statuses whose entry triggers the side effect.
    fn side_effect_statuses(&self) -> &[&str];

    /// Inserts the root row, returning the generated id.
    async fn insert_root(&self, conn: &mut SqliteConnection, root: &Self::Root) -> DbResult<i64>;

    /// Updates the root row in place.
    async fn update_root(&self, conn: &mut SqliteConnection, root: &Self::Root) -> DbResult<()>;

    /// Backfills the root id into one child and inserts or updates it.
    async fn persist_child(
        &self,
        conn: &mut SqliteConnection,
        root_id: i64,
        child: &mut Self::Child,
    ) -> DbResult<()>;

    /// Applies the side effect for one child (e.g. a stock adjustment).
    async fn apply_side_effect(
        &self,
        conn: &mut SqliteConnection,
        root: &Self::Root,
        child: &Self::Child,
    ) -> DbResult<()>;
}

// =============================================================================
// Save Outcome
// =============================================================================

/// What a committed save produced.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SaveOutcome {
    /// Root row id (fresh on the insert path).
    pub root_id: i64,

    /// Business code on the root after the save.
    pub business_code: String,

    /// Status the transition produced.
    pub resulting_status: String,

    /// Id of the history row recording the transition.
    pub history_id: i64,

    /// Whether the root was inserted (vs updated).
    pub created: bool,
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Drives the save pipeline for one module's aggregate.
///
/// ## Usage
/// ```rust,ignore
/// let orchestrator = SaveOrchestrator::new(
///     db.clone(),
///     db.check_outs(),
///     TransitionRegistry::built_in(),
///     Arc::new(SystemClock),
/// );
///
/// let mut doc = CheckOutDocument::draft(org_unit, user, clock.now());
/// let mut lines = vec![CheckOutLine::new("SKU-1", 2, clock.now())];
/// let request = TransitionRequest::new("SUBMIT_AND_APPROVE", "DRAFT", user, org_unit);
///
/// let outcome = orchestrator.save(&mut doc, &mut lines, &request).await?;
/// ```
pub struct SaveOrchestrator<S> {
    db: Database,
    store: S,
    registry: TransitionRegistry,
    clock: Arc<dyn Clock>,
}

impl<S: AggregateStore> SaveOrchestrator<S> {
    /// Creates an orchestrator for one module.
    pub fn new(db: Database, store: S, registry: TransitionRegistry, clock: Arc<dyn Clock>) -> Self {
        SaveOrchestrator {
            db,
            store,
            registry,
            clock,
        }
    }

    /// The module store this orchestrator drives.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Saves the aggregate and applies the requested workflow transition,
    /// all inside one transaction.
    ///
    /// Insert path and update path are the same pipeline; which one runs is
    /// decided by whether the root already has an id.
    ///
    /// ## Errors
    /// Every failure - allocation, validation, persistence, history, side
    /// effect - aborts the entire transaction before it is re-raised. The
    /// database state after an error is exactly the state before the call.
    pub async fn save(
        &self,
        root: &mut S::Root,
        children: &mut [S::Child],
        request: &TransitionRequest,
    ) -> DbResult<SaveOutcome> {
        let now = self.clock.now();
        let created = root.id().is_none();
        let object_type = root.object_type();

        debug!(
            object_type = %object_type,
            action = %request.action,
            created = created,
            "Starting orchestrated save"
        );

        let mut tx = self.db.begin().await?;

        // ---------------------------------------------------------------------
        // 1. Business code allocation
        // ---------------------------------------------------------------------
        // `claim_number` carries a reserved number through to step 4, where
        // the freshly inserted root id becomes available to bind it to.
        let mut claim_number: Option<i64> = None;
        let existing_code: Option<String> = root.business_code().map(str::to_string);

        match existing_code {
            None => match self.store.allocation() {
                AllocationStrategy::Counter => {
                    let allocation = SequenceRepository::allocate_next(&mut tx, object_type).await?;
                    root.set_business_code(allocation.code);
                }
                AllocationStrategy::ReservationPool => {
                    let reserved =
                        ReservationRepository::acquire_and_lock_on(&mut tx, object_type, request.user_id)
                            .await?
                            .ok_or_else(|| DbError::PoolExhausted {
                                object_type: object_type.to_string(),
                            })?;
                    claim_number = Some(reserved.number);
                    root.set_business_code(format_pool_code(reserved.number));
                }
            },
            Some(code) => {
                // A pre-reserved pool code on a new document still needs
                // claiming once the root row exists.
                if created && self.store.allocation() == AllocationStrategy::ReservationPool {
                    claim_number = Some(parse_pool_code(&code)?);
                }
            }
        }

        // ---------------------------------------------------------------------
        // 2. Transition validation (before any root/child write)
        // ---------------------------------------------------------------------
        let resulting_status = self
            .registry
            .validate(object_type, &request.current_status, &request.action)?
            .to_string();

        // ---------------------------------------------------------------------
        // 3. Persist root
        // ---------------------------------------------------------------------
        root.set_status(resulting_status.clone());
        root.touch(now);

        let root_id = match root.id() {
            None => {
                let id = self.store.insert_root(&mut tx, root).await?;
                root.set_id(id);
                id
            }
            Some(id) => {
                self.store.update_root(&mut tx, root).await?;
                id
            }
        };

        // ---------------------------------------------------------------------
        // 4. Claim reserved number (pool strategy only)
        // ---------------------------------------------------------------------
        if let Some(number) = claim_number {
            let claimed = ReservationRepository::claim(
                &mut tx,
                object_type,
                number,
                root_id,
                object_type,
                request.user_id,
            )
            .await?;

            if !claimed {
                // Rolls back the root insert along with it; an entity is
                // never committed without its durably claimed code.
                return Err(DbError::ClaimFailed {
                    code: root.business_code().unwrap_or_default().to_string(),
                });
            }
        }

        // ---------------------------------------------------------------------
        // 5. Children: backfill root id, persist in order
        // ---------------------------------------------------------------------
        for child in children.iter_mut() {
            self.store.persist_child(&mut tx, root_id, child).await?;
        }

        // ---------------------------------------------------------------------
        // 6. History row
        // ---------------------------------------------------------------------
        let entry = WorkflowHistoryEntry::record(
            root_id,
            object_type,
            request.user_id,
            request.org_unit_id,
            request.action.as_str(),
            request.current_status.as_str(),
            resulting_status.as_str(),
            request.remark.clone(),
            now,
        );
        let history_id = HistoryRepository::append(&mut tx, &entry).await?;

        // ---------------------------------------------------------------------
        // 7. Status-gated side effects
        // ---------------------------------------------------------------------
        // Fire only on ENTERING the trigger set; a save that stays inside it
        // (e.g. POSTED → PAID) must not re-apply stock.
        let triggers = self.store.side_effect_statuses();
        let entered = triggers.contains(&resulting_status.as_str())
            && !triggers.contains(&request.current_status.as_str());

        if entered {
            for child in children.iter() {
                self.store.apply_side_effect(&mut tx, root, child).await?;
            }
        }

        // ---------------------------------------------------------------------
        // 8. Commit
        // ---------------------------------------------------------------------
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            object_type = %object_type,
            root_id = root_id,
            code = %root.business_code().unwrap_or_default(),
            status = %resulting_status,
            side_effects = entered,
            "Save committed"
        );

        Ok(SaveOutcome {
            root_id,
            business_code: root.business_code().unwrap_or_default().to_string(),
            resulting_status,
            history_id,
            created,
        })
    }
}

// =============================================================================
// Pool Code Rendering
// =============================================================================

/// Renders a reserved pool number the same way an unscoped counter would.
pub fn format_pool_code(number: i64) -> String {
    format_code(&SequenceTemplate::bare(), IntervalScope::None, number)
}

/// Recovers the reserved number from a pool-rendered code.
fn parse_pool_code(code: &str) -> DbResult<i64> {
    code.trim().parse::<i64>().map_err(|_| DbError::ClaimFailed {
        code: code.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_code_round_trip() {
        assert_eq!(format_pool_code(42), "00000042");
        assert_eq!(parse_pool_code("00000042").unwrap(), 42);
    }

    #[test]
    fn test_non_numeric_pool_code_is_a_failed_claim() {
        assert!(matches!(
            parse_pool_code("CO-123"),
            Err(DbError::ClaimFailed { .. })
        ));
    }
}
