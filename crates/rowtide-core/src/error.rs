use crate::{entry::EntryRef, model::TableIdent};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// SaveError
///
/// Failure surface of one save operation. Every variant is a
/// distinguishable outcome so higher layers can retry the operation,
/// resolve conflicts per row, or surface a user-facing message; nothing in
/// the pipeline swallows an error.
///

#[derive(Debug, ThisError)]
pub enum SaveError {
    /// Internal pipeline invariant broke; fatal and never retried.
    #[error("invariant violation: {message}")]
    InvariantViolation { message: String },

    /// The pending mutation set has no valid ordering.
    #[error(transparent)]
    CyclicDependency(#[from] CyclicDependencyError),

    /// A command's expected affected-row count did not match the store's.
    #[error(transparent)]
    Conflict(#[from] ConcurrencyConflict),

    /// Store-level failure during batch execution, after any self-opened
    /// transaction was rolled back.
    #[error(transparent)]
    Update(#[from] UpdateFailure),

    /// Cooperative cancellation observed between batches.
    #[error("save cancelled after {batches_run} of {batches_total} batch(es)")]
    Cancelled {
        batches_run: usize,
        batches_total: usize,
    },
}

impl SaveError {
    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }
}

///
/// CyclicDependencyError
///
/// Reported before anything touches the store; the caller may retry after
/// breaking the cycle (e.g. nulling a reference first). No automatic
/// resolution is attempted.
///

#[derive(Clone, Debug, ThisError)]
#[error(
    "unresolvable dependency cycle among {} command(s); implicated foreign keys: [{}]",
    .commands.len(),
    .foreign_keys.join(", ")
)]
pub struct CyclicDependencyError {
    /// Labels of the commands trapped in the residual cycle, arena order.
    pub commands: Vec<String>,
    /// Distinct foreign keys forcing the unresolvable ordering.
    pub foreign_keys: Vec<String>,
}

///
/// ConcurrencyConflict
///
/// The row was concurrently modified or deleted: a command expecting N
/// affected rows saw fewer. Surfaced per entry so change tracking can
/// reload, overwrite, or abort on a per-row basis.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, ThisError)]
#[error(
    "concurrency conflict on {table}: expected {expected} affected row(s), store reported {actual}"
)]
pub struct ConcurrencyConflict {
    pub table: TableIdent,
    /// Entries contributing to the offending command.
    pub entries: Vec<EntryRef>,
    pub expected: u64,
    pub actual: u64,
    /// Rows the store applied before the conflict surfaced, including other
    /// commands of the same batch.
    pub applied: u64,
}

///
/// StoreFailure
///
/// Store-level failure reported by the session collaborator (constraint
/// violation, connectivity loss, timeout). Opaque to this pipeline.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("{message}")]
pub struct StoreFailure {
    pub message: String,
}

impl StoreFailure {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

///
/// UpdateFailure
///
/// A store failure with batch attribution. Any transaction the runner
/// opened itself has been rolled back before this propagates.
///

#[derive(Clone, Debug, ThisError)]
#[error("update failed in batch {batch_index}: {source}")]
pub struct UpdateFailure {
    pub batch_index: usize,
    /// Entries of the failed batch, for attribution.
    pub entries: Vec<EntryRef>,
    #[source]
    pub source: StoreFailure,
}
