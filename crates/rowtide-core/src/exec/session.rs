use crate::{
    command::MutationCommand,
    entry::TrackedEntry,
    error::StoreFailure,
    plan::{CommandBatch, SavePlan},
};
use async_trait::async_trait;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

///
/// BatchView
///
/// Frozen view of one executable batch handed to the session. Statement
/// generation reads the commands in batch order; the pipeline never sees
/// the generated statement, only the per-command affected-row counts.
///

pub struct BatchView<'p, 'e, E> {
    plan: &'p SavePlan<'e, E>,
    batch: &'p CommandBatch,
}

impl<'p, 'e, E: TrackedEntry> BatchView<'p, 'e, E> {
    pub(crate) const fn new(plan: &'p SavePlan<'e, E>, batch: &'p CommandBatch) -> Self {
        Self { plan, batch }
    }

    #[must_use]
    pub const fn batch(&self) -> &CommandBatch {
        self.batch
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.batch.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }

    /// Commands of this batch, in execution order.
    pub fn commands(&self) -> impl Iterator<Item = &'p MutationCommand<'e, E>> + '_ {
        self.batch
            .commands()
            .iter()
            .map(move |&id| self.plan.command(id))
    }
}

///
/// StoreSession
///
/// Connection, transaction, and statement-generation boundary for one save
/// operation. Exclusively owned by the runner for the operation's
/// duration. `execute_batch` returns affected rows per command, in batch
/// order.
///

pub trait StoreSession<E: TrackedEntry> {
    /// True when a transaction is already active (ambient); the runner
    /// then participates and never commits or rolls it back itself.
    fn in_transaction(&self) -> bool;

    fn begin_transaction(&mut self) -> Result<(), StoreFailure>;

    fn commit_transaction(&mut self) -> Result<(), StoreFailure>;

    fn rollback_transaction(&mut self) -> Result<(), StoreFailure>;

    fn execute_batch(&mut self, batch: &BatchView<'_, '_, E>) -> Result<Vec<u64>, StoreFailure>;
}

///
/// AsyncStoreSession
///
/// Asynchronous twin of [`StoreSession`] with identical ordering and error
/// semantics; only the suspension behavior differs.
///

#[async_trait]
pub trait AsyncStoreSession<E: TrackedEntry + Sync>: Send {
    fn in_transaction(&self) -> bool;

    async fn begin_transaction(&mut self) -> Result<(), StoreFailure>;

    async fn commit_transaction(&mut self) -> Result<(), StoreFailure>;

    async fn rollback_transaction(&mut self) -> Result<(), StoreFailure>;

    async fn execute_batch(
        &mut self,
        batch: &BatchView<'_, '_, E>,
    ) -> Result<Vec<u64>, StoreFailure>;
}

///
/// CancelToken
///
/// Cooperative cancellation flag. The runner checks it between batches
/// only; a cancelled save rolls back its self-opened transaction and
/// reports a cancellation outcome distinct from a store failure.
///

#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
