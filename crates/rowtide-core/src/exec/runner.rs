use crate::{
    entry::{EntryRef, TrackedEntry},
    error::{ConcurrencyConflict, SaveError, StoreFailure, UpdateFailure},
    exec::session::{AsyncStoreSession, BatchView, CancelToken, StoreSession},
    obs::sink::{self, MetricsEvent},
    plan::SavePlan,
};
use derive_more::Display;

///
/// TransactionScope
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransactionScope {
    /// Caller-owned transaction; the runner participates and leaves
    /// commit/rollback decisions to the caller.
    Ambient,
    /// Opened by the runner for the whole batch sequence; committed on
    /// success, rolled back on any failure.
    SelfOpened,
}

///
/// RowsAffected
/// Total affected-row count across all batches, summed per command; used
/// by change tracking to mark entries as persisted.
///

#[derive(Clone, Copy, Debug, Default, Display, Eq, PartialEq)]
#[display("{_0}")]
pub struct RowsAffected(pub u64);

///
/// BatchRunner
///
/// Executes the ordered batch sequence against the store: strictly in
/// sequence order on one exclusively-owned session, inside one ambient or
/// self-opened transaction. Wave order is correctness-critical; batches
/// are never reordered or run concurrently.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct BatchRunner {
    debug: bool,
}

impl BatchRunner {
    #[must_use]
    pub const fn new() -> Self {
        Self { debug: false }
    }

    #[must_use]
    pub const fn with_debug(debug: bool) -> Self {
        Self { debug }
    }

    fn debug_log(&self, s: impl Into<String>) {
        if self.debug {
            println!("[debug] {}", s.into());
        }
    }

    /// Execute `plan` on `session`. Returns the total affected-row count on
    /// success; on failure any self-opened transaction has been rolled back
    /// before the error propagates.
    pub fn execute<E, S>(
        &self,
        session: &mut S,
        plan: &SavePlan<'_, E>,
        cancel: Option<&CancelToken>,
    ) -> Result<RowsAffected, SaveError>
    where
        E: TrackedEntry,
        S: StoreSession<E> + ?Sized,
    {
        if plan.batches().is_empty() {
            return Ok(RowsAffected(0));
        }

        // Phase 1: transaction scope.
        let scope = if session.in_transaction() {
            TransactionScope::Ambient
        } else {
            session
                .begin_transaction()
                .map_err(|failure| update_failure(0, Vec::new(), failure))?;
            TransactionScope::SelfOpened
        };
        self.debug_log(format!(
            "executing {} batch(es) over {} wave(s) ({scope:?})",
            plan.batch_count(),
            plan.wave_count(),
        ));

        // Phase 2: strict-order batch execution.
        let mut total = 0u64;
        let mut batches_run = 0usize;
        let result = run_batches(session, plan, cancel, &mut total, &mut batches_run);

        // Phase 3: settle the transaction.
        match result {
            Ok(()) => {
                if scope == TransactionScope::SelfOpened {
                    if let Err(failure) = session.commit_transaction() {
                        // Best-effort cleanup; the commit failure is the error.
                        let _ = session.rollback_transaction();
                        sink::record(MetricsEvent::SaveFailed);

                        return Err(update_failure(batches_run, Vec::new(), failure).into());
                    }
                }
                self.debug_log(format!("save committed ({total} row(s))"));
                sink::record(MetricsEvent::SaveFinished {
                    batches: u64::try_from(batches_run).unwrap_or(u64::MAX),
                    rows: total,
                });

                Ok(RowsAffected(total))
            }
            Err(err) => {
                if scope == TransactionScope::SelfOpened {
                    let _ = session.rollback_transaction();
                    sink::record(MetricsEvent::TransactionRolledBack);
                }
                sink::record(MetricsEvent::SaveFailed);
                self.debug_log(format!("save failed: {err}"));

                Err(err)
            }
        }
    }

    /// Asynchronous twin of [`Self::execute`], behaviorally identical in
    /// ordering and error semantics.
    pub async fn execute_async<E, S>(
        &self,
        session: &mut S,
        plan: &SavePlan<'_, E>,
        cancel: Option<&CancelToken>,
    ) -> Result<RowsAffected, SaveError>
    where
        E: TrackedEntry + Sync,
        S: AsyncStoreSession<E> + ?Sized,
    {
        if plan.batches().is_empty() {
            return Ok(RowsAffected(0));
        }

        let scope = if session.in_transaction() {
            TransactionScope::Ambient
        } else {
            session
                .begin_transaction()
                .await
                .map_err(|failure| update_failure(0, Vec::new(), failure))?;
            TransactionScope::SelfOpened
        };
        self.debug_log(format!(
            "executing {} batch(es) over {} wave(s) ({scope:?})",
            plan.batch_count(),
            plan.wave_count(),
        ));

        let mut total = 0u64;
        let mut batches_run = 0usize;
        let result = run_batches_async(session, plan, cancel, &mut total, &mut batches_run).await;

        match result {
            Ok(()) => {
                if scope == TransactionScope::SelfOpened {
                    if let Err(failure) = session.commit_transaction().await {
                        let _ = session.rollback_transaction().await;
                        sink::record(MetricsEvent::SaveFailed);

                        return Err(update_failure(batches_run, Vec::new(), failure).into());
                    }
                }
                self.debug_log(format!("save committed ({total} row(s))"));
                sink::record(MetricsEvent::SaveFinished {
                    batches: u64::try_from(batches_run).unwrap_or(u64::MAX),
                    rows: total,
                });

                Ok(RowsAffected(total))
            }
            Err(err) => {
                if scope == TransactionScope::SelfOpened {
                    let _ = session.rollback_transaction().await;
                    sink::record(MetricsEvent::TransactionRolledBack);
                }
                sink::record(MetricsEvent::SaveFailed);
                self.debug_log(format!("save failed: {err}"));

                Err(err)
            }
        }
    }
}

fn run_batches<E, S>(
    session: &mut S,
    plan: &SavePlan<'_, E>,
    cancel: Option<&CancelToken>,
    total: &mut u64,
    batches_run: &mut usize,
) -> Result<(), SaveError>
where
    E: TrackedEntry,
    S: StoreSession<E> + ?Sized,
{
    for (batch_index, batch) in plan.batches().iter().enumerate() {
        // Cancellation is checked between batches only, never mid-batch.
        if cancel.is_some_and(CancelToken::is_cancelled) {
            return Err(SaveError::Cancelled {
                batches_run: *batches_run,
                batches_total: plan.batch_count(),
            });
        }

        let view = BatchView::new(plan, batch);
        let counts = session
            .execute_batch(&view)
            .map_err(|failure| update_failure(batch_index, batch_entry_refs(plan, batch), failure))?;

        settle_batch(plan, batch, &counts, total)?;
        *batches_run += 1;
        sink::record(MetricsEvent::BatchExecuted {
            commands: u64::try_from(batch.len()).unwrap_or(u64::MAX),
            rows: counts.iter().copied().sum(),
        });
    }

    Ok(())
}

async fn run_batches_async<E, S>(
    session: &mut S,
    plan: &SavePlan<'_, E>,
    cancel: Option<&CancelToken>,
    total: &mut u64,
    batches_run: &mut usize,
) -> Result<(), SaveError>
where
    E: TrackedEntry + Sync,
    S: AsyncStoreSession<E> + ?Sized,
{
    for (batch_index, batch) in plan.batches().iter().enumerate() {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            return Err(SaveError::Cancelled {
                batches_run: *batches_run,
                batches_total: plan.batch_count(),
            });
        }

        let view = BatchView::new(plan, batch);
        let counts = session
            .execute_batch(&view)
            .await
            .map_err(|failure| update_failure(batch_index, batch_entry_refs(plan, batch), failure))?;

        settle_batch(plan, batch, &counts, total)?;
        *batches_run += 1;
        sink::record(MetricsEvent::BatchExecuted {
            commands: u64::try_from(batch.len()).unwrap_or(u64::MAX),
            rows: counts.iter().copied().sum(),
        });
    }

    Ok(())
}

// Attribute per-command affected counts; a command expecting rows that
// reports fewer is a concurrency conflict naming that command's entries.
fn settle_batch<E: TrackedEntry>(
    plan: &SavePlan<'_, E>,
    batch: &crate::plan::CommandBatch,
    counts: &[u64],
    total: &mut u64,
) -> Result<(), SaveError> {
    if counts.len() != batch.len() {
        return Err(SaveError::invariant(format!(
            "store reported {} row count(s) for a batch of {} command(s)",
            counts.len(),
            batch.len(),
        )));
    }

    for (slot, &id) in batch.commands().iter().enumerate() {
        let command = plan.command(id);
        let expected = command.expected_rows();
        let actual = counts[slot];
        if actual < expected {
            sink::record(MetricsEvent::ConflictDetected);

            return Err(ConcurrencyConflict {
                table: command.table().clone(),
                entries: command.entry_refs(),
                expected,
                actual,
                applied: *total + counts.iter().copied().sum::<u64>(),
            }
            .into());
        }
    }
    *total += counts.iter().copied().sum::<u64>();

    Ok(())
}

fn batch_entry_refs<E: TrackedEntry>(
    plan: &SavePlan<'_, E>,
    batch: &crate::plan::CommandBatch,
) -> Vec<EntryRef> {
    batch
        .commands()
        .iter()
        .flat_map(|&id| plan.command(id).entry_refs())
        .collect()
}

fn update_failure(batch_index: usize, entries: Vec<EntryRef>, source: StoreFailure) -> UpdateFailure {
    UpdateFailure {
        batch_index,
        entries,
        source,
    }
}
