use crate::{
    command::{CommandId, MutationCommand},
    entry::TrackedEntry,
    plan::PlanConfig,
};
use std::fmt::Write as _;

///
/// CommandBatch
///
/// Size-bounded slice of one wave. Append-only while the preparer fills
/// it; frozen once handed to the runner. A batch never spans a wave
/// boundary: correctness over the foreign-key ordering is authoritative,
/// size caps only subdivide further.
///

#[derive(Clone, Debug)]
pub struct CommandBatch {
    wave: usize,
    commands: Vec<CommandId>,
    parameters: usize,
}

impl CommandBatch {
    pub(crate) const fn new(wave: usize) -> Self {
        Self {
            wave,
            commands: Vec::new(),
            parameters: 0,
        }
    }

    /// Append a command unless a cap would be breached; returns false
    /// without mutating state when the caller must open a new batch. A
    /// fresh batch always admits one command, so an oversized command still
    /// ships alone.
    #[must_use]
    pub(crate) fn try_add(
        &mut self,
        id: CommandId,
        parameters: usize,
        config: &PlanConfig,
    ) -> bool {
        if !self.commands.is_empty()
            && (self.commands.len() >= config.max_batch_commands
                || self.parameters + parameters > config.max_batch_parameters)
        {
            return false;
        }
        self.commands.push(id);
        self.parameters += parameters;

        true
    }

    /// Index of the wave this batch belongs to.
    #[must_use]
    pub const fn wave(&self) -> usize {
        self.wave
    }

    #[must_use]
    pub fn commands(&self) -> &[CommandId] {
        &self.commands
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    #[must_use]
    pub const fn parameter_count(&self) -> usize {
        self.parameters
    }
}

///
/// SavePlan
///
/// Arena of prepared commands plus the frozen, ordered batch sequence for
/// one save operation. Owned by the caller and consumed by the runner;
/// never shared across operations.
///

#[derive(Debug)]
pub struct SavePlan<'e, E> {
    pub(crate) commands: Vec<MutationCommand<'e, E>>,
    pub(crate) batches: Vec<CommandBatch>,
    pub(crate) waves: usize,
}

impl<'e, E: TrackedEntry> SavePlan<'e, E> {
    /// Resolve a command by its arena id. Ids handed out by this plan are
    /// always in range.
    #[must_use]
    pub fn command(&self, id: CommandId) -> &MutationCommand<'e, E> {
        &self.commands[id.index()]
    }

    #[must_use]
    pub fn commands(&self) -> &[MutationCommand<'e, E>] {
        &self.commands
    }

    #[must_use]
    pub fn batches(&self) -> &[CommandBatch] {
        &self.batches
    }

    #[must_use]
    pub const fn wave_count(&self) -> usize {
        self.waves
    }

    #[must_use]
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    #[must_use]
    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Deterministic one-line-per-batch description for logging and tests.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for (index, batch) in self.batches.iter().enumerate() {
            let _ = write!(out, "batch {index} (wave {}):", batch.wave());
            for &id in batch.commands() {
                let _ = write!(out, " {}", self.command(id).label());
            }
            out.push('\n');
        }

        out
    }
}
