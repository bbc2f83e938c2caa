
use crate::{
    entry::{EntryRef, EntryState, TrackedEntry},
    error::SaveError,
    model::{ColumnModel, EntityModel, TableIdent, ValueGeneration},
    value::Value,
};
use derive_more::Display;
use std::sync::{Arc, OnceLock};

///
/// CommandId
/// Dense arena index of a command within one save plan.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("#{_0}")]
pub struct CommandId(u32);

impl CommandId {
    pub(crate) fn try_new(index: usize) -> Result<Self, SaveError> {
        u32::try_from(index)
            .map(Self)
            .map_err(|_| SaveError::invariant(format!("command arena overflow at index {index}")))
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

///
/// ColumnModification
/// One column's participation in a command: key condition, written value,
/// and/or read-back of a store-generated value.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ColumnModification {
    pub column: String,
    pub current: Option<Value>,
    pub original: Option<Value>,
    pub is_key: bool,
    pub is_read: bool,
    pub is_write: bool,
}

///
/// MutationCommand
///
/// All pending column-level changes for one logical row. Merges several
/// tracked entries when entity instances share a row (table splitting);
/// merged entries must agree on state, which is fixed at construction and
/// never re-derived.
///

#[derive(Debug)]
pub struct MutationCommand<'e, E> {
    model: Arc<EntityModel>,
    state: EntryState,
    entries: Vec<&'e E>,
    columns: OnceLock<Vec<ColumnModification>>,
}

impl<'e, E: TrackedEntry> MutationCommand<'e, E> {
    pub(crate) fn new(entry: &'e E) -> Self {
        Self {
            model: Arc::clone(entry.model()),
            state: entry.state(),
            entries: vec![entry],
            columns: OnceLock::new(),
        }
    }

    /// Merge another tracked entry into this command's row.
    pub(crate) fn add_entry(&mut self, entry: &'e E) -> Result<(), SaveError> {
        if entry.state() != self.state {
            return Err(SaveError::invariant(format!(
                "entry state {} disagrees with command state {} on {}",
                entry.state(),
                self.state,
                self.model.table,
            )));
        }
        self.entries.push(entry);

        Ok(())
    }

    #[must_use]
    pub fn table(&self) -> &TableIdent {
        &self.model.table
    }

    #[must_use]
    pub const fn model(&self) -> &Arc<EntityModel> {
        &self.model
    }

    #[must_use]
    pub const fn state(&self) -> EntryState {
        self.state
    }

    #[must_use]
    pub fn entries(&self) -> &[&'e E] {
        &self.entries
    }

    #[must_use]
    pub fn entry_refs(&self) -> Vec<EntryRef> {
        self.entries.iter().map(|entry| entry.entry_ref()).collect()
    }

    /// Rows this command is expected to affect when executed.
    #[must_use]
    pub const fn expected_rows(&self) -> u64 {
        1
    }

    /// Column-level view of this command. Pure function of entries and
    /// model; computed once and cached, so repeated calls are identical.
    pub fn column_modifications(&self) -> Result<&[ColumnModification], SaveError> {
        if let Some(columns) = self.columns.get() {
            return Ok(columns.as_slice());
        }
        let computed = self.compute_column_modifications()?;

        Ok(self.columns.get_or_init(|| computed).as_slice())
    }

    /// Packing cost: one parameter per written column plus one per key
    /// column used as a condition (non-insert states). Never zero, so every
    /// command occupies batch capacity.
    pub fn parameter_count(&self) -> Result<usize, SaveError> {
        let modifications = self.column_modifications()?;
        let mut count = modifications.iter().filter(|m| m.is_write).count();
        if self.state != EntryState::Added {
            count += modifications.iter().filter(|m| m.is_key).count();
        }

        Ok(count.max(1))
    }

    /// Diagnostic label, e.g. `Deleted Order[2]`.
    #[must_use]
    pub fn label(&self) -> String {
        match self.entries.first() {
            Some(entry) => format!("{} {}", self.state, entry.entry_ref()),
            None => format!("{} {}", self.state, self.model.table),
        }
    }

    fn compute_column_modifications(&self) -> Result<Vec<ColumnModification>, SaveError> {
        let mut out = Vec::with_capacity(self.model.columns.len());
        for column in &self.model.columns {
            // Merge the column across all entries sharing this row.
            let mut current: Option<Value> = None;
            let mut original: Option<Value> = None;
            let mut modified = false;
            for entry in &self.entries {
                if let Some(value) = entry.current_value(&column.name) {
                    match &current {
                        Some(existing) if *existing != value => {
                            return Err(SaveError::invariant(format!(
                                "conflicting values for column {} on shared row {}",
                                column.name, self.model.table,
                            )));
                        }
                        Some(_) => {}
                        None => current = Some(value),
                    }
                }
                if original.is_none() {
                    original = entry.original_value(&column.name);
                }
                modified = modified || entry.is_modified(&column.name);
            }

            let (is_key, is_read, is_write) = self.column_flags(column, modified);
            if is_key || is_read || is_write {
                out.push(ColumnModification {
                    column: column.name.clone(),
                    current,
                    original,
                    is_key,
                    is_read,
                    is_write,
                });
            }
        }

        Ok(out)
    }

    // Per-state participation flags. Store-generated columns are read back
    // rather than written; deletes carry key conditions only.
    fn column_flags(&self, column: &ColumnModel, modified: bool) -> (bool, bool, bool) {
        match self.state {
            EntryState::Added => {
                let generated = !matches!(column.generation, ValueGeneration::Never);

                (column.is_key, generated, !generated)
            }
            EntryState::Modified => {
                let is_write = modified && !column.is_key;
                let is_read = matches!(column.generation, ValueGeneration::OnAddOrUpdate);

                (column.is_key, is_read, is_write)
            }
            EntryState::Deleted => (column.is_key, false, false),
        }
    }
}
