//! Shared test fixtures: entity models, tracked entries, and an in-memory
//! store session with snapshot transactions and fault injection.

use crate::{
    command::MutationCommand,
    entry::{EntryState, TrackedEntry},
    error::StoreFailure,
    exec::{AsyncStoreSession, BatchView, CancelToken, StoreSession},
    model::{ColumnModel, EntityModel, TableIdent},
    value::{KeyValue, Value, ValueSource},
};
use async_trait::async_trait;
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

/// Entity model with `key` as the single primary-key column followed by
/// plain columns; table name mirrors the entity name.
pub(crate) fn entity(name: &str, key: &str, columns: &[&str]) -> EntityModel {
    let mut cols = vec![ColumnModel::key(key)];
    cols.extend(columns.iter().map(|column| ColumnModel::new(*column)));

    EntityModel {
        entity_name: name.to_string(),
        table: TableIdent::new(name),
        columns: cols,
        primary_key: vec![key.to_string()],
        foreign_keys: Vec::new(),
        referencing_keys: Vec::new(),
    }
}

fn to_map(values: &[(&str, Value)]) -> BTreeMap<String, Value> {
    values
        .iter()
        .map(|(column, value)| ((*column).to_string(), value.clone()))
        .collect()
}

///
/// TestEntry
///

#[derive(Clone, Debug)]
pub(crate) struct TestEntry {
    model: Arc<EntityModel>,
    state: EntryState,
    current: BTreeMap<String, Value>,
    original: BTreeMap<String, Value>,
    modified: BTreeSet<String>,
}

impl TestEntry {
    pub fn added(model: &Arc<EntityModel>, values: &[(&str, Value)]) -> Self {
        Self {
            model: Arc::clone(model),
            state: EntryState::Added,
            current: to_map(values),
            original: BTreeMap::new(),
            modified: BTreeSet::new(),
        }
    }

    pub fn deleted(model: &Arc<EntityModel>, values: &[(&str, Value)]) -> Self {
        Self {
            model: Arc::clone(model),
            state: EntryState::Deleted,
            current: BTreeMap::new(),
            original: to_map(values),
            modified: BTreeSet::new(),
        }
    }

    /// Columns absent from `original` fall back to their current values;
    /// `modified` lists the columns with a pending literal write.
    pub fn modified(
        model: &Arc<EntityModel>,
        current: &[(&str, Value)],
        original: &[(&str, Value)],
        modified: &[&str],
    ) -> Self {
        Self {
            model: Arc::clone(model),
            state: EntryState::Modified,
            current: to_map(current),
            original: to_map(original),
            modified: modified.iter().map(|column| (*column).to_string()).collect(),
        }
    }
}

impl TrackedEntry for TestEntry {
    fn model(&self) -> &Arc<EntityModel> {
        &self.model
    }

    fn state(&self) -> EntryState {
        self.state
    }

    fn current_value(&self, column: &str) -> Option<Value> {
        self.current.get(column).cloned()
    }

    fn original_value(&self, column: &str) -> Option<Value> {
        match self.state {
            EntryState::Added => None,
            _ => self
                .original
                .get(column)
                .cloned()
                .or_else(|| self.current.get(column).cloned()),
        }
    }

    fn is_modified(&self, column: &str) -> bool {
        self.modified.contains(column)
    }
}

type Row = BTreeMap<String, Value>;
type RowKey = (TableIdent, KeyValue);

///
/// MemoryStore
///
/// In-memory session: applies commands to a row map, snapshot-based
/// transactions, fault injection per batch ordinal, and forced
/// zero-affected-rows per row for conflict tests.
///

#[derive(Clone, Debug, Default)]
pub(crate) struct MemoryStore {
    rows: BTreeMap<RowKey, Row>,
    snapshot: Option<BTreeMap<RowKey, Row>>,
    pub fail_on_batch: Option<usize>,
    pub conflicting_rows: BTreeSet<RowKey>,
    pub cancel_on_batch: Option<(usize, CancelToken)>,
    pub executed_batches: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_row(&mut self, table: &TableIdent, key: KeyValue) {
        self.rows.insert((table.clone(), key), BTreeMap::new());
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn contains(&self, table: &TableIdent, key: &KeyValue) -> bool {
        self.rows.contains_key(&(table.clone(), key.clone()))
    }

    /// Open a caller-owned transaction for ambient-participation tests.
    pub fn begin_ambient(&mut self) {
        self.snapshot = Some(self.rows.clone());
    }

    fn apply_command(
        &mut self,
        command: &MutationCommand<'_, TestEntry>,
    ) -> Result<u64, StoreFailure> {
        let state = command.state();
        let source = if state == EntryState::Deleted {
            ValueSource::Original
        } else {
            ValueSource::Current
        };
        let key = command
            .entries()
            .first()
            .and_then(|entry| entry.primary_key(source))
            .unwrap_or(KeyValue::Scalar(Value::None));
        let slot = (command.table().clone(), key);
        if self.conflicting_rows.contains(&slot) {
            return Ok(0);
        }
        let modifications = command
            .column_modifications()
            .map_err(|err| StoreFailure::new(err.to_string()))?;

        match state {
            EntryState::Added => {
                let mut row = Row::new();
                for modification in modifications {
                    if modification.is_write || modification.is_key {
                        if let Some(value) = modification.current.clone() {
                            row.insert(modification.column.clone(), value);
                        }
                    }
                }
                self.rows.insert(slot, row);

                Ok(1)
            }
            EntryState::Modified => match self.rows.get_mut(&slot) {
                Some(row) => {
                    for modification in modifications {
                        if modification.is_write {
                            if let Some(value) = modification.current.clone() {
                                row.insert(modification.column.clone(), value);
                            }
                        }
                    }

                    Ok(1)
                }
                None => Ok(0),
            },
            EntryState::Deleted => Ok(u64::from(self.rows.remove(&slot).is_some())),
        }
    }

    fn run_batch(
        &mut self,
        view: &BatchView<'_, '_, TestEntry>,
    ) -> Result<Vec<u64>, StoreFailure> {
        let ordinal = self.executed_batches;
        if self.fail_on_batch == Some(ordinal) {
            return Err(StoreFailure::new("injected store failure"));
        }
        if let Some((at, token)) = &self.cancel_on_batch {
            if *at == ordinal {
                token.cancel();
            }
        }
        self.executed_batches += 1;

        let mut counts = Vec::with_capacity(view.len());
        for command in view.commands() {
            counts.push(self.apply_command(command)?);
        }

        Ok(counts)
    }
}

impl StoreSession<TestEntry> for MemoryStore {
    fn in_transaction(&self) -> bool {
        self.snapshot.is_some()
    }

    fn begin_transaction(&mut self) -> Result<(), StoreFailure> {
        self.snapshot = Some(self.rows.clone());

        Ok(())
    }

    fn commit_transaction(&mut self) -> Result<(), StoreFailure> {
        self.snapshot = None;

        Ok(())
    }

    fn rollback_transaction(&mut self) -> Result<(), StoreFailure> {
        if let Some(snapshot) = self.snapshot.take() {
            self.rows = snapshot;
        }

        Ok(())
    }

    fn execute_batch(
        &mut self,
        batch: &BatchView<'_, '_, TestEntry>,
    ) -> Result<Vec<u64>, StoreFailure> {
        self.run_batch(batch)
    }
}

#[async_trait]
impl AsyncStoreSession<TestEntry> for MemoryStore {
    fn in_transaction(&self) -> bool {
        self.snapshot.is_some()
    }

    async fn begin_transaction(&mut self) -> Result<(), StoreFailure> {
        StoreSession::begin_transaction(self)
    }

    async fn commit_transaction(&mut self) -> Result<(), StoreFailure> {
        StoreSession::commit_transaction(self)
    }

    async fn rollback_transaction(&mut self) -> Result<(), StoreFailure> {
        StoreSession::rollback_transaction(self)
    }

    async fn execute_batch(
        &mut self,
        batch: &BatchView<'_, '_, TestEntry>,
    ) -> Result<Vec<u64>, StoreFailure> {
        self.run_batch(batch)
    }
}
