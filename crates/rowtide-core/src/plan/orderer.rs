use crate::{
    command::{CommandId, MutationCommand},
    entry::{EntryState, TrackedEntry},
    error::{CyclicDependencyError, SaveError},
    graph::DependencyGraph,
    model::{ForeignKeyModel, TableIdent},
    obs::sink::{self, MetricsEvent},
    plan::{CommandBatch, PlanConfig, SavePlan},
    value::{KeyValue, ValueSource},
};
use std::{
    cmp::Ordering,
    collections::{BTreeMap, btree_map},
    sync::Arc,
};

///
/// KeyValueIndex
///
/// Candidate-key or foreign-key value snapshot used purely to detect
/// ordering relationships between commands. Constructed during edge
/// discovery and discarded once edges are in the graph. Equal iff same
/// foreign key, same value source, and equal key values.
///

#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
struct KeyValueIndex {
    foreign_key: Arc<ForeignKeyModel>,
    source: ValueSource,
    key: KeyValue,
}

///
/// RowIdent
/// Grouping identity for shared-row merging. Added rows whose key is not
/// materialized yet have no row identity to merge on and stay distinct.
///

#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
enum RowIdent {
    Row(TableIdent, KeyValue),
    Distinct(usize),
}

///
/// CommandOrderer
///
/// Transforms the flat list of pending entries into the ordered sequence
/// of command batches the runner executes. One instance per save
/// operation; the resulting plan owns its commands for the operation's
/// duration.
///

pub struct CommandOrderer {
    config: PlanConfig,
}

impl CommandOrderer {
    #[must_use]
    pub const fn new(config: PlanConfig) -> Self {
        Self { config }
    }

    /// Prepare the dependency-ordered, size-bounded batch sequence.
    /// Fails before anything touches the store: a cyclic mutation set
    /// needs no rollback.
    pub fn prepare<'e, E: TrackedEntry>(
        &self,
        entries: &'e [E],
    ) -> Result<SavePlan<'e, E>, SaveError> {
        // Phase 1: one command per target row, merging shared-row entries.
        let commands = build_commands(entries)?;

        // Phase 2+3: foreign-key-implied ordering edges.
        let graph = build_dependency_graph(&commands);

        // Phase 4: layered sort with the deterministic in-wave tie-break.
        let waves = sort_into_waves(&commands, &graph)?;

        // Phase 5: pack each wave into size-bounded batches.
        let batches = pack_batches(&commands, &waves, &self.config)?;

        sink::record(MetricsEvent::PlanBuilt {
            commands: u64::try_from(commands.len()).unwrap_or(u64::MAX),
            waves: u64::try_from(waves.len()).unwrap_or(u64::MAX),
            batches: u64::try_from(batches.len()).unwrap_or(u64::MAX),
        });

        Ok(SavePlan {
            commands,
            batches,
            waves: waves.len(),
        })
    }
}

// Group pending entries by target row; concatenation order of groups is
// insignificant, the graph resolves it.
fn build_commands<'e, E: TrackedEntry>(
    entries: &'e [E],
) -> Result<Vec<MutationCommand<'e, E>>, SaveError> {
    let mut commands: Vec<MutationCommand<'e, E>> = Vec::with_capacity(entries.len());
    let mut by_row: BTreeMap<RowIdent, usize> = BTreeMap::new();

    for (index, entry) in entries.iter().enumerate() {
        let source = if entry.state() == EntryState::Deleted {
            ValueSource::Original
        } else {
            ValueSource::Current
        };
        let ident = match entry.primary_key(source) {
            Some(key) => RowIdent::Row(entry.model().table.clone(), key),
            None => RowIdent::Distinct(index),
        };

        match by_row.entry(ident) {
            btree_map::Entry::Occupied(slot) => commands[*slot.get()].add_entry(entry)?,
            btree_map::Entry::Vacant(slot) => {
                slot.insert(commands.len());
                commands.push(MutationCommand::new(entry));
            }
        }
    }

    Ok(commands)
}

// Two O(n) passes. The first records predecessor candidates keyed by key
// snapshot; the second looks up matches and adds labeled edges. A command
// with an invalid key snapshot simply has no entry for that key aspect.
fn build_dependency_graph<E: TrackedEntry>(
    commands: &[MutationCommand<'_, E>],
) -> DependencyGraph<Arc<ForeignKeyModel>> {
    let mut graph = DependencyGraph::with_vertices(commands.len());
    let mut predecessors: BTreeMap<KeyValueIndex, Vec<usize>> = BTreeMap::new();

    // Phase 1: predecessor discovery.
    for (index, command) in commands.iter().enumerate() {
        let state = command.state();

        // Added/Modified principals: anything inserting a reference to
        // their candidate-key value must come after. Unconditional for
        // Added (the row does not exist yet); for Modified only when a
        // candidate-key column is actually written.
        if matches!(state, EntryState::Added | EntryState::Modified) {
            for entry in command.entries() {
                for fk in &entry.model().referencing_keys {
                    if state == EntryState::Modified && !writes_any(*entry, &fk.principal_columns)
                    {
                        continue;
                    }
                    if let Some(key) = entry.principal_key(fk, ValueSource::Current) {
                        predecessors
                            .entry(KeyValueIndex {
                                foreign_key: Arc::clone(fk),
                                source: ValueSource::Current,
                                key,
                            })
                            .or_default()
                            .push(index);
                    }
                }
            }
        }

        // Modified/Deleted dependents: rows moving away from or
        // disappearing from a relationship must be gone before the
        // referenced principal can be removed or updated.
        if matches!(state, EntryState::Modified | EntryState::Deleted) {
            for entry in command.entries() {
                for fk in &entry.model().foreign_keys {
                    if state == EntryState::Modified && !writes_any(*entry, &fk.dependent_columns)
                    {
                        continue;
                    }
                    if let Some(key) = entry.dependent_key(fk, ValueSource::Original) {
                        predecessors
                            .entry(KeyValueIndex {
                                foreign_key: Arc::clone(fk),
                                source: ValueSource::Original,
                                key,
                            })
                            .or_default()
                            .push(index);
                    }
                }
            }
        }
    }

    // Phase 2: edge construction. Self-edges are skipped; several foreign
    // keys forcing the same ordering add parallel edges.
    for (index, command) in commands.iter().enumerate() {
        match command.state() {
            // Dependents with a current foreign-key value come after
            // whatever establishes the referenced candidate key.
            EntryState::Added | EntryState::Modified => {
                for entry in command.entries() {
                    for fk in &entry.model().foreign_keys {
                        if command.state() == EntryState::Modified
                            && !writes_any(*entry, &fk.dependent_columns)
                        {
                            continue;
                        }
                        if let Some(key) = entry.dependent_key(fk, ValueSource::Current) {
                            add_matching_edges(
                                &mut graph,
                                &predecessors,
                                &KeyValueIndex {
                                    foreign_key: Arc::clone(fk),
                                    source: ValueSource::Current,
                                    key,
                                },
                                index,
                            );
                        }
                    }
                }
            }
            // Deleted principals come after the removal/update of every
            // row that referenced their original candidate key.
            EntryState::Deleted => {
                for entry in command.entries() {
                    for fk in &entry.model().referencing_keys {
                        if let Some(key) = entry.principal_key(fk, ValueSource::Original) {
                            add_matching_edges(
                                &mut graph,
                                &predecessors,
                                &KeyValueIndex {
                                    foreign_key: Arc::clone(fk),
                                    source: ValueSource::Original,
                                    key,
                                },
                                index,
                            );
                        }
                    }
                }
            }
        }
    }

    graph
}

fn add_matching_edges(
    graph: &mut DependencyGraph<Arc<ForeignKeyModel>>,
    predecessors: &BTreeMap<KeyValueIndex, Vec<usize>>,
    index_key: &KeyValueIndex,
    to: usize,
) {
    if let Some(froms) = predecessors.get(index_key) {
        for &from in froms {
            if from != to {
                graph.add_edge(from, to, Arc::clone(&index_key.foreign_key));
            }
        }
    }
}

fn writes_any<E: TrackedEntry>(entry: &E, columns: &[String]) -> bool {
    columns.iter().any(|column| entry.is_modified(column))
}

fn sort_into_waves<E: TrackedEntry>(
    commands: &[MutationCommand<'_, E>],
    graph: &DependencyGraph<Arc<ForeignKeyModel>>,
) -> Result<Vec<Vec<usize>>, SaveError> {
    // Deterministic in-wave order for reproducible scripts and logs only;
    // never a dependency.
    let tie_break = |a: usize, b: usize| -> Ordering {
        let (left, right) = (&commands[a], &commands[b]);
        left.table()
            .schema
            .cmp(&right.table().schema)
            .then_with(|| left.table().name.cmp(&right.table().name))
            .then_with(|| left.state().cmp(&right.state()))
            .then_with(|| a.cmp(&b))
    };

    graph
        .batching_topo_sort(Some(&tie_break))
        .map_err(|cycle| {
            let mut foreign_keys: Vec<String> =
                cycle.labels.iter().map(|fk| fk.name.clone()).collect();
            foreign_keys.sort();
            foreign_keys.dedup();

            CyclicDependencyError {
                commands: cycle
                    .vertices
                    .iter()
                    .map(|&vertex| commands[vertex].label())
                    .collect(),
                foreign_keys,
            }
            .into()
        })
}

fn pack_batches<E: TrackedEntry>(
    commands: &[MutationCommand<'_, E>],
    waves: &[Vec<usize>],
    config: &PlanConfig,
) -> Result<Vec<CommandBatch>, SaveError> {
    let mut batches = Vec::new();
    for (wave_index, wave) in waves.iter().enumerate() {
        // A wave boundary always starts a new batch, caps or not.
        let mut batch = CommandBatch::new(wave_index);
        for &index in wave {
            let parameters = commands[index].parameter_count()?;
            let id = CommandId::try_new(index)?;
            if !batch.try_add(id, parameters, config) {
                batches.push(batch);
                batch = CommandBatch::new(wave_index);
                let admitted = batch.try_add(id, parameters, config);
                debug_assert!(admitted, "a fresh batch admits one command");
            }
        }
        if !batch.is_empty() {
            batches.push(batch);
        }
    }

    Ok(batches)
}
