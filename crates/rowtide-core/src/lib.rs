//! Core runtime for rowtide: mutation commands, the dependency graph,
//! command ordering, batch packing, and the transactional batch runner.
//!
//! The pipeline is a purely in-process orchestration layer between change
//! tracking and statement execution: it decides neither *which* rows are
//! dirty nor *how* a batch becomes statement text.

pub mod command;
pub mod entry;
pub mod error;
pub mod exec;
pub mod graph;
pub mod model;
pub mod obs;
pub mod plan;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// Prelude
///
/// Domain vocabulary only. No errors, runners, sessions, or helpers are
/// re-exported here.
///

pub mod prelude {
    pub use crate::{
        entry::{EntryRef, EntryState, TrackedEntry},
        model::{
            ColumnModel, EntityModel, ForeignKeyModel, KeyShape, TableIdent, ValueGeneration,
        },
        value::{KeyValue, Value, ValueSource},
    };
}
