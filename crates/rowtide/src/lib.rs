//! ## Crate layout
//! - `core`: the change-batching pipeline — mutation commands, the
//!   dependency graph, command ordering, batch packing, and the
//!   transactional batch runner.
//!
//! The `prelude` module mirrors the runtime surface used by host code;
//! collaborator traits (`TrackedEntry`, `StoreSession`) live in `core` and
//! are re-exported here.

pub use rowtide_core as core;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use crate::core::error::SaveError;

///
/// Prelude
/// using _ brings traits into scope and avoids name conflicts
///

pub mod prelude {
    pub use crate::core::{
        exec::{
            AsyncStoreSession, BatchRunner, BatchView, CancelToken, RowsAffected, StoreSession,
            TransactionScope,
        },
        plan::{CommandBatch, CommandOrderer, PlanConfig, SavePlan},
        prelude::*,
    };
}
