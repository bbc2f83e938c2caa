//! Command ordering and batch packing: the preparation half of a save
//! operation. Nothing here touches the store.

mod batch;
mod orderer;

pub use batch::{CommandBatch, SavePlan};
pub use orderer::CommandOrderer;

///
/// PlanConfig
///
/// Per-save packing caps derived from the target store's limits.
/// Correctness never depends on these; they only bound the resource cost of
/// one execution round-trip. Caps are tightened, never relaxed, within a
/// wave.
///

#[derive(Clone, Copy, Debug)]
pub struct PlanConfig {
    pub max_batch_commands: usize,
    pub max_batch_parameters: usize,
}

impl PlanConfig {
    pub const DEFAULT_MAX_BATCH_COMMANDS: usize = 128;
    pub const DEFAULT_MAX_BATCH_PARAMETERS: usize = 2048;

    #[must_use]
    pub const fn new(max_batch_commands: usize, max_batch_parameters: usize) -> Self {
        Self {
            max_batch_commands: if max_batch_commands == 0 {
                1
            } else {
                max_batch_commands
            },
            max_batch_parameters: if max_batch_parameters == 0 {
                1
            } else {
                max_batch_parameters
            },
        }
    }
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_MAX_BATCH_COMMANDS,
            Self::DEFAULT_MAX_BATCH_PARAMETERS,
        )
    }
}
