//! Execution half of a save operation: session boundary, cancellation, and
//! the transactional batch runner.

mod runner;
mod session;

pub use runner::{BatchRunner, RowsAffected, TransactionScope};
pub use session::{AsyncStoreSession, BatchView, CancelToken, StoreSession};
