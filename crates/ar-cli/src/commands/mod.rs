//! CLI command implementations.

mod sync;

pub use sync::{run_sync, SyncInvocation};
