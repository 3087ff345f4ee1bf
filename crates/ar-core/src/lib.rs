//! # ar-core
//!
//! The Asset Relay synchronization pipeline: time-windowed retrieval of
//! changed inventory assets, field mapping into MDM device records,
//! at-least-once delivery, and the persisted retry ledger that carries
//! failures across runs.

pub mod fetcher;
pub mod ledger;
pub mod mapper;
pub mod orchestrator;
pub mod reconcile;
pub mod resolver;

pub use fetcher::{ChangeWindowFetcher, FetchSettings};
pub use ledger::{LedgerError, RetryLedger};
pub use mapper::{FallbackIdentity, FieldMapper, MappingProfile};
pub use orchestrator::{SyncError, SyncOptions, SyncOrchestrator, SyncReport};
pub use reconcile::{ReconcileSummary, Reconciler};
pub use resolver::UserResolver;
