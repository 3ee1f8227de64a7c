pub mod bootstrap;
pub mod burn;
pub mod diff;
pub mod engine;
pub mod finalize;
pub mod fund;
pub mod handlers;
pub mod metadata;
pub mod snapshot;
pub mod verify;

pub use bootstrap::{ensure_native_funds, BootstrapOutcome};
pub use burn::{burn, BurnResult};
pub use diff::CorrectionPlan;
pub use engine::{PoolInspection, ReconcileEngine, ReconcileEngineConfig, RunReport};
pub use finalize::{finalize, CommitPath, FinalizeState};
pub use fund::{fund, FundResult};
pub use handlers::{ActionOutcome, CorrectionDispatcher, CorrectionDispatcherConfig};
pub use metadata::MetadataBook;
pub use snapshot::{snapshot, PoolSnapshots};
pub use verify::{verify, Verification};
