//! WealthQuest Engine
//!
//! Platform-agnostic core for the WealthQuest decision simulator: a user
//! steps through a fixed sequence of financial scenarios, previews the
//! hypothetical effect of each option locally, and commits exactly one
//! scoring choice per scenario against an authoritative server-side run
//! record. This crate provides the run state machine, the preview
//! calculator, the commit coordinator, and the cache reconciliation logic
//! without UI or platform-specific dependencies.
//!
//! External collaborators are traits: [`ScoringService`] and
//! [`ScenarioProvider`] for the network seams, [`RunStore`] for the durable
//! key-value cache. Platform layers (a browser binding, the headless QA
//! tester) supply the implementations.

pub mod constants;
pub mod data;
pub mod preview;
pub mod recovery;
pub mod result;
pub mod run;
pub mod service;
pub mod session;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use data::{DecisionKind, DecisionOption, Guidance, Impact, ScenarioSnapshot};
pub use preview::{ExploreState, PreviewOutcome, preview};
pub use recovery::{Restored, restore_run};
pub use result::{Badge, ResultSummary, result_summary};
pub use run::{DecisionLog, RunPhase, RunRecord, is_well_formed_id};
pub use service::{
    AdvanceReceipt, CommitReceipt, NewRun, RunStatus, ScenarioProvider, ScoringService,
    ServiceError,
};
pub use session::{CommitError, CommitOutcome, RunSession};
pub use store::{MemoryRunStore, RUN_CACHE_KEY, RunStore};
