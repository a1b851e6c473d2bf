//! Seam to the external scoring/run service and scenario content store.
//!
//! Transport-agnostic: HTTP/JSON is the expected binding, but the engine
//! only sees these traits. Implementations must keep `NotFound`
//! distinguishable from transport failure; the whole recovery design
//! hinges on that distinction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::ScenarioSnapshot;

/// Failure modes reported by the external collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The requested run is unknown to the server.
    #[error("run not found")]
    NotFound,
    /// The request was rejected as malformed.
    #[error("invalid request: {0}")]
    Invalid(String),
    /// Transport-level failure with no definitive outcome.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Result of allocating a new run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRun {
    pub run_id: String,
    /// Scenario order, fixed for the run's lifetime.
    pub scenario_ids: Vec<u32>,
}

/// Authoritative server view of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatus {
    pub position: usize,
    pub total_score: i32,
    pub scenario_ids: Vec<u32>,
    pub completed: bool,
}

/// Server acknowledgement of a scored commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReceipt {
    /// New cumulative total, adopted verbatim by the run record.
    pub total_score: i32,
    /// Points this commit actually awarded (the server may grant partial
    /// credit, so this can differ from the option's displayed score).
    pub score_added: i32,
    pub is_correct: bool,
    /// Server's current position, when it reports one.
    pub position: Option<usize>,
    pub has_more: bool,
}

/// Acknowledgement of a position advance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceReceipt {
    pub completed: bool,
    pub position: usize,
}

/// The four run operations the engine consumes from the scoring service.
#[async_trait(?Send)]
pub trait ScoringService {
    /// Allocate a new run and fix its scenario order.
    ///
    /// # Errors
    ///
    /// Returns an error if the run cannot be created.
    async fn create_run(&self) -> Result<NewRun, ServiceError>;

    /// Idempotent read of a run's authoritative state, used both for
    /// recovery and for pre-commit verification.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the id is unknown, distinguishable from
    /// transport failures.
    async fn get_run(&self, run_id: &str) -> Result<RunStatus, ServiceError>;

    /// Record the scoring decision for one position. Safe to retry for the
    /// same `(run_id, position)` pair without double-awarding score.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown runs, `Invalid` for malformed
    /// submissions, and `Transport` when the outcome is unknown.
    async fn commit_answer(
        &self,
        run_id: &str,
        position: usize,
        option_id: u32,
        score: i32,
    ) -> Result<CommitReceipt, ServiceError>;

    /// Best-effort position bump; a failure never blocks local advance.
    ///
    /// # Errors
    ///
    /// Returns an error if the notification does not land.
    async fn advance(&self, run_id: &str) -> Result<AdvanceReceipt, ServiceError>;

    /// Best-effort terminal notification; completion stays locally derived
    /// from the position regardless of this call's outcome.
    ///
    /// # Errors
    ///
    /// Returns an error if the notification does not land.
    async fn complete(&self, run_id: &str) -> Result<(), ServiceError>;
}

/// Scenario content store, keyed by scenario id. Treated as a pure read,
/// fetched once per position.
#[async_trait(?Send)]
pub trait ScenarioProvider {
    /// Fetch the snapshot (baseline balance plus options) for one scenario.
    ///
    /// # Errors
    ///
    /// Returns an error if the scenario cannot be fetched or parsed.
    async fn fetch_scenario(&self, scenario_id: u32) -> Result<ScenarioSnapshot, ServiceError>;
}
