//! Run session facade binding the state machine to its collaborators.
//!
//! This is the single mutation path for a run: previews stay purely local,
//! commits go through the server exactly once per position, and every
//! confirmed mutation is mirrored into the durable cache before control
//! returns to the caller.

use log::{debug, warn};
use thiserror::Error;

use crate::data::ScenarioSnapshot;
use crate::preview::{ExploreState, PreviewOutcome};
use crate::recovery::{Restored, clear_cache, restore_run, write_through};
use crate::result::{ResultSummary, result_summary};
use crate::run::{DecisionLog, RunPhase, RunRecord, is_well_formed_id};
use crate::service::{ScenarioProvider, ScoringService, ServiceError};
use crate::store::RunStore;

/// Failure modes of a scoring commit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitError {
    /// This position has already been scored; no network call was made.
    #[error("decision already committed for this scenario")]
    DuplicateCommit,
    /// The server has no record of the run; the local cache has been
    /// cleared and the caller must restart from scratch.
    #[error("run session expired")]
    SessionExpired,
    /// Client-side data defect; the run record was left untouched.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// No definitive outcome; the identical commit is safe to retry.
    #[error("transient failure: {0}")]
    Transient(String),
}

impl From<ServiceError> for CommitError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound => CommitError::SessionExpired,
            ServiceError::Invalid(msg) => CommitError::InvalidRequest(msg),
            ServiceError::Transport(msg) => CommitError::Transient(msg),
        }
    }
}

/// What a confirmed commit actually awarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitOutcome {
    pub score_added: i32,
    pub total_score: i32,
    pub is_correct: bool,
}

/// Session facade over one user's run.
pub struct RunSession<A, P, S>
where
    A: ScoringService,
    P: ScenarioProvider,
    S: RunStore,
{
    api: A,
    scenarios: P,
    store: S,
    run: Option<RunRecord>,
    snapshot: Option<ScenarioSnapshot>,
    explore: ExploreState,
}

impl<A, P, S> RunSession<A, P, S>
where
    A: ScoringService,
    P: ScenarioProvider,
    S: RunStore,
{
    #[must_use]
    pub fn new(api: A, scenarios: P, store: S) -> Self {
        Self {
            api,
            scenarios,
            store,
            run: None,
            snapshot: None,
            explore: ExploreState::default(),
        }
    }

    #[must_use]
    pub fn phase(&self) -> RunPhase {
        self.run
            .as_ref()
            .map_or(RunPhase::NotStarted, RunRecord::phase)
    }

    #[must_use]
    pub fn run(&self) -> Option<&RunRecord> {
        self.run.as_ref()
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<&ScenarioSnapshot> {
        self.snapshot.as_ref()
    }

    #[must_use]
    pub fn explore(&self) -> &ExploreState {
        &self.explore
    }

    /// One-based question number and run length, for progress display.
    #[must_use]
    pub fn progress(&self) -> Option<(usize, usize)> {
        self.run
            .as_ref()
            .map(|run| ((run.position + 1).min(run.len()), run.len()))
    }

    /// Final badge summary, available once the run is completed.
    #[must_use]
    pub fn result(&self) -> Option<ResultSummary> {
        self.run
            .as_ref()
            .filter(|run| run.completed)
            .map(result_summary)
    }

    /// Produce or restore the current run, honoring an explicit run id
    /// (e.g. from a shared link) over the cache.
    ///
    /// # Errors
    ///
    /// Returns an error only when an in-progress run was restored but its
    /// scenario snapshot could not be fetched; the run itself is kept and
    /// [`Self::reload_snapshot`] may be retried.
    pub async fn load_or_restore(
        &mut self,
        explicit_id: Option<&str>,
    ) -> Result<RunPhase, ServiceError> {
        match restore_run(&self.api, &self.store, explicit_id).await {
            Restored::Fresh => {
                self.run = None;
                self.snapshot = None;
                self.explore = ExploreState::default();
                Ok(RunPhase::NotStarted)
            }
            Restored::Completed(record) => {
                self.run = Some(record);
                self.snapshot = None;
                self.explore = ExploreState::default();
                Ok(RunPhase::Completed)
            }
            Restored::InProgress(record) => {
                self.run = Some(record);
                self.snapshot = None;
                self.refresh_snapshot().await?;
                Ok(RunPhase::InProgress)
            }
        }
    }

    /// Start a brand-new run via the scoring service.
    ///
    /// # Errors
    ///
    /// Returns an error if the run cannot be created or the first scenario
    /// cannot be fetched.
    pub async fn start_run(&mut self) -> Result<(), ServiceError> {
        let new_run = self.api.create_run().await?;
        let record = RunRecord::fresh(new_run.run_id, new_run.scenario_ids);
        debug!("started run {} with {} scenarios", record.run_id, record.len());
        write_through(&self.store, &record);
        self.run = Some(record);
        self.snapshot = None;
        self.explore = ExploreState::default();
        self.refresh_snapshot().await
    }

    /// Retry fetching the snapshot for the current position after a
    /// transient provider failure.
    ///
    /// # Errors
    ///
    /// Returns an error if the scenario still cannot be fetched.
    pub async fn reload_snapshot(&mut self) -> Result<(), ServiceError> {
        self.refresh_snapshot().await
    }

    /// Purely local what-if: highlight an option and compute its
    /// hypothetical effect from the scenario baseline. Never touches the
    /// run record, the cache, or the network.
    pub fn preview_option(&mut self, option_id: u32) -> Option<PreviewOutcome> {
        let option = self.snapshot.as_ref()?.option(option_id)?.clone();
        Some(self.explore.select(&option))
    }

    /// Commit the scoring decision for the current position.
    ///
    /// Exactly one commit can succeed per position; the gate is only
    /// cleared by [`Self::advance_to_next`]. A commit either fully succeeds
    /// (score, position, history, gate, and cache updated together) or
    /// fully fails with the record untouched.
    ///
    /// # Errors
    ///
    /// See [`CommitError`] for the closed set of failure modes.
    pub async fn commit_option(&mut self, option_id: u32) -> Result<CommitOutcome, CommitError> {
        let (run_id, position) = {
            let Some(run) = self.run.as_ref() else {
                return Err(CommitError::InvalidRequest("no active run".to_string()));
            };
            if run.answered {
                return Err(CommitError::DuplicateCommit);
            }
            (run.run_id.clone(), run.position)
        };
        if !is_well_formed_id(&run_id) {
            self.expire();
            return Err(CommitError::SessionExpired);
        }
        let option = self
            .snapshot
            .as_ref()
            .and_then(|snap| snap.option(option_id))
            .cloned()
            .ok_or_else(|| CommitError::InvalidRequest(format!("unknown option id {option_id}")))?;

        // Pre-flight check: the cached id may refer to a run the server has
        // since dropped (e.g. backend storage was reset).
        match self.api.get_run(&run_id).await {
            Ok(_) => {}
            Err(ServiceError::NotFound) => {
                self.expire();
                return Err(CommitError::SessionExpired);
            }
            Err(err) => return Err(err.into()),
        }

        let receipt = match self
            .api
            .commit_answer(&run_id, position, option.id, option.score)
            .await
        {
            Ok(receipt) => receipt,
            Err(ServiceError::NotFound) => {
                self.expire();
                return Err(CommitError::SessionExpired);
            }
            Err(err) => return Err(err.into()),
        };

        // Ignore the response if the session moved on while the call was
        // in flight.
        let Some(run) = self.run.as_mut().filter(|run| run.run_id == run_id) else {
            return Err(CommitError::Transient(
                "run changed while the commit was in flight".to_string(),
            ));
        };
        run.record_commit(
            DecisionLog {
                text: option.text.clone(),
                score: receipt.score_added,
                kind: option.kind,
                why_matters: option.content.why_matters.clone(),
            },
            receipt.total_score,
            receipt.position,
        );
        debug!(
            "run {run_id}: committed option {} at position {position} for {} points (total {})",
            option.id, receipt.score_added, receipt.total_score
        );
        write_through(&self.store, run);
        self.explore.mark_submitted(&option);
        Ok(CommitOutcome {
            score_added: receipt.score_added,
            total_score: receipt.total_score,
            is_correct: receipt.is_correct,
        })
    }

    /// Move to the next scenario, or finish the run when the sequence is
    /// exhausted. Requires a committed decision for the current position.
    ///
    /// The server-side advance/complete notifications are best-effort:
    /// completion is derived from the local position, and a failed
    /// notification is logged, never propagated.
    ///
    /// # Errors
    ///
    /// Returns an error when no decision has been committed for the
    /// current position, or when the next scenario snapshot cannot be
    /// fetched (the position advance itself has already been persisted;
    /// retry with [`Self::reload_snapshot`]).
    pub async fn advance_to_next(&mut self) -> Result<RunPhase, ServiceError> {
        let (run_id, next, len) = {
            let Some(run) = self.run.as_ref() else {
                return Ok(RunPhase::NotStarted);
            };
            if !run.answered {
                return Err(ServiceError::Invalid(
                    "no committed decision for the current scenario".to_string(),
                ));
            }
            (run.run_id.clone(), run.position + 1, run.len())
        };

        if next >= len {
            if let Some(run) = self.run.as_mut() {
                run.finish();
                write_through(&self.store, run);
            }
            if let Err(err) = self.api.complete(&run_id).await {
                warn!("completion notification for run {run_id} failed: {err}");
            }
            self.snapshot = None;
            self.explore = ExploreState::default();
            return Ok(RunPhase::Completed);
        }

        let server_position = match self.api.advance(&run_id).await {
            Ok(receipt) => Some(receipt.position),
            Err(err) => {
                warn!("advance notification for run {run_id} failed: {err}");
                None
            }
        };

        let phase = {
            let Some(run) = self.run.as_mut().filter(|run| run.run_id == run_id) else {
                return Ok(self.phase());
            };
            let phase = run.advance(server_position);
            write_through(&self.store, run);
            phase
        };
        if phase == RunPhase::InProgress {
            self.refresh_snapshot().await?;
        } else {
            self.snapshot = None;
            self.explore = ExploreState::default();
        }
        Ok(phase)
    }

    /// Clear all local state and the durable cache unconditionally.
    pub fn reset_run(&mut self) {
        clear_cache(&self.store);
        self.run = None;
        self.snapshot = None;
        self.explore = ExploreState::default();
    }

    async fn refresh_snapshot(&mut self) -> Result<(), ServiceError> {
        let Some(scenario_id) = self.run.as_ref().and_then(RunRecord::current_scenario) else {
            return Ok(());
        };
        let snapshot = self.scenarios.fetch_scenario(scenario_id).await?;
        self.explore = ExploreState::for_baseline(snapshot.starting_balance);
        self.snapshot = Some(snapshot);
        Ok(())
    }

    fn expire(&mut self) {
        warn!("server has no record of the active run; clearing local cache");
        self.reset_run();
    }
}
