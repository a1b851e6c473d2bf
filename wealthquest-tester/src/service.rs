//! In-process scoring service used for headless QA runs.
//!
//! Behaves like the real backend at the engine's seams: runs get numeric
//! ids, scenario decks are sampled randomly per run, commits are idempotent
//! per `(run_id, position)`, and awarded scores follow the server's
//! partial-credit rule rather than whatever the client sent.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use async_trait::async_trait;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha20Rng;

use wealthquest_engine::constants::RUN_LENGTH;
use wealthquest_engine::{
    AdvanceReceipt, CommitReceipt, NewRun, RunStatus, ScenarioProvider, ScenarioSnapshot,
    ScoringService, ServiceError,
};

/// Points awarded for a mid-tier choice (at least half the best score).
const PARTIAL_HIGH: i32 = 10;
/// Points awarded for a weak but non-zero choice.
const PARTIAL_LOW: i32 = 5;

const EMBEDDED_CATALOG: &str = include_str!("../assets/scenarios.json");

struct HostedRun {
    scenario_ids: Vec<u32>,
    position: usize,
    completed: bool,
    /// Awarded score per position. Re-submission replaces the entry and the
    /// total is recomputed as the sum, so a retried commit never
    /// double-awards.
    attempts: BTreeMap<usize, i32>,
}

impl HostedRun {
    fn total(&self) -> i32 {
        self.attempts.values().sum()
    }
}

struct Backend {
    catalog: Vec<ScenarioSnapshot>,
    rng: ChaCha20Rng,
    runs: HashMap<String, HostedRun>,
    next_id: u64,
    /// Remaining calls to fail with a transport error (fault injection).
    outage: u32,
}

/// Deterministic stand-in for the remote scoring service.
#[derive(Clone)]
pub struct LocalScoringService {
    state: Rc<RefCell<Backend>>,
}

impl LocalScoringService {
    #[must_use]
    pub fn new(seed: u64, catalog: Vec<ScenarioSnapshot>) -> Self {
        Self {
            state: Rc::new(RefCell::new(Backend {
                catalog,
                rng: ChaCha20Rng::seed_from_u64(seed),
                runs: HashMap::new(),
                next_id: 0,
                outage: 0,
            })),
        }
    }

    /// Service backed by the catalog compiled into the tester binary.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded catalog fails to parse.
    pub fn with_embedded_catalog(seed: u64) -> Result<Self, serde_json::Error> {
        let catalog: Vec<ScenarioSnapshot> = serde_json::from_str(EMBEDDED_CATALOG)?;
        Ok(Self::new(seed, catalog))
    }

    /// Fail the next `calls` service calls with a transport error.
    pub fn inject_outage(&self, calls: u32) {
        self.state.borrow_mut().outage = calls;
    }

    /// Drop a run server-side, as if backend storage were reset.
    pub fn forget_run(&self, run_id: &str) {
        self.state.borrow_mut().runs.remove(run_id);
    }

    #[must_use]
    pub fn catalog_len(&self) -> usize {
        self.state.borrow().catalog.len()
    }

    fn checked(&self) -> Result<std::cell::RefMut<'_, Backend>, ServiceError> {
        let mut state = self.state.borrow_mut();
        if state.outage > 0 {
            state.outage -= 1;
            return Err(ServiceError::Transport("injected outage".to_string()));
        }
        Ok(state)
    }
}

/// The backend's partial-credit rule: the best option earns its full score,
/// a mid option earns `PARTIAL_HIGH`, a weak one `PARTIAL_LOW`, and a
/// zero-score option earns nothing.
fn award(raw: i32, max: i32) -> i32 {
    if raw >= max && raw > 0 {
        raw
    } else if raw > 0 {
        if raw * 2 >= max { PARTIAL_HIGH } else { PARTIAL_LOW }
    } else {
        0
    }
}

#[async_trait(?Send)]
impl ScoringService for LocalScoringService {
    async fn create_run(&self) -> Result<NewRun, ServiceError> {
        let mut state = self.checked()?;
        state.next_id += 1;
        let run_id = state.next_id.to_string();
        let deal = RUN_LENGTH.min(state.catalog.len());
        let scenario_ids: Vec<u32> = {
            let Backend { catalog, rng, .. } = &mut *state;
            catalog.choose_multiple(rng, deal).map(|s| s.id).collect()
        };
        state.runs.insert(
            run_id.clone(),
            HostedRun {
                scenario_ids: scenario_ids.clone(),
                position: 0,
                completed: false,
                attempts: BTreeMap::new(),
            },
        );
        Ok(NewRun {
            run_id,
            scenario_ids,
        })
    }

    async fn get_run(&self, run_id: &str) -> Result<RunStatus, ServiceError> {
        let state = self.checked()?;
        let run = state.runs.get(run_id).ok_or(ServiceError::NotFound)?;
        Ok(RunStatus {
            position: run.position,
            total_score: run.total(),
            scenario_ids: run.scenario_ids.clone(),
            completed: run.completed,
        })
    }

    async fn commit_answer(
        &self,
        run_id: &str,
        position: usize,
        option_id: u32,
        _score: i32,
    ) -> Result<CommitReceipt, ServiceError> {
        let mut state = self.checked()?;
        let scenario_id = {
            let run = state.runs.get(run_id).ok_or(ServiceError::NotFound)?;
            run.scenario_ids
                .get(position)
                .copied()
                .ok_or_else(|| ServiceError::Invalid(format!("position {position} out of range")))?
        };
        let (awarded, is_correct) = {
            let scenario = state
                .catalog
                .iter()
                .find(|s| s.id == scenario_id)
                .ok_or(ServiceError::NotFound)?;
            let option = scenario.option(option_id).ok_or_else(|| {
                ServiceError::Invalid(format!(
                    "option {option_id} does not belong to scenario {scenario_id}"
                ))
            })?;
            let max = scenario.max_option_score();
            (award(option.score, max), option.score >= max && option.score > 0)
        };
        let run = state.runs.get_mut(run_id).ok_or(ServiceError::NotFound)?;
        run.attempts.insert(position, awarded);
        Ok(CommitReceipt {
            total_score: run.total(),
            score_added: awarded,
            is_correct,
            position: Some(run.position),
            has_more: run.position + 1 < run.scenario_ids.len(),
        })
    }

    async fn advance(&self, run_id: &str) -> Result<AdvanceReceipt, ServiceError> {
        let mut state = self.checked()?;
        let run = state.runs.get_mut(run_id).ok_or(ServiceError::NotFound)?;
        run.position = (run.position + 1).min(run.scenario_ids.len());
        if run.position == run.scenario_ids.len() {
            run.completed = true;
        }
        Ok(AdvanceReceipt {
            completed: run.completed,
            position: run.position,
        })
    }

    async fn complete(&self, run_id: &str) -> Result<(), ServiceError> {
        let mut state = self.checked()?;
        let run = state.runs.get_mut(run_id).ok_or(ServiceError::NotFound)?;
        run.completed = true;
        run.position = run.scenario_ids.len();
        Ok(())
    }
}

#[async_trait(?Send)]
impl ScenarioProvider for LocalScoringService {
    async fn fetch_scenario(&self, scenario_id: u32) -> Result<ScenarioSnapshot, ServiceError> {
        let state = self.checked()?;
        state
            .catalog
            .iter()
            .find(|s| s.id == scenario_id)
            .cloned()
            .ok_or(ServiceError::NotFound)
    }
}
