//! Scripted collaborators for state-machine tests.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use async_trait::async_trait;

use crate::data::{DecisionKind, DecisionOption, Guidance, Impact, ScenarioSnapshot};
use crate::service::{
    AdvanceReceipt, CommitReceipt, NewRun, RunStatus, ScenarioProvider, ScoringService,
    ServiceError,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub create_run: u32,
    pub get_run: u32,
    pub commit: u32,
    pub advance: u32,
    pub complete: u32,
    pub fetch_scenario: u32,
}

#[derive(Default)]
pub struct ServiceState {
    pub next_run: Option<NewRun>,
    pub runs: HashMap<String, RunStatus>,
    pub scenarios: HashMap<u32, ScenarioSnapshot>,
    /// Scripted outcomes consumed one per commit; when empty, commits
    /// succeed and accumulate onto the stored run status.
    pub commit_script: VecDeque<Result<CommitReceipt, ServiceError>>,
    /// Sticky forced outcome for `get_run`, overriding the runs map.
    pub get_run_error: Option<ServiceError>,
    pub advance_error: Option<ServiceError>,
    pub complete_error: Option<ServiceError>,
    pub calls: CallCounts,
}

/// Programmable scoring service + scenario provider that records call
/// counts, so tests can assert which network operations actually ran.
#[derive(Clone, Default)]
pub struct ScriptedService {
    state: Rc<RefCell<ServiceState>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_run(self, run_id: &str, status: RunStatus) -> Self {
        self.state
            .borrow_mut()
            .runs
            .insert(run_id.to_string(), status);
        self
    }

    pub fn with_next_run(self, run_id: &str, scenario_ids: Vec<u32>) -> Self {
        {
            let mut state = self.state.borrow_mut();
            state.next_run = Some(NewRun {
                run_id: run_id.to_string(),
                scenario_ids: scenario_ids.clone(),
            });
            state.runs.insert(
                run_id.to_string(),
                RunStatus {
                    position: 0,
                    total_score: 0,
                    scenario_ids,
                    completed: false,
                },
            );
        }
        self
    }

    pub fn with_scenario(self, snapshot: ScenarioSnapshot) -> Self {
        self.state
            .borrow_mut()
            .scenarios
            .insert(snapshot.id, snapshot);
        self
    }

    pub fn script_commit(&self, outcome: Result<CommitReceipt, ServiceError>) {
        self.state.borrow_mut().commit_script.push_back(outcome);
    }

    pub fn fail_get_run(&self, error: ServiceError) {
        self.state.borrow_mut().get_run_error = Some(error);
    }

    pub fn fail_advance(&self, error: ServiceError) {
        self.state.borrow_mut().advance_error = Some(error);
    }

    pub fn fail_complete(&self, error: ServiceError) {
        self.state.borrow_mut().complete_error = Some(error);
    }

    pub fn drop_run(&self, run_id: &str) {
        self.state.borrow_mut().runs.remove(run_id);
    }

    pub fn calls(&self) -> CallCounts {
        self.state.borrow().calls
    }
}

#[async_trait(?Send)]
impl ScoringService for ScriptedService {
    async fn create_run(&self) -> Result<NewRun, ServiceError> {
        let mut state = self.state.borrow_mut();
        state.calls.create_run += 1;
        state
            .next_run
            .take()
            .ok_or_else(|| ServiceError::Transport("no run scripted".to_string()))
    }

    async fn get_run(&self, run_id: &str) -> Result<RunStatus, ServiceError> {
        let mut state = self.state.borrow_mut();
        state.calls.get_run += 1;
        if let Some(err) = state.get_run_error.clone() {
            return Err(err);
        }
        state.runs.get(run_id).cloned().ok_or(ServiceError::NotFound)
    }

    async fn commit_answer(
        &self,
        run_id: &str,
        position: usize,
        _option_id: u32,
        score: i32,
    ) -> Result<CommitReceipt, ServiceError> {
        let mut state = self.state.borrow_mut();
        state.calls.commit += 1;
        if let Some(outcome) = state.commit_script.pop_front() {
            return outcome;
        }
        let status = state.runs.get_mut(run_id).ok_or(ServiceError::NotFound)?;
        status.total_score += score;
        let total_score = status.total_score;
        let has_more = position + 1 < status.scenario_ids.len();
        Ok(CommitReceipt {
            total_score,
            score_added: score,
            is_correct: true,
            position: Some(position),
            has_more,
        })
    }

    async fn advance(&self, run_id: &str) -> Result<AdvanceReceipt, ServiceError> {
        let mut state = self.state.borrow_mut();
        state.calls.advance += 1;
        if let Some(err) = state.advance_error.clone() {
            return Err(err);
        }
        let status = state.runs.get_mut(run_id).ok_or(ServiceError::NotFound)?;
        status.position = (status.position + 1).min(status.scenario_ids.len());
        if status.position == status.scenario_ids.len() {
            status.completed = true;
        }
        Ok(AdvanceReceipt {
            completed: status.completed,
            position: status.position,
        })
    }

    async fn complete(&self, run_id: &str) -> Result<(), ServiceError> {
        let mut state = self.state.borrow_mut();
        state.calls.complete += 1;
        if let Some(err) = state.complete_error.clone() {
            return Err(err);
        }
        if let Some(status) = state.runs.get_mut(run_id) {
            status.completed = true;
            status.position = status.scenario_ids.len();
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl ScenarioProvider for ScriptedService {
    async fn fetch_scenario(&self, scenario_id: u32) -> Result<ScenarioSnapshot, ServiceError> {
        let mut state = self.state.borrow_mut();
        state.calls.fetch_scenario += 1;
        state
            .scenarios
            .get(&scenario_id)
            .cloned()
            .ok_or(ServiceError::NotFound)
    }
}

pub fn option_with(id: u32, score: i32, balance: f64, risk: i32, growth_rate: f64) -> DecisionOption {
    DecisionOption {
        id,
        text: format!("option {id}"),
        kind: DecisionKind::Invest,
        score,
        impact: Impact {
            balance,
            confidence: 0,
            risk,
            growth_rate,
        },
        content: Guidance {
            why_matters: format!("why {id}"),
            mentor: String::new(),
        },
    }
}

pub fn scenario_with(id: u32, starting_balance: f64, options: Vec<DecisionOption>) -> ScenarioSnapshot {
    ScenarioSnapshot {
        id,
        title: format!("scenario {id}"),
        description: String::new(),
        starting_balance,
        options,
    }
}
