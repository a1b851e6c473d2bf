//! Canonical run record and its lifecycle transitions.
//!
//! The record is mutated only by the commit and advance paths; every other
//! part of the system reads it. Scores always come from the server's reported
//! total, never from local summation.

use serde::{Deserialize, Serialize};

use crate::data::DecisionKind;

/// Lifecycle phase of the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    NotStarted,
    InProgress,
    Completed,
}

/// One committed decision, in commit order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionLog {
    pub text: String,
    /// Score the server actually awarded, which may differ from the
    /// option's displayed score.
    pub score: i32,
    pub kind: DecisionKind,
    #[serde(default)]
    pub why_matters: String,
}

/// Canonical record of an in-progress or finished run.
///
/// Invariants: `position <= scenario_ids.len()`, `completed` is true iff
/// `position == scenario_ids.len()`, and `history` holds one entry per
/// successful commit (`position`, or `position + 1` between a commit and
/// the following advance).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Opaque server-assigned identifier, never reused.
    pub run_id: String,
    /// Scenario order, fixed at creation.
    pub scenario_ids: Vec<u32>,
    /// Zero-based index of the scenario currently being answered.
    pub position: usize,
    /// Server-reported cumulative score.
    pub total_score: i32,
    pub completed: bool,
    /// Per-position commit gate; set by a successful commit, cleared only
    /// on advance. Persisted so a reload cannot re-open a scored position.
    #[serde(default)]
    pub answered: bool,
    #[serde(default)]
    pub history: Vec<DecisionLog>,
}

impl RunRecord {
    /// A brand-new run as allocated by the server.
    #[must_use]
    pub fn fresh(run_id: String, scenario_ids: Vec<u32>) -> Self {
        Self {
            run_id,
            scenario_ids,
            position: 0,
            total_score: 0,
            completed: false,
            answered: false,
            history: Vec::new(),
        }
    }

    /// Rebuild a record from server-confirmed values.
    ///
    /// A server that reports `completed` pins the position to the end of the
    /// sequence so the position-derived completion rule keeps holding.
    #[must_use]
    pub fn from_server(
        run_id: String,
        scenario_ids: Vec<u32>,
        position: usize,
        total_score: i32,
        completed: bool,
        history: Vec<DecisionLog>,
    ) -> Self {
        let len = scenario_ids.len();
        let position = if completed { len } else { position.min(len) };
        Self {
            run_id,
            scenario_ids,
            position,
            total_score,
            completed: completed || position == len,
            answered: false,
            history,
        }
    }

    /// Number of scenarios in the run.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scenario_ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenario_ids.is_empty()
    }

    /// Scenario id at the current position, `None` once exhausted.
    #[must_use]
    pub fn current_scenario(&self) -> Option<u32> {
        self.scenario_ids.get(self.position).copied()
    }

    #[must_use]
    pub fn phase(&self) -> RunPhase {
        if self.completed {
            RunPhase::Completed
        } else {
            RunPhase::InProgress
        }
    }

    /// Apply a server-confirmed commit: adopt the authoritative total (and
    /// position, when reported), append the history entry, close the gate.
    pub fn record_commit(&mut self, log: DecisionLog, total_score: i32, position: Option<usize>) {
        self.total_score = total_score;
        if let Some(p) = position {
            self.position = p.min(self.scenario_ids.len());
        }
        self.history.push(log);
        self.answered = true;
    }

    /// Advance one position, clearing the per-position gate. Adopts the
    /// server-reported position when one is available. Returns the phase
    /// after the move; completion is one-way.
    pub fn advance(&mut self, server_position: Option<usize>) -> RunPhase {
        let next = server_position.unwrap_or(self.position + 1);
        self.position = next.min(self.scenario_ids.len());
        self.answered = false;
        if self.position == self.scenario_ids.len() {
            self.completed = true;
        }
        self.phase()
    }

    /// Terminal transition: pin the position to the end of the sequence.
    pub fn finish(&mut self) {
        self.position = self.scenario_ids.len();
        self.answered = false;
        self.completed = true;
    }

    /// Check the record's structural invariants. Used by QA harnesses.
    #[must_use]
    pub fn invariants_hold(&self) -> bool {
        let len = self.scenario_ids.len();
        self.position <= len
            && (self.completed == (self.position == len))
            && self.total_score >= 0
            && self.history.len() <= self.position + usize::from(self.answered)
    }
}

/// Whether `id` looks like an identifier this engine's scoring service
/// issues (non-empty ASCII digits). Anything else is stale or corrupted
/// cache content.
#[must_use]
pub fn is_well_formed_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
}
