//! Pure what-if calculator for explore mode.
//!
//! Every preview is derived from the scenario's immutable baseline balance,
//! never from a previously displayed value, so previewing option B after
//! option A yields exactly what previewing B first would have.

use serde::{Deserialize, Serialize};

use crate::constants::{RISK_DELTA_SCALE, RISK_GAUGE_MAX, RISK_GAUGE_MIN, RISK_GAUGE_NEUTRAL};
use crate::data::DecisionOption;

/// Derived display values for one hypothetical choice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreviewOutcome {
    /// Baseline balance plus the option's balance delta, floored at zero.
    pub balance: f64,
    /// Risk gauge reading on the 0-100 scale, 50 = neutral.
    pub risk: f64,
    /// Projected value after one year at the option's growth rate.
    pub projected_value: f64,
}

/// Compute the hypothetical effect of `option` against the scenario baseline.
///
/// No side effects; callable unboundedly many times per scenario.
#[must_use]
pub fn preview(baseline_balance: f64, option: &DecisionOption) -> PreviewOutcome {
    let balance = (baseline_balance + option.impact.balance).max(0.0);
    let risk = (RISK_GAUGE_NEUTRAL + f64::from(option.impact.risk) * RISK_DELTA_SCALE)
        .clamp(RISK_GAUGE_MIN, RISK_GAUGE_MAX);
    let projected_value = balance * (1.0 + option.impact.growth_rate);
    PreviewOutcome {
        balance,
        risk,
        projected_value,
    }
}

/// Ephemeral explore-mode state for the current scenario.
///
/// Reset in full whenever the scenario snapshot changes. The `submitted`
/// option is display state only; the correctness gate for repeat commits
/// lives on the run record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExploreState {
    /// Immutable baseline for this scenario.
    pub base_balance: f64,
    /// Option currently highlighted, if any.
    pub selected: Option<DecisionOption>,
    /// Option actually committed for this position, if any.
    pub submitted: Option<DecisionOption>,
    /// Raw score of the highlighted option.
    pub hypothetical_score: i32,
    /// Derived values for the highlighted option.
    pub outcome: Option<PreviewOutcome>,
}

impl ExploreState {
    /// Fresh explore state for a newly fetched scenario.
    #[must_use]
    pub fn for_baseline(base_balance: f64) -> Self {
        Self {
            base_balance,
            ..Self::default()
        }
    }

    /// Highlight an option and recompute its hypothetical effect.
    pub fn select(&mut self, option: &DecisionOption) -> PreviewOutcome {
        let outcome = preview(self.base_balance, option);
        self.selected = Some(option.clone());
        self.hypothetical_score = option.score;
        self.outcome = Some(outcome);
        outcome
    }

    /// Record which option was actually committed for this position.
    pub fn mark_submitted(&mut self, option: &DecisionOption) {
        self.submitted = Some(option.clone());
    }
}
