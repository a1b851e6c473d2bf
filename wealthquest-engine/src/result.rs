//! Final badge evaluation for a finished run.

use serde::{Deserialize, Serialize};

use crate::constants::{BADGE_BRONZE_PCT, BADGE_GOLD_PCT, BADGE_SILVER_PCT, MAX_SCORE_PER_SCENARIO};
use crate::run::RunRecord;

/// Badge tier awarded at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Badge {
    WealthMaster,
    SmartSaver,
    BuddingInvestor,
    FinancialNovice,
}

impl Badge {
    /// Badge for a given percentage of the maximum score. Thresholds are
    /// checked highest first with inclusive lower bounds, so a tie at a
    /// boundary resolves to the higher tier.
    #[must_use]
    pub fn for_percentage(percentage: f64) -> Self {
        if percentage >= BADGE_GOLD_PCT {
            Badge::WealthMaster
        } else if percentage >= BADGE_SILVER_PCT {
            Badge::SmartSaver
        } else if percentage >= BADGE_BRONZE_PCT {
            Badge::BuddingInvestor
        } else {
            Badge::FinancialNovice
        }
    }

    /// Display name shown on the result screen.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Badge::WealthMaster => "Wealth Master",
            Badge::SmartSaver => "Smart Saver",
            Badge::BuddingInvestor => "Budding Investor",
            Badge::FinancialNovice => "Financial Novice",
        }
    }

    /// Medal color key used by the rendering layer.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Badge::WealthMaster => "gold",
            Badge::SmartSaver => "silver",
            Badge::BuddingInvestor => "bronze",
            Badge::FinancialNovice => "gray",
        }
    }
}

impl std::fmt::Display for Badge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title())
    }
}

/// Summary of a finished run for the result screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub badge: Badge,
    pub total_score: i32,
    pub max_score: i32,
    pub percentage: f64,
    pub total_questions: usize,
}

/// Compute the final summary from a run record.
///
/// Pure: identical records always yield identical summaries, and the
/// evaluation may be repeated any number of times without side effects.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub fn result_summary(run: &RunRecord) -> ResultSummary {
    let total_questions = run.scenario_ids.len();
    let max_score = total_questions as i32 * MAX_SCORE_PER_SCENARIO;
    let percentage = if max_score > 0 {
        f64::from(run.total_score) / f64::from(max_score) * 100.0
    } else {
        0.0
    };
    ResultSummary {
        badge: Badge::for_percentage(percentage),
        total_score: run.total_score,
        max_score,
        percentage,
        total_questions,
    }
}
