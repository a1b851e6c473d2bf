use serde::{Deserialize, Serialize};

/// Decision archetype for an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DecisionKind {
    Invest,
    Save,
    Spend,
}

impl std::fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionKind::Invest => write!(f, "INVEST"),
            DecisionKind::Save => write!(f, "SAVE"),
            DecisionKind::Spend => write!(f, "SPEND"),
        }
    }
}

/// Financial impact applied when an option is chosen.
/// All fields default to 0 if not specified in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Impact {
    #[serde(default)]
    pub balance: f64,
    #[serde(default)]
    pub confidence: i32,
    /// Risk delta, conventionally -10..=10.
    #[serde(default)]
    pub risk: i32,
    /// One-year growth rate, e.g. 0.08 for 8%.
    #[serde(default)]
    pub growth_rate: f64,
}

/// Explanatory content attached to an option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Guidance {
    #[serde(default)]
    pub why_matters: String,
    #[serde(default)]
    pub mentor: String,
}

/// A selectable decision option within a scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionOption {
    pub id: u32,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: DecisionKind,
    #[serde(default)]
    pub score: i32,
    #[serde(default)]
    pub impact: Impact,
    #[serde(default)]
    pub content: Guidance,
}

/// Read-only view of one scenario, owned by the current run position.
///
/// Replaced wholesale when the position advances; never merged with a prior
/// snapshot. The `starting_balance` is the immutable baseline every preview
/// is computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSnapshot {
    pub id: u32,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub starting_balance: f64,
    #[serde(default, alias = "choices")]
    pub options: Vec<DecisionOption>,
}

impl ScenarioSnapshot {
    /// Create an empty snapshot (useful for tests).
    #[must_use]
    pub fn empty() -> Self {
        Self {
            id: 0,
            title: String::new(),
            description: String::new(),
            starting_balance: 0.0,
            options: Vec::new(),
        }
    }

    /// Load a snapshot from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a valid snapshot.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Find an option by its id.
    #[must_use]
    pub fn option(&self, option_id: u32) -> Option<&DecisionOption> {
        self.options.iter().find(|o| o.id == option_id)
    }

    /// Highest score any option in this scenario awards.
    #[must_use]
    pub fn max_option_score(&self) -> i32 {
        self.options.iter().map(|o| o.score).max().unwrap_or(0)
    }
}
