//! Fixed tuning constants for the decision-run scoring scale.
//!
//! These values define the deterministic math shared by previews, commits,
//! and the final badge evaluation. Keeping them together ensures the scale
//! can only change via reviewed code, not via external assets.

/// Number of scenarios dealt into a standard run.
pub const RUN_LENGTH: usize = 5;

/// Maximum score a single scenario can award.
pub const MAX_SCORE_PER_SCENARIO: i32 = 20;

// Risk gauge mapping -------------------------------------------------------
pub const RISK_GAUGE_MIN: f64 = 0.0;
pub const RISK_GAUGE_MAX: f64 = 100.0;
/// Gauge reading before any option is applied.
pub const RISK_GAUGE_NEUTRAL: f64 = 50.0;
/// Gauge points per unit of option risk delta; -10..=10 spans the gauge.
pub const RISK_DELTA_SCALE: f64 = 5.0;

// Badge thresholds, percent of max score, inclusive lower bounds -----------
pub const BADGE_GOLD_PCT: f64 = 80.0;
pub const BADGE_SILVER_PCT: f64 = 50.0;
pub const BADGE_BRONZE_PCT: f64 = 30.0;
