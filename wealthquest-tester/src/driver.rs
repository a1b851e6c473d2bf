//! Scripted players that drive full runs through the engine and check its
//! invariants along the way.

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use log::debug;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::Serialize;

use wealthquest_engine::{
    CommitError, MemoryRunStore, RunPhase, RunSession, ScenarioSnapshot, preview, result_summary,
};

use crate::service::LocalScoringService;

/// How the scripted player picks an option each scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DecisionPolicy {
    /// Always commit the highest-scoring option
    Best,
    /// Always commit the lowest-scoring option
    Worst,
    /// Commit a uniformly random option
    Random,
    /// Preview every option first, verify preview independence, then
    /// commit the best one
    Explore,
}

impl DecisionPolicy {
    fn pick(self, snapshot: &ScenarioSnapshot, rng: &mut ChaCha20Rng) -> Option<u32> {
        let options = &snapshot.options;
        if options.is_empty() {
            return None;
        }
        let chosen = match self {
            DecisionPolicy::Best | DecisionPolicy::Explore => {
                options.iter().max_by_key(|o| (o.score, o.id))?
            }
            DecisionPolicy::Worst => options.iter().min_by_key(|o| (o.score, o.id))?,
            DecisionPolicy::Random => &options[rng.gen_range(0..options.len())],
        };
        Some(chosen.id)
    }
}

/// Settings for one scripted run.
pub struct DriveConfig {
    pub policy: DecisionPolicy,
    pub seed: u64,
    /// Rebuild the session from the durable cache before every step,
    /// exercising the reload/recovery path.
    pub reload_each_step: bool,
    /// Drop the run server-side after this many commits; the session is
    /// then expected to expire cleanly.
    pub drop_after: Option<usize>,
}

/// What one scripted run did and whether the engine held its invariants.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub policy: String,
    pub outcome: String,
    pub total_score: i32,
    pub max_score: i32,
    pub percentage: f64,
    pub badge: String,
    pub decisions: usize,
    pub reloads: usize,
    pub violations: Vec<String>,
}

impl RunReport {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

type Session = RunSession<LocalScoringService, LocalScoringService, MemoryRunStore>;

fn new_session(service: &LocalScoringService, store: &MemoryRunStore) -> Session {
    RunSession::new(service.clone(), service.clone(), store.clone())
}

/// Play one full run against `service` under the configured policy.
///
/// # Errors
///
/// Returns an error when the harness itself cannot proceed (service setup
/// failures); engine misbehavior is reported via `violations` instead.
pub async fn drive_run(service: &LocalScoringService, cfg: &DriveConfig) -> Result<RunReport> {
    let store = MemoryRunStore::new();
    let mut session = new_session(service, &store);
    let mut rng = ChaCha20Rng::seed_from_u64(cfg.seed);
    let mut violations = Vec::new();
    let mut decisions = 0usize;
    let mut reloads = 0usize;
    let mut last_total = 0i32;
    let mut outcome = "completed";

    session.start_run().await.context("starting run")?;
    let run_id = session
        .run()
        .map(|r| r.run_id.clone())
        .context("run record missing after start")?;
    let run_len = session.run().map(wealthquest_engine::RunRecord::len).unwrap_or(0);
    debug!("driving run {run_id} ({run_len} scenarios, policy {:?})", cfg.policy);

    // Bounded walk: a correct engine finishes in exactly `run_len` steps.
    for step in 0..run_len + 1 {
        if session.phase() != RunPhase::InProgress {
            break;
        }
        if cfg.reload_each_step && step > 0 {
            session = new_session(service, &store);
            let phase = session
                .load_or_restore(None)
                .await
                .context("reloading session from cache")?;
            reloads += 1;
            if phase != RunPhase::InProgress {
                violations.push(format!("reload at step {step} landed in {phase:?}"));
                break;
            }
        }

        let Some(snapshot) = session.snapshot().cloned() else {
            violations.push(format!("no snapshot at step {step}"));
            break;
        };

        if cfg.policy == DecisionPolicy::Explore {
            explore_all_options(&mut session, &snapshot, &mut violations);
        }

        let Some(option_id) = cfg.policy.pick(&snapshot, &mut rng) else {
            violations.push(format!("scenario {} has no options", snapshot.id));
            break;
        };

        if cfg.drop_after == Some(decisions) {
            service.forget_run(&run_id);
            match session.commit_option(option_id).await {
                Err(CommitError::SessionExpired) => {
                    outcome = "expired";
                    if session.phase() != RunPhase::NotStarted {
                        violations.push("expiry did not reset the session".to_string());
                    }
                    if store.snapshot().is_some() {
                        violations.push("expiry left a cached run behind".to_string());
                    }
                }
                other => violations.push(format!(
                    "commit against a dropped run returned {other:?}"
                )),
            }
            break;
        }

        let committed = match session.commit_option(option_id).await {
            Ok(receipt) => receipt,
            Err(err) => {
                violations.push(format!("commit failed at step {step}: {err}"));
                break;
            }
        };
        decisions += 1;
        if committed.total_score < last_total {
            violations.push(format!(
                "total score went backwards at step {step}: {last_total} -> {}",
                committed.total_score
            ));
        }
        last_total = committed.total_score;

        // The gate must reject a second commit without touching the network.
        if !matches!(
            session.commit_option(option_id).await,
            Err(CommitError::DuplicateCommit)
        ) {
            violations.push(format!("double commit was not rejected at step {step}"));
        }

        if let Some(run) = session.run() {
            if !run.invariants_hold() {
                violations.push(format!("run invariants broken at step {step}"));
            }
        }

        session
            .advance_to_next()
            .await
            .with_context(|| format!("advancing past step {step}"))?;
    }

    if outcome == "completed" && session.phase() != RunPhase::Completed {
        violations.push(format!(
            "run did not complete after {decisions} decisions (phase {:?})",
            session.phase()
        ));
    }

    let (total_score, max_score, percentage, badge) = match session.run() {
        Some(run) if run.completed => {
            let summary = result_summary(run);
            (
                summary.total_score,
                summary.max_score,
                summary.percentage,
                summary.badge.title().to_string(),
            )
        }
        _ => (last_total, 0, 0.0, String::new()),
    };

    Ok(RunReport {
        run_id,
        policy: format!("{:?}", cfg.policy).to_lowercase(),
        outcome: outcome.to_string(),
        total_score,
        max_score,
        percentage,
        badge,
        decisions,
        reloads,
        violations,
    })
}

/// Preview every option and check the calculator against a recompute from
/// the immutable baseline, in both directions, so a compounding bug cannot
/// hide behind iteration order.
fn explore_all_options(session: &mut Session, snapshot: &ScenarioSnapshot, violations: &mut Vec<String>) {
    let record_before = session.run().cloned();
    let mut sweep = |ids: &mut dyn Iterator<Item = usize>| {
        for idx in ids {
            let option = &snapshot.options[idx];
            let Some(shown) = session.preview_option(option.id) else {
                violations.push(format!("preview rejected option {}", option.id));
                continue;
            };
            let expected = preview(snapshot.starting_balance, option);
            if shown != expected {
                violations.push(format!(
                    "preview for option {} depends on exploration order",
                    option.id
                ));
            }
        }
    };
    sweep(&mut (0..snapshot.options.len()));
    sweep(&mut (0..snapshot.options.len()).rev());
    if session.run().cloned() != record_before {
        violations.push("previewing mutated the run record".to_string());
    }
}

/// Validate a batch of reports, returning an error if any run failed.
///
/// # Errors
///
/// Returns an error listing the first violation of each failed run.
pub fn validate_reports(reports: &[RunReport]) -> Result<()> {
    let failed: Vec<&RunReport> = reports.iter().filter(|r| !r.passed()).collect();
    if failed.is_empty() {
        return Ok(());
    }
    let summary: Vec<String> = failed
        .iter()
        .map(|r| format!("run {}: {}", r.run_id, r.violations[0]))
        .collect();
    bail!("{} of {} runs failed: {}", failed.len(), reports.len(), summary.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(policy: DecisionPolicy, seed: u64) -> DriveConfig {
        DriveConfig {
            policy,
            seed,
            reload_each_step: false,
            drop_after: None,
        }
    }

    #[tokio::test]
    async fn best_policy_earns_the_gold_badge() {
        let service = LocalScoringService::with_embedded_catalog(11).unwrap();
        let report = drive_run(&service, &config(DecisionPolicy::Best, 11))
            .await
            .unwrap();
        assert!(report.passed(), "violations: {:?}", report.violations);
        assert_eq!(report.total_score, report.max_score);
        assert_eq!(report.badge, "Wealth Master");
        assert_eq!(report.decisions, 5);
    }

    #[tokio::test]
    async fn explore_policy_verifies_preview_independence() {
        let service = LocalScoringService::with_embedded_catalog(13).unwrap();
        let report = drive_run(&service, &config(DecisionPolicy::Explore, 13))
            .await
            .unwrap();
        assert!(report.passed(), "violations: {:?}", report.violations);
        assert_eq!(report.badge, "Wealth Master");
    }

    #[tokio::test]
    async fn worst_policy_still_completes_cleanly() {
        let service = LocalScoringService::with_embedded_catalog(17).unwrap();
        let report = drive_run(&service, &config(DecisionPolicy::Worst, 17))
            .await
            .unwrap();
        assert!(report.passed(), "violations: {:?}", report.violations);
        assert!(report.total_score < report.max_score);
    }

    #[tokio::test]
    async fn reloading_between_every_step_loses_nothing() {
        let service = LocalScoringService::with_embedded_catalog(19).unwrap();
        let mut cfg = config(DecisionPolicy::Random, 19);
        cfg.reload_each_step = true;
        let report = drive_run(&service, &cfg).await.unwrap();
        assert!(report.passed(), "violations: {:?}", report.violations);
        assert_eq!(report.reloads, 4);
        assert_eq!(report.decisions, 5);
    }

    #[tokio::test]
    async fn dropped_run_expires_cleanly() {
        let service = LocalScoringService::with_embedded_catalog(23).unwrap();
        let mut cfg = config(DecisionPolicy::Best, 23);
        cfg.drop_after = Some(2);
        let report = drive_run(&service, &cfg).await.unwrap();
        assert!(report.passed(), "violations: {:?}", report.violations);
        assert_eq!(report.outcome, "expired");
        assert_eq!(report.decisions, 2);
    }

    #[test]
    fn validate_reports_flags_failures() {
        let good = RunReport {
            run_id: "1".to_string(),
            policy: "best".to_string(),
            outcome: "completed".to_string(),
            total_score: 100,
            max_score: 100,
            percentage: 100.0,
            badge: "Wealth Master".to_string(),
            decisions: 5,
            reloads: 0,
            violations: Vec::new(),
        };
        let mut bad = good.clone();
        bad.violations.push("boom".to_string());
        assert!(validate_reports(&[good.clone()]).is_ok());
        assert!(validate_reports(&[good, bad]).is_err());
    }
}
