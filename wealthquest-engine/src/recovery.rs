//! Load-time reconciliation between the cached run and the server.
//!
//! All restore paths (explicit id from a shared link, cached id, nothing)
//! funnel through one function that always lands in exactly one of three
//! outcomes, and never trusts a cached score or position without a server
//! round trip first.

use log::{debug, warn};

use crate::run::{DecisionLog, RunRecord, is_well_formed_id};
use crate::service::{RunStatus, ScoringService};
use crate::store::RunStore;

/// Outcome of [`restore_run`].
#[derive(Debug, Clone, PartialEq)]
pub enum Restored {
    /// No usable run; the caller starts from scratch.
    Fresh,
    InProgress(RunRecord),
    Completed(RunRecord),
}

/// Produce or restore the current run.
///
/// An explicit id (arriving via a shared link) takes precedence over any
/// cached run, and when it turns out to be dead the cache is discarded
/// rather than silently resumed. A cached run is only adopted after the
/// server confirms it, and the cache is overwritten with the
/// server-confirmed values.
pub async fn restore_run<A, S>(api: &A, store: &S, explicit_id: Option<&str>) -> Restored
where
    A: ScoringService,
    S: RunStore,
{
    if let Some(id) = explicit_id {
        return restore_explicit(api, store, id).await;
    }

    let cached = match store.load_run() {
        Ok(cached) => cached,
        Err(err) => {
            warn!("run cache unreadable: {err}");
            None
        }
    };
    let Some(cached) = cached else {
        return Restored::Fresh;
    };
    if !is_well_formed_id(&cached.run_id) {
        warn!("cached run id {:?} is malformed; discarding", cached.run_id);
        clear_cache(store);
        return Restored::Fresh;
    }

    match api.get_run(&cached.run_id).await {
        Ok(status) => {
            // The gate survives a reload only while the server agrees on
            // the position it was set for.
            let answered = cached.answered && status.position == cached.position;
            let mut history = cached.history;
            history.truncate(status.position + usize::from(answered));
            let mut record = adopt(cached.run_id, status, history);
            record.answered = answered && !record.completed;
            debug!(
                "restored run {} at position {} (score {})",
                record.run_id, record.position, record.total_score
            );
            write_through(store, &record);
            finish_restore(record)
        }
        Err(err) => {
            warn!("cached run {} failed verification: {err}", cached.run_id);
            clear_cache(store);
            Restored::Fresh
        }
    }
}

async fn restore_explicit<A, S>(api: &A, store: &S, run_id: &str) -> Restored
where
    A: ScoringService,
    S: RunStore,
{
    if !is_well_formed_id(run_id) {
        warn!("explicit run id {run_id:?} is malformed");
        clear_cache(store);
        return Restored::Fresh;
    }
    match api.get_run(run_id).await {
        Ok(status) => {
            // The server keeps no per-choice log, so an explicit restore
            // starts with an empty history.
            let record = adopt(run_id.to_string(), status, Vec::new());
            write_through(store, &record);
            finish_restore(record)
        }
        Err(err) => {
            warn!("explicit run {run_id} unavailable: {err}");
            clear_cache(store);
            Restored::Fresh
        }
    }
}

fn adopt(run_id: String, status: RunStatus, history: Vec<DecisionLog>) -> RunRecord {
    RunRecord::from_server(
        run_id,
        status.scenario_ids,
        status.position,
        status.total_score,
        status.completed,
        history,
    )
}

fn finish_restore(record: RunRecord) -> Restored {
    if record.completed {
        Restored::Completed(record)
    } else {
        Restored::InProgress(record)
    }
}

/// Mirror a run record mutation into the durable cache. Cache failures are
/// logged, not propagated: the in-memory record stays authoritative for the
/// session and the next successful write repairs the mirror.
pub(crate) fn write_through<S: RunStore>(store: &S, run: &RunRecord) {
    if let Err(err) = store.save_run(run) {
        warn!("run cache write-through failed: {err}");
    }
}

pub(crate) fn clear_cache<S: RunStore>(store: &S) {
    if let Err(err) = store.clear_run() {
        warn!("run cache clear failed: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DecisionKind;
    use crate::store::MemoryRunStore;
    use crate::test_support::ScriptedService;

    fn status(position: usize, total_score: i32, completed: bool) -> RunStatus {
        RunStatus {
            position,
            total_score,
            scenario_ids: vec![11, 12, 13, 14, 15],
            completed,
        }
    }

    fn log_entry(score: i32) -> DecisionLog {
        DecisionLog {
            text: "choice".to_string(),
            score,
            kind: DecisionKind::Save,
            why_matters: String::new(),
        }
    }

    fn cached_run(run_id: &str, position: usize, commits: usize) -> RunRecord {
        let mut run = RunRecord::fresh(run_id.to_string(), vec![11, 12, 13, 14, 15]);
        run.position = position;
        run.total_score = 5;
        run.history = (0..commits).map(|_| log_entry(5)).collect();
        run
    }

    #[tokio::test]
    async fn no_cache_means_fresh_without_network() {
        let api = ScriptedService::new();
        let store = MemoryRunStore::new();
        assert_eq!(restore_run(&api, &store, None).await, Restored::Fresh);
        assert_eq!(api.calls().get_run, 0);
    }

    #[tokio::test]
    async fn cached_run_is_reverified_and_overwritten() {
        let api = ScriptedService::new().with_run("42", status(2, 35, false));
        let store = MemoryRunStore::new();
        store.save_run(&cached_run("42", 1, 1)).unwrap();

        let Restored::InProgress(record) = restore_run(&api, &store, None).await else {
            panic!("expected in-progress restore");
        };
        // Server values win over the cached ones.
        assert_eq!(record.position, 2);
        assert_eq!(record.total_score, 35);
        assert!(!record.answered);
        assert_eq!(store.snapshot(), Some(record));
        assert_eq!(api.calls().get_run, 1);
    }

    #[tokio::test]
    async fn unknown_cached_run_clears_cache() {
        let api = ScriptedService::new();
        let store = MemoryRunStore::new();
        store.save_run(&cached_run("42", 1, 1)).unwrap();

        assert_eq!(restore_run(&api, &store, None).await, Restored::Fresh);
        assert_eq!(store.snapshot(), None);
    }

    #[tokio::test]
    async fn malformed_cached_id_clears_without_network() {
        let api = ScriptedService::new();
        let store = MemoryRunStore::new();
        store.save_run(&cached_run("not-a-run", 0, 0)).unwrap();

        assert_eq!(restore_run(&api, &store, None).await, Restored::Fresh);
        assert_eq!(store.snapshot(), None);
        assert_eq!(api.calls().get_run, 0);
    }

    #[tokio::test]
    async fn transport_failure_during_verification_discards_cache() {
        let api = ScriptedService::new().with_run("42", status(1, 20, false));
        api.fail_get_run(crate::service::ServiceError::Transport("offline".to_string()));
        let store = MemoryRunStore::new();
        store.save_run(&cached_run("42", 1, 1)).unwrap();

        assert_eq!(restore_run(&api, &store, None).await, Restored::Fresh);
        assert_eq!(store.snapshot(), None);
    }

    #[tokio::test]
    async fn explicit_id_takes_precedence_over_cache() {
        let api = ScriptedService::new()
            .with_run("7", status(0, 0, false))
            .with_run("8", status(3, 60, false));
        let store = MemoryRunStore::new();
        store.save_run(&cached_run("7", 0, 0)).unwrap();

        let Restored::InProgress(record) = restore_run(&api, &store, Some("8")).await else {
            panic!("expected in-progress restore");
        };
        assert_eq!(record.run_id, "8");
        assert!(record.history.is_empty());
        assert_eq!(store.snapshot().unwrap().run_id, "8");
    }

    #[tokio::test]
    async fn dead_explicit_id_never_falls_back_to_cache() {
        let api = ScriptedService::new().with_run("7", status(0, 0, false));
        let store = MemoryRunStore::new();
        store.save_run(&cached_run("7", 0, 0)).unwrap();

        assert_eq!(restore_run(&api, &store, Some("99")).await, Restored::Fresh);
        assert_eq!(store.snapshot(), None);
    }

    #[tokio::test]
    async fn completed_explicit_run_restores_completed() {
        let api = ScriptedService::new().with_run("9", status(2, 85, true));
        let store = MemoryRunStore::new();

        let Restored::Completed(record) = restore_run(&api, &store, Some("9")).await else {
            panic!("expected completed restore");
        };
        assert_eq!(record.total_score, 85);
        assert_eq!(record.position, record.scenario_ids.len());
        assert!(record.invariants_hold());
    }

    #[tokio::test]
    async fn answered_gate_survives_reload_when_position_matches() {
        let api = ScriptedService::new().with_run("5", status(1, 20, false));
        let store = MemoryRunStore::new();
        let mut cached = cached_run("5", 1, 2);
        cached.answered = true;
        store.save_run(&cached).unwrap();

        let Restored::InProgress(record) = restore_run(&api, &store, None).await else {
            panic!("expected in-progress restore");
        };
        assert!(record.answered);
        assert_eq!(record.history.len(), 2);
    }

    #[tokio::test]
    async fn answered_gate_resets_when_server_moved_on() {
        let api = ScriptedService::new().with_run("5", status(2, 30, false));
        let store = MemoryRunStore::new();
        let mut cached = cached_run("5", 1, 2);
        cached.answered = true;
        store.save_run(&cached).unwrap();

        let Restored::InProgress(record) = restore_run(&api, &store, None).await else {
            panic!("expected in-progress restore");
        };
        assert!(!record.answered);
        assert_eq!(record.history.len(), 2);
    }
}
