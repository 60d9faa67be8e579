//! The orchestrator: stages task definitions, sizes and launches the
//! worker set, drains the completion channel, and correlates results.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{info, warn};

use super::cancel::{CancelToken, cancelled};
use super::channel::{Dispatch, TaskChannel};
use super::worker::{ExecutionMode, WorkerPool, worker_loop};
use crate::domain::{ResultsList, RunStatus, TaskDefinition, TaskSpec, VolleyError};
use crate::target::TargetRegistry;

/// Upper bound on concurrent workers for one run.
pub const MAX_WORKERS: usize = 10;

/// Number of workers for a run: `min(10, tasks)` concurrently, always
/// one sequentially.
pub fn pool_size(task_count: usize, sequential: bool) -> usize {
    if sequential {
        1
    } else {
        task_count.min(MAX_WORKERS)
    }
}

/// Knobs for one run.
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Run tasks one by one on a single path instead of across a pool.
    pub sequential: bool,

    /// Surface [`VolleyError::RunFailed`] when any task finishes
    /// non-passing.
    pub raise_on_failure: bool,

    /// Delay between worker starts in concurrent mode. Must be
    /// positive; pacing, not correctness.
    pub stagger: Duration,

    /// How long to keep collecting results after an interrupt before
    /// giving up on stragglers.
    pub drain_grace: Duration,

    /// External interrupt handle for the whole run. Keep a clone and
    /// fire it to switch the runner to a bounded drain.
    pub cancel: CancelToken,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            sequential: false,
            raise_on_failure: false,
            stagger: Duration::from_millis(25),
            drain_grace: Duration::from_millis(250),
            cancel: CancelToken::new(),
        }
    }
}

/// Executes batches of tasks against a fixed registry.
pub struct Runner {
    registry: Arc<TargetRegistry>,
}

impl Runner {
    pub fn new(registry: TargetRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// Run a batch. Exactly one result is collected per submitted
    /// task unless the run is interrupted, in which case whatever was
    /// collected within the grace period comes back as a partial
    /// collection.
    pub async fn execute(
        &self,
        specs: Vec<TaskSpec>,
        options: ExecuteOptions,
    ) -> Result<ResultsList, VolleyError> {
        let started = Instant::now();
        info!(
            mode = if options.sequential {
                "sequential"
            } else {
                "concurrent"
            },
            tasks = specs.len(),
            "run starting"
        );

        // stage: validate, assign ids, enqueue
        let channel = Arc::new(TaskChannel::new());
        let mut definitions = Vec::with_capacity(specs.len());
        for (index, spec) in specs.into_iter().enumerate() {
            let def = TaskDefinition::new(spec)?;
            info!(
                index = index + 1,
                task = %def.name(),
                target = %def.target(),
                methods = ?def.methods(),
                "task staged"
            );
            channel.send(Dispatch::Task(def.clone())).await;
            definitions.push(def);
        }

        let task_count = definitions.len();
        if task_count == 0 {
            info!("no tasks submitted, nothing to run");
            return Ok(ResultsList::new());
        }

        let worker_count = pool_size(task_count, options.sequential);
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        let mut cancel = options.cancel.subscribe();

        let pool = if options.sequential {
            worker_loop(
                0,
                Arc::clone(&channel),
                Arc::clone(&self.registry),
                done_tx,
                ExecutionMode::Sequential,
                options.cancel.subscribe(),
            )
            .await;
            None
        } else {
            Some(WorkerPool::spawn(
                worker_count,
                Arc::clone(&channel),
                Arc::clone(&self.registry),
                done_tx,
                &options.cancel,
                options.stagger,
            ))
        };

        // collect exactly one result per task, racing the interrupt
        let mut results = ResultsList::new();
        let mut interrupted = false;
        for _ in 0..task_count {
            tokio::select! {
                _ = cancelled(&mut cancel) => {
                    interrupted = true;
                    break;
                }
                received = done_rx.recv() => match received {
                    Some(result) => results.push(result),
                    None => break, // every worker is gone
                },
            }
        }

        if interrupted {
            // bounded drain: take whatever already completed
            warn!("run interrupted, draining completed results");
            tokio::time::sleep(options.drain_grace).await;
            while let Ok(result) = done_rx.try_recv() {
                results.push(result);
            }
        }

        // one sentinel per worker lets stragglers exit cleanly
        for _ in 0..worker_count {
            channel.send(Dispatch::Stop).await;
        }
        if let Some(pool) = pool {
            if interrupted {
                pool.terminate().await;
            } else {
                pool.join_all().await;
            }
        }

        // correlate results back to their definitions
        if interrupted {
            for def in &definitions {
                if results.coordinate(def).is_err() {
                    warn!(task = %def.name(), id = %def.id(), "no result collected before interrupt");
                }
            }
        } else {
            for def in &definitions {
                results.coordinate(def)?;
            }
        }

        let (hours, minutes, seconds) = split_duration(started.elapsed());
        info!("run complete, total duration {hours}h:{minutes}m:{seconds}s");

        if interrupted {
            info!(
                collected = results.len(),
                submitted = task_count,
                "returning partial results"
            );
            return Ok(results);
        }
        if options.raise_on_failure && results.analyze() == RunStatus::Fail {
            return Err(VolleyError::RunFailed { results });
        }
        Ok(results)
    }
}

fn split_duration(elapsed: Duration) -> (u64, u64, u64) {
    let total = elapsed.as_secs();
    (total / 3600, total % 3600 / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MethodStatus, TaskStatus};
    use crate::engine::fixtures;
    use rstest::rstest;
    use serde_json::json;

    fn runner() -> Runner {
        Runner::new(fixtures::registry())
    }

    #[rstest]
    #[case(12, false, 10)]
    #[case(3, false, 3)]
    #[case(10, false, 10)]
    #[case(12, true, 1)]
    #[case(0, false, 0)]
    fn pool_size_is_capped(
        #[case] task_count: usize,
        #[case] sequential: bool,
        #[case] expected: usize,
    ) {
        assert_eq!(pool_size(task_count, sequential), expected);
    }

    #[test]
    fn split_duration_breaks_into_h_m_s() {
        assert_eq!(split_duration(Duration::from_secs(3725)), (1, 2, 5));
        assert_eq!(split_duration(Duration::from_secs(59)), (0, 0, 59));
    }

    #[tokio::test]
    async fn a_failing_method_fails_the_task_but_keeps_earlier_results() {
        let specs = vec![fixtures::spec("car", "invalid_car", &["exterior", "interior"])];
        let results = runner().execute(specs, ExecuteOptions::default()).await.unwrap();

        assert_eq!(results.len(), 1);
        let entry = &results.entries()[0];
        assert_eq!(entry.status, TaskStatus::Failed);
        assert_eq!(entry.methods[0].status, MethodStatus::Ok);
        assert_eq!(entry.methods[1].status, MethodStatus::Failed);
        assert!(entry.methods[1].failure_detail.is_some());
        assert_eq!(results.analyze(), RunStatus::Fail);
    }

    #[tokio::test]
    async fn twelve_passing_tasks_come_back_complete() {
        let specs: Vec<_> = (0..12)
            .map(|i| fixtures::spec(&format!("car {i}"), "valid_car", &["exterior", "interior"]))
            .collect();
        let options = ExecuteOptions {
            stagger: Duration::from_millis(1),
            ..ExecuteOptions::default()
        };
        let results = runner().execute(specs, options).await.unwrap();

        assert_eq!(results.len(), 12);
        assert_eq!(results.analyze(), RunStatus::Pass);
    }

    #[tokio::test]
    async fn sequential_failure_abandons_later_tasks() {
        let specs = vec![
            fixtures::spec("one", "valid_car", &["exterior"]),
            fixtures::spec("two", "invalid_car", &["exterior", "interior"]),
            fixtures::spec("three", "valid_car", &["exterior"]),
        ];
        let options = ExecuteOptions {
            sequential: true,
            ..ExecuteOptions::default()
        };
        let results = runner().execute(specs, options).await.unwrap();

        assert_eq!(results.len(), 3);
        let by_name = |name: &str| {
            results
                .iter()
                .find(|entry| entry.name == name)
                .unwrap()
                .clone()
        };
        assert_eq!(by_name("one").status, TaskStatus::Passed);
        assert_eq!(by_name("two").status, TaskStatus::Failed);
        let third = by_name("three");
        assert_eq!(third.status, TaskStatus::NotRun);
        assert!(
            third
                .methods
                .iter()
                .all(|m| m.status == MethodStatus::NotApplicable)
        );
    }

    #[tokio::test]
    async fn concurrent_failure_leaves_siblings_alone() {
        let specs = vec![
            fixtures::spec("one", "valid_car", &["exterior"]),
            fixtures::spec("two", "invalid_car", &["exterior", "interior"]),
            fixtures::spec("three", "valid_car", &["exterior"]),
        ];
        let options = ExecuteOptions {
            stagger: Duration::from_millis(1),
            ..ExecuteOptions::default()
        };
        let results = runner().execute(specs, options).await.unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(
            results
                .iter()
                .filter(|entry| entry.status == TaskStatus::Passed)
                .count(),
            2
        );
        assert!(results.iter().all(|entry| entry.status != TaskStatus::NotRun));
    }

    #[tokio::test]
    async fn raise_on_failure_carries_the_collection() {
        let specs = vec![fixtures::spec("car", "invalid_car", &["exterior", "interior"])];
        let options = ExecuteOptions {
            raise_on_failure: true,
            ..ExecuteOptions::default()
        };
        let err = runner().execute(specs, options).await.unwrap_err();
        match err {
            VolleyError::RunFailed { results } => {
                assert_eq!(results.len(), 1);
                assert_eq!(results.analyze(), RunStatus::Fail);
            }
            other => panic!("expected RunFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_field_aborts_before_any_execution() {
        let specs = vec![
            fixtures::spec("", "valid_car", &["exterior"]),
            fixtures::spec("fine", "valid_car", &["exterior"]),
        ];
        let err = runner()
            .execute(specs, ExecuteOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, VolleyError::MissingField { field: "name", .. }));
    }

    #[tokio::test]
    async fn empty_batch_is_a_passing_no_op() {
        let results = runner()
            .execute(Vec::new(), ExecuteOptions::default())
            .await
            .unwrap();
        assert!(results.is_empty());
        assert_eq!(results.analyze(), RunStatus::Pass);
    }

    #[tokio::test]
    async fn interrupt_returns_partial_results_instead_of_hanging() {
        let specs: Vec<_> = (0..4)
            .map(|i| {
                let mut spec = fixtures::spec(&format!("slow {i}"), "slow_car", &["crawl"]);
                spec.params.insert("delay_ms".to_string(), json!(60_000));
                spec
            })
            .collect();
        let options = ExecuteOptions {
            stagger: Duration::from_millis(1),
            ..ExecuteOptions::default()
        };
        let token = options.cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            token.cancel();
        });

        let results = tokio::time::timeout(
            Duration::from_secs(10),
            runner().execute(specs, options),
        )
        .await
        .expect("an interrupted run must return promptly")
        .unwrap();

        assert!(!results.is_empty());
        assert!(results.iter().all(|entry| entry.status != TaskStatus::Passed));
        assert_eq!(results.analyze(), RunStatus::Fail);
    }
}
