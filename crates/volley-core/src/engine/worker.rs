//! Worker side of the engine: the consume loop, per-method execution
//! with timeout and interrupt racing, and the pool handle.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::cancel::{CancelToken, cancelled};
use super::channel::{Dispatch, TaskChannel};
use crate::domain::{MethodResult, TaskDefinition, TaskResult, TaskStatus};
use crate::target::{DynTarget, TargetRegistry};

/// How tasks in one run relate to each other.
///
/// Sequential tasks are assumed interdependent: one failure voids the
/// rest of the queue. Concurrent tasks are independent: only an
/// external interrupt abandons siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Concurrent,
    Sequential,
}

/// Why a task stopped short of completing all its methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailureKind {
    /// The target's method (or its construction) reported an error.
    Error,
    /// A method exceeded the task's per-method timeout.
    Timeout,
    /// The whole run was cancelled from outside.
    Interrupted,
}

/// Consume tasks until a stop sentinel, a flush, or (sequentially) an
/// empty channel after a success. Emits exactly one result per task
/// picked up, plus one not-run result per task drained by a flush.
pub(crate) async fn worker_loop(
    worker_id: usize,
    channel: Arc<TaskChannel>,
    registry: Arc<TargetRegistry>,
    done_tx: mpsc::UnboundedSender<TaskResult>,
    mode: ExecutionMode,
    mut cancel: watch::Receiver<bool>,
) {
    loop {
        let dispatch = tokio::select! {
            _ = cancelled(&mut cancel) => {
                // interrupted while idle: abandon whatever is queued
                flush(&channel, &done_tx).await;
                break;
            }
            dispatch = channel.recv() => dispatch,
        };
        let def = match dispatch {
            Dispatch::Stop => break,
            Dispatch::Task(def) => def,
        };
        debug!(worker_id, task = %def.name(), id = %def.id(), "task leased");

        let (result, failure) = run_task(&def, &registry, &mut cancel).await;
        let clean = failure.is_none();
        if done_tx.send(result).is_err() {
            // collector is gone; nothing left to report to
            break;
        }

        let flush_queue = match (mode, failure) {
            (ExecutionMode::Sequential, Some(_)) => true,
            (ExecutionMode::Concurrent, Some(FailureKind::Interrupted)) => true,
            _ => false,
        };
        if flush_queue {
            warn!(worker_id, task = %def.name(), "flushing queued tasks");
            flush(&channel, &done_tx).await;
            break;
        }
        if mode == ExecutionMode::Sequential && clean && channel.is_empty().await {
            // single pass: nothing queued, no sentinel needed
            break;
        }
    }
}

/// Convert every still-queued task into a not-run result.
async fn flush(channel: &TaskChannel, done_tx: &mpsc::UnboundedSender<TaskResult>) {
    for def in channel.drain_pending().await {
        debug!(task = %def.name(), id = %def.id(), "task abandoned unexecuted");
        let _ = done_tx.send(TaskResult::skipped(&def));
    }
}

/// Construct the target and invoke its methods in order, stopping at
/// the first failure. Always returns a finalized result.
pub(crate) async fn run_task(
    def: &TaskDefinition,
    registry: &TargetRegistry,
    cancel: &mut watch::Receiver<bool>,
) -> (TaskResult, Option<FailureKind>) {
    let mut result = TaskResult::template(def);

    let mut target = match registry.construct(def.target(), def.params()) {
        Ok(target) => target,
        Err(err) => {
            warn!(task = %def.name(), error = %err, "target construction failed");
            result.failure_detail = Some(err.to_string());
            for method in def.methods() {
                result.methods.push(MethodResult::not_applicable(method.as_str()));
            }
            result.finalize(TaskStatus::Failed);
            return (result, Some(FailureKind::Error));
        }
    };

    let mut failure = None;
    let mut remaining = def.methods().iter();
    while let Some(method) = remaining.next() {
        match invoke_method(target.as_mut(), def, method, cancel).await {
            Ok(value) => result.methods.push(MethodResult::ok(method.as_str(), value)),
            Err((kind, detail)) => {
                warn!(task = %def.name(), method = %method, detail = %detail, "method failed");
                result.methods.push(MethodResult::failed(method.as_str(), detail));
                for rest in remaining.by_ref() {
                    result.methods.push(MethodResult::not_applicable(rest.as_str()));
                }
                failure = Some(kind);
                break;
            }
        }
    }

    result.finalize(if failure.is_some() {
        TaskStatus::Failed
    } else {
        TaskStatus::Passed
    });
    (result, failure)
}

/// One method call, raced against the run-level interrupt.
async fn invoke_method(
    target: &mut dyn DynTarget,
    def: &TaskDefinition,
    method: &str,
    cancel: &mut watch::Receiver<bool>,
) -> Result<serde_json::Value, (FailureKind, String)> {
    tokio::select! {
        _ = cancelled(cancel) => Err((
            FailureKind::Interrupted,
            format!(
                "task '{}': run interrupted before method '{}' returned",
                def.name(),
                method
            ),
        )),
        outcome = invoke_with_deadline(target, def, method) => outcome,
    }
}

/// One method call under the task's per-method timeout, when it has
/// one. The deadline covers only this call; it is rearmed per method.
async fn invoke_with_deadline(
    target: &mut dyn DynTarget,
    def: &TaskDefinition,
    method: &str,
) -> Result<serde_json::Value, (FailureKind, String)> {
    let call = target.invoke(method);
    match def.timeout() {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err((FailureKind::Error, err.to_string())),
            Err(_) => Err((
                FailureKind::Timeout,
                format!(
                    "task '{}', method '{}': reached timeout after {:?}",
                    def.name(),
                    method,
                    limit
                ),
            )),
        },
        None => call.await.map_err(|err| (FailureKind::Error, err.to_string())),
    }
}

/// Handle to a set of spawned workers. The runner owns it and either
/// joins every worker or forcibly terminates them before returning.
pub(crate) struct WorkerPool {
    joins: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `count` workers. Each worker sleeps `stagger * worker_id`
    /// before consuming, pacing starts so a burst of tasks does not
    /// hit shared resources all at once.
    pub(crate) fn spawn(
        count: usize,
        channel: Arc<TaskChannel>,
        registry: Arc<TargetRegistry>,
        done_tx: mpsc::UnboundedSender<TaskResult>,
        cancel: &CancelToken,
        stagger: Duration,
    ) -> Self {
        let mut joins = Vec::with_capacity(count);
        for worker_id in 0..count {
            let channel = Arc::clone(&channel);
            let registry = Arc::clone(&registry);
            let done_tx = done_tx.clone();
            let cancel = cancel.subscribe();
            let delay = stagger * worker_id as u32;
            joins.push(tokio::spawn(async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                worker_loop(
                    worker_id,
                    channel,
                    registry,
                    done_tx,
                    ExecutionMode::Concurrent,
                    cancel,
                )
                .await;
            }));
        }
        Self { joins }
    }

    /// Wait for every worker to exit on its own.
    pub(crate) async fn join_all(self) {
        for join in self.joins {
            let _ = join.await;
        }
    }

    /// Abort any worker still running, then reap the handles.
    pub(crate) async fn terminate(self) {
        for join in &self.joins {
            join.abort();
        }
        for join in self.joins {
            let _ = join.await;
        }
    }
}
