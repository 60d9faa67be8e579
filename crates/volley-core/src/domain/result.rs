//! Result records: the common shape of everything a run produces.
//!
//! One [`TaskResult`] exists for every submitted task, on every path:
//! clean pass, method failure, timeout, interrupt, or a task abandoned
//! before it ever ran.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::VolleyError;
use super::ids::TaskId;
use super::spec::TaskDefinition;

/// Per-method outcome classification.
///
/// Once one method fails, every later method in the task is recorded
/// `NotApplicable` and never invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodStatus {
    Ok,
    Failed,
    NotApplicable,
}

/// Outcome of one method invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodResult {
    pub name: String,
    pub status: MethodStatus,

    /// Present only when the method returned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_value: Option<Value>,

    /// Diagnostic text, present only on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_detail: Option<String>,
}

impl MethodResult {
    pub fn ok(name: impl Into<String>, return_value: Value) -> Self {
        Self {
            name: name.into(),
            status: MethodStatus::Ok,
            return_value: Some(return_value),
            failure_detail: None,
        }
    }

    pub fn failed(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: MethodStatus::Failed,
            return_value: None,
            failure_detail: Some(detail.into()),
        }
    }

    pub fn not_applicable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: MethodStatus::NotApplicable,
            return_value: None,
            failure_detail: None,
        }
    }
}

/// Overall status of one task.
///
/// `NotRun` marks a task abandoned unexecuted (queue flush or
/// interrupt); for analysis purposes it counts as non-passing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Passed,
    Failed,
    NotRun,
}

impl TaskStatus {
    pub fn is_passed(self) -> bool {
        self == Self::Passed
    }
}

/// The finalized record for one task.
///
/// Self-describing: name, target, and constructor params are copied
/// back from the definition so the record stands alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub id: TaskId,
    pub name: String,
    pub target: String,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,

    pub status: TaskStatus,

    /// Set when the task failed before any method could run, e.g. the
    /// target could not be constructed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_detail: Option<String>,

    /// Per-method records, in submission order.
    pub methods: Vec<MethodResult>,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl TaskResult {
    /// Empty template created when a worker picks the task up.
    pub fn template(def: &TaskDefinition) -> Self {
        let now = Utc::now();
        Self {
            id: def.id(),
            name: def.name().to_string(),
            target: def.target().to_string(),
            params: def.params().clone(),
            status: TaskStatus::NotRun,
            failure_detail: None,
            methods: Vec::with_capacity(def.methods().len()),
            started_at: now,
            finished_at: now,
        }
    }

    /// Record for a task abandoned unexecuted: every method
    /// not-applicable, overall status `NotRun`.
    pub fn skipped(def: &TaskDefinition) -> Self {
        let mut result = Self::template(def);
        for method in def.methods() {
            result.methods.push(MethodResult::not_applicable(method.as_str()));
        }
        result
    }

    pub fn finalize(&mut self, status: TaskStatus) {
        self.status = status;
        self.finished_at = Utc::now();
    }
}

/// Aggregate pass/fail over a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pass,
    Fail,
}

/// Append-only, ordered collection of task results, owned by the
/// runner. Order is completion order, not submission order; use
/// [`ResultsList::coordinate`] to match entries to definitions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultsList {
    entries: Vec<TaskResult>,
}

impl ResultsList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: TaskResult) {
        self.entries.push(result);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[TaskResult] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TaskResult> {
        self.entries.iter()
    }

    /// Pass iff every entry passed. Pure; calling it twice yields the
    /// same answer.
    pub fn analyze(&self) -> RunStatus {
        if self.entries.iter().all(|entry| entry.status.is_passed()) {
            RunStatus::Pass
        } else {
            RunStatus::Fail
        }
    }

    /// Find the result whose id matches the given definition.
    pub fn coordinate(&self, def: &TaskDefinition) -> Result<&TaskResult, VolleyError> {
        self.entries
            .iter()
            .find(|entry| entry.id == def.id())
            .ok_or(VolleyError::CorrelationMiss(def.id()))
    }
}

impl<'a> IntoIterator for &'a ResultsList {
    type Item = &'a TaskResult;
    type IntoIter = std::slice::Iter<'a, TaskResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
