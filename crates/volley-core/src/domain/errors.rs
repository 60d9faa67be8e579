use thiserror::Error;

use super::ids::TaskId;
use super::result::ResultsList;

/// Everything that can go wrong in a run.
///
/// Failures inside a task's method execution never escape the worker
/// as errors; they are folded into result records. Only configuration
/// problems and the opt-in aggregate failure reach the caller raised.
#[derive(Debug, Error)]
pub enum VolleyError {
    #[error("required field '{field}' missing or empty on task '{task}'")]
    MissingField { field: &'static str, task: String },

    #[error("no target registered for type '{0}'")]
    UnknownTarget(String),

    #[error("duplicate target registration for type '{0}'")]
    DuplicateTarget(String),

    #[error("invalid parameters for target '{target}': {source}")]
    InvalidParams {
        target: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("target '{target}' has no method '{method}'")]
    UnknownMethod { target: String, method: String },

    /// A target method reported failure.
    #[error("{0}")]
    Method(String),

    #[error("no result correlates with task {0}")]
    CorrelationMiss(TaskId),

    /// Returned after a completed run when `raise_on_failure` is set
    /// and any task finished non-passing. Carries the full collection
    /// for inspection.
    #[error("one or more tasks finished with a non-passing status")]
    RunFailed { results: ResultsList },
}
