//! volley-core
//!
//! Batch task execution engine. A run takes a list of task specs, each
//! naming a registered target type, its constructor parameters, and an
//! ordered list of methods to invoke, and produces exactly one result
//! record per submitted task whether it passed, failed, timed out, or
//! was abandoned before it ever ran.
//!
//! # Modules
//! - **domain**: task specs/definitions, ids, result records, errors
//! - **target**: the typed target capability layer and its registry
//! - **engine**: channels, workers, cancellation, and the runner

pub mod domain;
pub mod engine;
pub mod target;

pub use domain::{
    MethodResult, MethodStatus, ResultsList, RunStatus, TaskDefinition, TaskId, TaskResult,
    TaskSpec, TaskStatus, VolleyError,
};
pub use engine::{CancelToken, ExecuteOptions, MAX_WORKERS, Runner};
pub use target::{Target, TargetRegistry};
