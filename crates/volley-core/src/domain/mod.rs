//! Domain model: what a task is and what a run produces.

mod errors;
mod ids;
mod result;
mod spec;

pub use errors::VolleyError;
pub use ids::TaskId;
pub use result::{MethodResult, MethodStatus, ResultsList, RunStatus, TaskResult, TaskStatus};
pub use spec::{TaskDefinition, TaskSpec};
