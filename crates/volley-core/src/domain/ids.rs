use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Process-unique task identifier, assigned by the runner at staging
/// time. Callers never supply one; results correlate back to their
/// definition through it.
///
/// ULID-backed: sortable by creation time, no coordination needed.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Ulid);

impl TaskId {
    pub fn generate() -> Self {
        Self(Ulid::new())
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}
