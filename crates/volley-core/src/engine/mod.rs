//! The execution engine: channel pair, workers, cancellation, and the
//! orchestrating runner.

mod cancel;
mod channel;
mod runner;
mod worker;

pub use cancel::CancelToken;
pub use channel::{Dispatch, TaskChannel};
pub use runner::{ExecuteOptions, MAX_WORKERS, Runner, pool_size};
pub use worker::ExecutionMode;

#[cfg(test)]
pub(crate) mod fixtures;
