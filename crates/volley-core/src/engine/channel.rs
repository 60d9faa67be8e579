//! The inbound task channel.
//!
//! FIFO, safe for one producer and many consumers. The stop sentinel
//! is an explicit [`Dispatch`] variant; workers consume it like any
//! other item, one per worker.

use std::collections::VecDeque;

use tokio::sync::{Mutex, Notify};

use crate::domain::TaskDefinition;

/// One item on the task channel.
#[derive(Debug, Clone)]
pub enum Dispatch {
    Task(TaskDefinition),
    /// Tells a worker to stop consuming.
    Stop,
}

/// In-memory FIFO task channel shared between the runner and its
/// workers. The runner owns creation; workers only read.
#[derive(Debug, Default)]
pub struct TaskChannel {
    queue: Mutex<VecDeque<Dispatch>>,
    notify: Notify,
}

impl TaskChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn send(&self, dispatch: Dispatch) {
        let mut queue = self.queue.lock().await;
        queue.push_back(dispatch);
        drop(queue);
        // notify outside the lock
        self.notify.notify_one();
    }

    /// Pop the next item, waiting until one is available.
    pub async fn recv(&self) -> Dispatch {
        loop {
            if let Some(dispatch) = self.queue.lock().await.pop_front() {
                return dispatch;
            }
            self.notify.notified().await;
        }
    }

    pub async fn is_empty(&self) -> bool {
        self.queue.lock().await.is_empty()
    }

    /// Remove and return every queued task up to but excluding a stop
    /// sentinel, atomically. This is the flush primitive: each drained
    /// task is converted to a not-run result by the caller.
    pub async fn drain_pending(&self) -> Vec<TaskDefinition> {
        let mut queue = self.queue.lock().await;
        let mut drained = Vec::new();
        while matches!(queue.front(), Some(Dispatch::Task(_))) {
            if let Some(Dispatch::Task(def)) = queue.pop_front() {
                drained.push(def);
            }
        }
        drained
    }
}
