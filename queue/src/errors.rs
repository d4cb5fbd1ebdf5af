// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Priority {priority} out of range: there are {queues} queues per port")]
    PriorityOutOfRange { priority: usize, queues: usize },
    #[error("Queue index {queue} out of range: there are {queues} queues per port")]
    QueueOutOfRange { queue: usize, queues: usize },
    #[error("Queue {priority} of port {port} is full")]
    QueueFull { port: u32, priority: usize },
    #[error("Input buffer is full")]
    InputFull,
    #[error("Buffer is closed")]
    Closed,
    #[error("Unknown worker {0}")]
    UnknownWorker(usize),
}

/// An item that a buffer refused, handed back to the caller
#[derive(Debug)]
pub struct Rejected<T> {
    pub error: QueueError,
    pub item: T,
}

impl<T> Rejected<T> {
    pub(crate) fn new(error: QueueError, item: T) -> Self {
        Self { error, item }
    }
    #[must_use]
    pub fn into_inner(self) -> T {
        self.item
    }
}
