// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use crate::errors::{QueueError, Rejected};
use std::collections::VecDeque;
#[allow(unused)]
use tracing::{debug, trace};

/// Bounded FIFO holding packets that wait for ingress processing. Packets arriving from
/// ports and packets re-entering from resubmit or recirculation share it.
#[derive(Debug)]
pub struct InputBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
    closed: bool,
}

impl<T> InputBuffer<T> {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            closed: false,
        }
    }

    /// Append an item at the tail.
    /// # Errors
    ///
    /// The item is handed back if the buffer is full or closed.
    pub fn push(&mut self, item: T) -> Result<(), Rejected<T>> {
        if self.closed {
            return Err(Rejected::new(QueueError::Closed, item));
        }
        if self.items.len() >= self.capacity {
            return Err(Rejected::new(QueueError::InputFull, item));
        }
        self.items.push_back(item);
        Ok(())
    }

    /// Remove the item at the head
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Refuse any further item and discard the queued ones. Returns how many were discarded.
    pub fn close(&mut self) -> usize {
        self.closed = true;
        let discarded = self.items.len();
        self.items.clear();
        debug!("Input buffer closed, discarded {discarded} items");
        discarded
    }
}
