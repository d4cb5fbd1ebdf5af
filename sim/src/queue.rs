// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Deterministic event queue

use crate::{Clock, EventId, Scheduler, SimTime};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::Duration;
#[allow(unused)]
use tracing::{debug, trace};

/// Events ordered by firing time; events due at the same time fire in the order they were
/// scheduled.
#[derive(Debug)]
pub struct EventQueue<E> {
    now: SimTime,
    next_id: u64,
    heap: BinaryHeap<Reverse<(SimTime, u64)>>,
    pending: HashMap<u64, E>,
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventQueue<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: SimTime::ZERO,
            next_id: 0,
            heap: BinaryHeap::new(),
            pending: HashMap::new(),
        }
    }

    /// Number of pending events
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Schedule an event at an absolute time. Times in the past fire at the current time.
    pub fn schedule_at(&mut self, at: SimTime, event: E) -> EventId {
        let id = self.next_id;
        self.next_id += 1;
        self.heap.push(Reverse((at.max(self.now), id)));
        self.pending.insert(id, event);
        EventId(id)
    }

    /// Firing time of the next pending event
    #[must_use]
    pub fn peek_time(&mut self) -> Option<SimTime> {
        while let Some(Reverse((at, id))) = self.heap.peek().copied() {
            if self.pending.contains_key(&id) {
                return Some(at);
            }
            self.heap.pop();
        }
        None
    }

    /// Remove the next event and move the clock to its firing time
    pub fn pop(&mut self) -> Option<(SimTime, E)> {
        while let Some(Reverse((at, id))) = self.heap.pop() {
            if let Some(event) = self.pending.remove(&id) {
                self.now = at;
                return Some((at, event));
            }
        }
        None
    }

    /// Fire every event due up to and including `until`, then move the clock to `until`.
    /// Returns the number of events fired.
    pub fn run_until(&mut self, until: SimTime, mut handler: impl FnMut(&mut Self, E)) -> usize {
        let mut fired = 0;
        while let Some(at) = self.peek_time() {
            if at > until {
                break;
            }
            let Some((_, event)) = self.pop() else {
                break;
            };
            handler(self, event);
            fired += 1;
        }
        self.now = self.now.max(until);
        trace!("Ran {fired} events until {until}");
        fired
    }
}

impl<E> Clock for EventQueue<E> {
    fn now(&self) -> SimTime {
        self.now
    }
}

impl<E> Scheduler<E> for EventQueue<E> {
    fn schedule(&mut self, delay: Duration, event: E) -> EventId {
        self.schedule_at(self.now + delay, event)
    }

    fn cancel(&mut self, id: EventId) -> bool {
        self.pending.remove(&id.0).is_some()
    }
}
