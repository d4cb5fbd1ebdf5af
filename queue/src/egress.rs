// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Egress buffer.
//!
//! Every port has `queues_per_port` queues, one per PSA priority. Priorities are mapped to
//! internal queue indices as `queues_per_port - 1 - priority`, and queue index 0 is serviced
//! first, so numerically larger priorities win. Each queue is FIFO, has its own capacity and
//! may be rate limited: an item pushed into a queue limited to `r` packets per second is not
//! eligible before `1e9 / r` ns have elapsed since the previous item of that queue became
//! eligible. Ports are statically assigned to workers (`port % workers`) and a worker only
//! dequeues from its own ports.

use crate::errors::{QueueError, Rejected};
use ordermap::OrderMap;
use sim::SimTime;
use std::collections::VecDeque;
use std::time::Duration;
#[allow(unused)]
use tracing::{debug, trace, warn};

/// Minimum interval, in ns, between two dequeues of a queue limited to `rate_pps`.
/// A rate of 0 means unlimited.
#[must_use]
pub const fn delay_ns(rate_pps: u64) -> u64 {
    if rate_pps == 0 {
        0
    } else {
        1_000_000_000 / rate_pps
    }
}

#[derive(Debug)]
struct Entry<T> {
    item: T,
    send_at: SimTime,
    seq: u64,
}

#[derive(Debug)]
struct Queue<T> {
    entries: VecDeque<Entry<T>>,
    capacity: usize,
    rate_pps: u64,
    last_send: Option<SimTime>,
}

impl<T> Queue<T> {
    fn new(capacity: usize, rate_pps: u64) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
            rate_pps,
            last_send: None,
        }
    }

    fn next_send(&self, now: SimTime) -> SimTime {
        match self.last_send {
            None => now,
            Some(last) => now.max(last + Duration::from_nanos(delay_ns(self.rate_pps))),
        }
    }
}

/// An item removed from the egress buffer
#[derive(Debug)]
pub struct Dequeued<T> {
    pub port: u32,
    /// PSA priority of the queue the item was taken from
    pub priority: usize,
    pub item: T,
}

/// Per-port, per-priority queues, capacity bounded and rate limited
#[derive(Debug)]
pub struct EgressBuffer<T> {
    queues_per_port: usize,
    workers: usize,
    capacity: usize,
    rate_pps: u64,
    ports: OrderMap<u32, Vec<Queue<T>>>,
    next_seq: u64,
    len: usize,
    closed: bool,
}

impl<T> EgressBuffer<T> {
    /// Create an egress buffer. `capacity` is the default capacity of every queue.
    #[must_use]
    pub fn new(queues_per_port: usize, workers: usize, capacity: usize) -> Self {
        Self {
            queues_per_port: queues_per_port.max(1),
            workers: workers.max(1),
            capacity,
            rate_pps: 0,
            ports: OrderMap::new(),
            next_seq: 0,
            len: 0,
            closed: false,
        }
    }

    #[must_use]
    pub fn queues_per_port(&self) -> usize {
        self.queues_per_port
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// The worker in charge of dequeuing from `port`
    #[must_use]
    pub fn worker_of(&self, port: u32) -> usize {
        port as usize % self.workers
    }

    fn index(&self, priority: usize) -> Result<usize, QueueError> {
        if priority >= self.queues_per_port {
            return Err(QueueError::PriorityOutOfRange {
                priority,
                queues: self.queues_per_port,
            });
        }
        Ok(self.queues_per_port - 1 - priority)
    }

    fn port_queues(&mut self, port: u32) -> &mut Vec<Queue<T>> {
        let (queues, capacity, rate_pps) = (self.queues_per_port, self.capacity, self.rate_pps);
        self.ports
            .entry(port)
            .or_insert_with(|| (0..queues).map(|_| Queue::new(capacity, rate_pps)).collect())
    }

    /// Append an item to the queue of `port` with PSA priority `priority`.
    /// # Errors
    ///
    /// The item is handed back if the priority is out of range, the queue is full or the
    /// buffer is closed.
    pub fn push(&mut self, port: u32, priority: usize, item: T, now: SimTime) -> Result<(), Rejected<T>> {
        if self.closed {
            return Err(Rejected::new(QueueError::Closed, item));
        }
        let index = match self.index(priority) {
            Ok(index) => index,
            Err(e) => return Err(Rejected::new(e, item)),
        };
        let seq = self.next_seq;
        let queue = &mut self.port_queues(port)[index];
        if queue.entries.len() >= queue.capacity {
            return Err(Rejected::new(QueueError::QueueFull { port, priority }, item));
        }
        let send_at = queue.next_send(now);
        queue.last_send = Some(send_at);
        queue.entries.push_back(Entry { item, send_at, seq });
        self.next_seq += 1;
        self.len += 1;
        trace!("Queued item {seq} on port {port} priority {priority}, eligible at {send_at}");
        Ok(())
    }

    /// Remove the highest priority item that is eligible at `now` from the ports of `worker`.
    /// Among queues of equal priority, the item that became eligible first is picked.
    /// # Errors
    ///
    /// Fails if `worker` does not exist.
    pub fn pop(&mut self, worker: usize, now: SimTime) -> Result<Option<Dequeued<T>>, QueueError> {
        if worker >= self.workers {
            return Err(QueueError::UnknownWorker(worker));
        }
        if self.len == 0 {
            return Ok(None);
        }
        for index in 0..self.queues_per_port {
            let mut best: Option<(SimTime, u64, u32)> = None;
            for (port, queues) in &self.ports {
                if self.worker_of(*port) != worker {
                    continue;
                }
                let Some(head) = queues[index].entries.front() else {
                    continue;
                };
                if head.send_at <= now
                    && best.is_none_or(|(at, seq, _)| (head.send_at, head.seq) < (at, seq))
                {
                    best = Some((head.send_at, head.seq, *port));
                }
            }
            if let Some((_, _, port)) = best {
                let entry = self
                    .ports
                    .get_mut(&port)
                    .and_then(|queues| queues[index].entries.pop_front());
                if let Some(entry) = entry {
                    self.len -= 1;
                    return Ok(Some(Dequeued {
                        port,
                        priority: self.queues_per_port - 1 - index,
                        item: entry.item,
                    }));
                }
            }
        }
        Ok(None)
    }

    /// Total number of queued items
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of items queued on `port`, all priorities
    #[must_use]
    pub fn port_len(&self, port: u32) -> usize {
        self.ports
            .get(&port)
            .map_or(0, |queues| queues.iter().map(|q| q.entries.len()).sum())
    }

    /// Number of items queued on `port` with PSA priority `priority`
    #[must_use]
    pub fn queue_len(&self, port: u32, priority: usize) -> usize {
        let Ok(index) = self.index(priority) else {
            return 0;
        };
        self.ports
            .get(&port)
            .map_or(0, |queues| queues[index].entries.len())
    }

    /// Ports that have been used or configured so far
    pub fn ports(&self) -> impl Iterator<Item = u32> + '_ {
        self.ports.keys().copied()
    }

    /// Capacity of the queue of `port` with PSA priority `priority`
    #[must_use]
    pub fn capacity(&self, port: u32, priority: usize) -> Option<usize> {
        let index = self.index(priority).ok()?;
        match self.ports.get(&port) {
            Some(queues) => Some(queues[index].capacity),
            None => Some(self.capacity),
        }
    }

    /// Rate limit of the queue of `port` with PSA priority `priority`
    #[must_use]
    pub fn rate(&self, port: u32, priority: usize) -> Option<u64> {
        let index = self.index(priority).ok()?;
        match self.ports.get(&port) {
            Some(queues) => Some(queues[index].rate_pps),
            None => Some(self.rate_pps),
        }
    }

    pub fn set_capacity(&mut self, port: u32, priority: usize, capacity: usize) -> Result<(), QueueError> {
        let index = self.index(priority)?;
        self.port_queues(port)[index].capacity = capacity;
        Ok(())
    }

    pub fn set_port_capacity(&mut self, port: u32, capacity: usize) {
        for queue in self.port_queues(port).iter_mut() {
            queue.capacity = capacity;
        }
    }

    /// Set the capacity of every queue, including those of ports not used yet
    pub fn set_capacity_for_all(&mut self, capacity: usize) {
        self.capacity = capacity;
        for queue in self.ports.values_mut().flatten() {
            queue.capacity = capacity;
        }
    }

    /// Rate limit a queue. Items already queued keep their eligibility time.
    pub fn set_rate(&mut self, port: u32, priority: usize, rate_pps: u64) -> Result<(), QueueError> {
        let index = self.index(priority)?;
        self.port_queues(port)[index].rate_pps = rate_pps;
        Ok(())
    }

    pub fn set_port_rate(&mut self, port: u32, rate_pps: u64) {
        for queue in self.port_queues(port).iter_mut() {
            queue.rate_pps = rate_pps;
        }
    }

    /// Internal index of the queue serving PSA priority `priority`. Index 0 is served first.
    #[must_use]
    pub fn queue_index(&self, priority: usize) -> Option<usize> {
        self.index(priority).ok()
    }

    fn check_queue(&self, queue: usize) -> Result<(), QueueError> {
        if queue >= self.queues_per_port {
            return Err(QueueError::QueueOutOfRange {
                queue,
                queues: self.queues_per_port,
            });
        }
        Ok(())
    }

    /// Set the capacity of internal queue `queue` of `port`
    pub fn set_queue_capacity(&mut self, port: u32, queue: usize, capacity: usize) -> Result<(), QueueError> {
        self.check_queue(queue)?;
        self.port_queues(port)[queue].capacity = capacity;
        Ok(())
    }

    /// Rate limit internal queue `queue` of `port`
    pub fn set_queue_rate(&mut self, port: u32, queue: usize, rate_pps: u64) -> Result<(), QueueError> {
        self.check_queue(queue)?;
        self.port_queues(port)[queue].rate_pps = rate_pps;
        Ok(())
    }

    /// Rate limit every queue, including those of ports not used yet
    pub fn set_rate_for_all(&mut self, rate_pps: u64) {
        self.rate_pps = rate_pps;
        for queue in self.ports.values_mut().flatten() {
            queue.rate_pps = rate_pps;
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Refuse any further item and discard the queued ones. Returns how many were discarded.
    pub fn close(&mut self) -> usize {
        self.closed = true;
        let discarded = self.len;
        for queue in self.ports.values_mut().flatten() {
            queue.entries.clear();
        }
        self.len = 0;
        debug!("Egress buffer closed, discarded {discarded} items");
        discarded
    }
}
