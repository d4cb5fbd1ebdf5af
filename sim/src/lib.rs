// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Simulated time.
//!
//! The switch never reads wall-clock time. It gets the current time from a [`Clock`] and
//! defers work by scheduling events on a [`Scheduler`]. [`EventQueue`] is a deterministic,
//! single-threaded implementation of both.

#![deny(clippy::all, clippy::pedantic)]

mod queue;
mod time;

pub use queue::EventQueue;
pub use time::SimTime;

use std::time::Duration;

/// Source of the current simulated time
pub trait Clock {
    fn now(&self) -> SimTime;
}

/// Handle to a scheduled event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub(crate) u64);

/// Ability to run an event at a later simulated time
pub trait Scheduler<E>: Clock {
    /// Schedule `event` to fire `delay` after the current time
    fn schedule(&mut self, delay: Duration, event: E) -> EventId;
    /// Cancel a pending event. Returns false if it already fired or was cancelled.
    fn cancel(&mut self, id: EventId) -> bool;
}
