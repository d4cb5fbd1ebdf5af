// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Egress timer.
//!
//! Egress is driven by a periodic tick whose interval derives from the line rate. Each
//! tick runs egress once for worker 0 and rearms itself. Once a first packet has been sent,
//! a tick that finds nothing to send schedules one extra attempt shortly after, so that a
//! packet that becomes eligible just after a tick does not wait for a whole interval.

use crate::pre::Replicator;
use crate::program::{Device, Program};
use crate::switch::PsaSwitch;
use sim::Scheduler;
use std::time::Duration;
#[allow(unused)]
use tracing::{debug, info, trace};

/// Events the switch schedules for itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchEvent {
    /// Periodic egress tick
    EgressTick,
    /// Extra egress attempt after an idle tick
    EgressCatchUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum TimerState {
    Idle,
    Armed,
}

#[derive(Debug, Clone)]
pub(crate) struct EgressTimer {
    interval: Duration,
    catch_up: Duration,
    state: TimerState,
    first_packet: bool,
}

impl EgressTimer {
    pub(crate) fn new(interval: Duration, catch_up: Duration) -> Self {
        Self {
            interval,
            catch_up,
            state: TimerState::Idle,
            first_packet: false,
        }
    }

    pub(crate) fn interval(&self) -> Duration {
        self.interval
    }

    pub(crate) fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub(crate) fn stop(&mut self) {
        self.state = TimerState::Idle;
    }
}

impl<P: Program, D: Device, R: Replicator> PsaSwitch<P, D, R> {
    #[must_use]
    pub fn timer_state(&self) -> TimerState {
        self.timer.state
    }

    /// Tell if egress has sent (or dropped) at least one packet from a tick
    #[must_use]
    pub fn first_packet_processed(&self) -> bool {
        self.timer.first_packet
    }

    /// Start the switch: detect queueing metadata and arm the egress timer. The first tick
    /// fires one interval from now. A zero interval (rate 0) leaves the timer idle.
    pub fn start<E, S>(&mut self, scheduler: &mut S)
    where
        E: From<SwitchEvent>,
        S: Scheduler<E>,
    {
        let switch = self.config.switch_id;
        self.check_queueing_metadata();
        if self.is_shut_down() {
            debug!(switch, "Not starting a switch that was shut down");
            return;
        }
        if self.timer.state == TimerState::Armed {
            debug!(switch, "Egress timer already armed");
            return;
        }
        if self.timer.interval.is_zero() {
            info!(switch, "Packet rate is 0: egress timer disabled");
            return;
        }
        scheduler.schedule(self.timer.interval, SwitchEvent::EgressTick.into());
        self.timer.state = TimerState::Armed;
        debug!(
            switch,
            "Egress timer armed at {} with interval {:?}",
            scheduler.now(),
            self.timer.interval
        );
    }

    /// Process an event previously scheduled by the switch
    pub fn handle_event<E, S>(&mut self, event: SwitchEvent, scheduler: &mut S)
    where
        E: From<SwitchEvent>,
        S: Scheduler<E>,
    {
        match event {
            SwitchEvent::EgressTick => self.egress_tick(scheduler),
            SwitchEvent::EgressCatchUp => {
                trace!(switch = self.config.switch_id, "Egress catch-up");
                self.handle_egress_pipeline(0, scheduler.now());
            }
        }
    }

    fn egress_tick<E, S>(&mut self, scheduler: &mut S)
    where
        E: From<SwitchEvent>,
        S: Scheduler<E>,
    {
        if self.timer.state != TimerState::Armed {
            return;
        }
        let sent = self.handle_egress_pipeline(0, scheduler.now());
        if self.timer.interval.is_zero() {
            info!(switch = self.config.switch_id, "Packet rate is 0: egress timer stopped");
            self.timer.state = TimerState::Idle;
        } else {
            scheduler.schedule(self.timer.interval, SwitchEvent::EgressTick.into());
        }
        if sent {
            self.timer.first_packet = true;
        } else if self.timer.first_packet {
            trace!(switch = self.config.switch_id, "Idle tick, scheduling catch-up");
            scheduler.schedule(self.timer.catch_up, SwitchEvent::EgressCatchUp.into());
        }
    }
}
