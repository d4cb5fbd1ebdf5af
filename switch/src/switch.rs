// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The switch object and its management surface. Packet processing lives in the
//! `ingress`, `egress` and `timer` modules.

use crate::config::SwitchConfig;
use crate::errors::ConfigError;
use crate::metadata::{PsaFields, QueueingFields};
use crate::mirroring::{MirrorTable, MirroringSessionConfig, SessionId};
use crate::pre::{Replicator, SimplePre};
use crate::program::{Address, Device, Gress, Program};
use crate::stats::{DropReason, SwitchStats};
use crate::timer::EgressTimer;

use hash::HashRegistry;
use packet::{Packet, PacketId};
use phv::{FieldId, Phv};
use queue::{EgressBuffer, InputBuffer, QueueError};
use std::time::Duration;
#[allow(unused)]
use tracing::{debug, info, trace, warn};

/// A PSA switch.
///
/// The switch owns its program, its buffers and the device it transmits to. All processing
/// happens synchronously in the calls made by the simulator: [`PsaSwitch::receive_packet`]
/// runs ingress, and egress runs when the events scheduled by [`PsaSwitch::start`] are
/// handed to [`PsaSwitch::handle_event`].
pub struct PsaSwitch<P: Program, D: Device, R: Replicator = SimplePre> {
    pub(crate) config: SwitchConfig,
    pub(crate) program: P,
    pub(crate) device: D,
    pub(crate) pre: R,
    pub(crate) fields: PsaFields,
    pub(crate) queueing: Option<QueueingFields>,
    pub(crate) hashes: HashRegistry,
    pub(crate) mirroring: MirrorTable,
    pub(crate) input: InputBuffer<Packet>,
    pub(crate) egress: EgressBuffer<Packet>,
    pub(crate) destinations: Vec<Address>,
    pub(crate) next_packet_id: PacketId,
    pub(crate) next_copy_id: u64,
    pub(crate) timer: EgressTimer,
    pub(crate) stats: SwitchStats,
    shut_down: bool,
}

impl<P: Program, D: Device> PsaSwitch<P, D, SimplePre> {
    /// Build a switch with an empty [`SimplePre`]
    pub fn new(config: SwitchConfig, program: P, device: D) -> Result<Self, ConfigError> {
        Self::with_replicator(config, program, device, SimplePre::new())
    }
}

impl<P: Program, D: Device, R: Replicator> PsaSwitch<P, D, R> {
    /// Build a switch.
    /// # Errors
    ///
    /// Fails if the configuration is invalid or if the program lacks a required metadata field.
    pub fn with_replicator(config: SwitchConfig, program: P, device: D, pre: R) -> Result<Self, ConfigError> {
        config.validate()?;
        let fields = PsaFields::resolve(program.schema())?;
        let mut egress = EgressBuffer::new(
            config.queues_per_port,
            config.egress_workers,
            config.queue_buffer_size,
        );
        egress.set_rate_for_all(config.packet_rate_pps);
        let timer = EgressTimer::new(config.egress_interval(), config.catch_up_delay());
        info!(
            switch = config.switch_id,
            "Created switch: {} queues per port, egress interval {:?}",
            config.queues_per_port,
            timer.interval()
        );
        Ok(Self {
            input: InputBuffer::new(config.input_buffer_size),
            egress,
            config,
            program,
            device,
            pre,
            fields,
            queueing: None,
            hashes: HashRegistry::with_defaults(),
            mirroring: MirrorTable::new(),
            destinations: Vec::new(),
            next_packet_id: 0,
            next_copy_id: 0,
            timer,
            stats: SwitchStats::new(),
            shut_down: false,
        })
    }

    #[must_use]
    pub fn config(&self) -> &SwitchConfig {
        &self.config
    }

    #[must_use]
    pub fn switch_id(&self) -> u32 {
        self.config.switch_id
    }

    #[must_use]
    pub fn stats(&self) -> &SwitchStats {
        &self.stats
    }

    #[must_use]
    pub fn program(&self) -> &P {
        &self.program
    }

    pub fn program_mut(&mut self) -> &mut P {
        &mut self.program
    }

    #[must_use]
    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    #[must_use]
    pub fn pre(&self) -> &R {
        &self.pre
    }

    pub fn pre_mut(&mut self) -> &mut R {
        &mut self.pre
    }

    /// Hash algorithms available to the program
    #[must_use]
    pub fn hashes(&self) -> &HashRegistry {
        &self.hashes
    }

    pub fn hashes_mut(&mut self) -> &mut HashRegistry {
        &mut self.hashes
    }

    /// Tell if `queueing_metadata` is filled in
    #[must_use]
    pub fn has_queueing_metadata(&self) -> bool {
        self.queueing.is_some()
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /////////////////////////////////////////////////////////////////////////
    // Mirroring
    /////////////////////////////////////////////////////////////////////////

    /// Add or replace a mirroring session
    pub fn add_mirroring_session(&mut self, id: SessionId, config: MirroringSessionConfig) {
        debug!(
            switch = self.config.switch_id,
            "Mirroring session {id}: mgid={:?} port={:?}", config.mgid, config.egress_port
        );
        self.mirroring.add(id, config);
    }

    #[must_use]
    pub fn mirroring_session(&self, id: SessionId) -> Option<MirroringSessionConfig> {
        self.mirroring.get(id).copied()
    }

    /// Remove a mirroring session. Returns false if it did not exist.
    pub fn delete_mirroring_session(&mut self, id: SessionId) -> bool {
        self.mirroring.delete(id).is_some()
    }

    /////////////////////////////////////////////////////////////////////////
    // Queues
    /////////////////////////////////////////////////////////////////////////

    /// Set the depth of one queue of `port`. `queue` is the internal queue index: queue 0
    /// serves the highest PSA priority, `queues_per_port - 1` serves priority 0.
    pub fn set_egress_priority_queue_depth(
        &mut self,
        port: u32,
        queue: usize,
        depth: usize,
    ) -> Result<(), QueueError> {
        self.egress.set_queue_capacity(port, queue, depth)
    }

    pub fn set_egress_queue_depth(&mut self, port: u32, depth: usize) {
        self.egress.set_port_capacity(port, depth);
    }

    pub fn set_all_egress_queue_depths(&mut self, depth: usize) {
        self.egress.set_capacity_for_all(depth);
    }

    /// Rate limit one queue of `port`. `queue` is the internal queue index, as for
    /// [`PsaSwitch::set_egress_priority_queue_depth`].
    pub fn set_egress_priority_queue_rate(
        &mut self,
        port: u32,
        queue: usize,
        rate_pps: u64,
    ) -> Result<(), QueueError> {
        self.egress.set_queue_rate(port, queue, rate_pps)
    }

    pub fn set_egress_queue_rate(&mut self, port: u32, rate_pps: u64) {
        self.egress.set_port_rate(port, rate_pps);
    }

    pub fn set_all_egress_queue_rates(&mut self, rate_pps: u64) {
        self.egress.set_rate_for_all(rate_pps);
    }

    /// Change the line rate. The egress tick interval becomes `1e9 / rate_pps` ns and every
    /// egress queue gets limited to `rate_pps`. Ticks already scheduled are not moved.
    pub fn set_packet_rate(&mut self, rate_pps: u64) {
        self.config.packet_rate_pps = rate_pps;
        self.timer.set_interval(self.config.egress_interval());
        self.egress.set_rate_for_all(rate_pps);
        info!(
            switch = self.config.switch_id,
            "Packet rate set to {rate_pps} pps, egress interval {:?}",
            self.timer.interval()
        );
    }

    /// Interval between two egress ticks
    #[must_use]
    pub fn egress_interval(&self) -> Duration {
        self.timer.interval()
    }

    /// Number of packets waiting for ingress
    #[must_use]
    pub fn input_len(&self) -> usize {
        self.input.len()
    }

    /// Number of packets waiting for egress
    #[must_use]
    pub fn egress_len(&self) -> usize {
        self.egress.len()
    }

    #[must_use]
    pub fn egress_port_len(&self, port: u32) -> usize {
        self.egress.port_len(port)
    }

    #[must_use]
    pub fn egress_queue_len(&self, port: u32, priority: usize) -> usize {
        self.egress.queue_len(port, priority)
    }

    /////////////////////////////////////////////////////////////////////////
    // Program lifecycle
    /////////////////////////////////////////////////////////////////////////

    /// Clear the state of the target that is not part of the program: multicast groups
    pub fn reset_target_state(&mut self) {
        debug!(switch = self.config.switch_id, "Resetting target state");
        self.pre.reset_state();
    }

    /// To be called once a new program is in place
    pub fn swap_notify(&mut self) {
        debug!(switch = self.config.switch_id, "Program swap notified");
        self.check_queueing_metadata();
    }

    /// Replace the program and return the previous one.
    /// # Errors
    ///
    /// Fails if swapping is disabled, if packets are still queued, or if the new program lacks
    /// a required metadata field. The switch is unchanged on failure.
    pub fn swap_program(&mut self, program: P) -> Result<P, ConfigError> {
        if !self.config.enable_swap {
            return Err(ConfigError::Invalid("program swap is disabled".to_string()));
        }
        if !self.input.is_empty() || !self.egress.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "{} packets still queued",
                self.input.len() + self.egress.len()
            )));
        }
        let fields = PsaFields::resolve(program.schema())?;
        let old = std::mem::replace(&mut self.program, program);
        self.fields = fields;
        self.swap_notify();
        Ok(old)
    }

    pub(crate) fn check_queueing_metadata(&mut self) {
        self.queueing = QueueingFields::resolve(self.program.schema());
        debug!(
            switch = self.config.switch_id,
            "Queueing metadata {}",
            if self.queueing.is_some() { "enabled" } else { "disabled" }
        );
    }

    /////////////////////////////////////////////////////////////////////////
    // Teardown
    /////////////////////////////////////////////////////////////////////////

    /// Stop the switch: the egress timer stops rearming and both buffers are closed.
    /// Queued packets are discarded and counted. Calling it again has no effect.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.timer.stop();
        let discarded = self.input.close() + self.egress.close();
        self.stats
            .count_drops(DropReason::BufferClosed, discarded as u64);
        info!(
            switch = self.config.switch_id,
            "Switch shut down, {discarded} queued packets discarded"
        );
    }

    /////////////////////////////////////////////////////////////////////////
    // Helpers shared by the pipelines
    /////////////////////////////////////////////////////////////////////////

    pub(crate) fn address_index(&mut self, destination: &Address) -> usize {
        if let Some(index) = self.destinations.iter().position(|a| a == destination) {
            return index;
        }
        self.destinations.push(destination.clone());
        self.destinations.len() - 1
    }

    pub(crate) fn copy_id(&mut self) -> u64 {
        self.next_copy_id += 1;
        self.next_copy_id
    }

    pub(crate) fn count_rejection(&mut self, error: &QueueError) {
        let reason = match error {
            QueueError::PriorityOutOfRange { .. } | QueueError::QueueOutOfRange { .. } => {
                DropReason::PriorityOutOfRange
            }
            QueueError::QueueFull { .. } => DropReason::QueueFull,
            QueueError::InputFull => DropReason::InputBufferFull,
            QueueError::Closed | QueueError::UnknownWorker(_) => DropReason::BufferClosed,
        };
        self.stats.count_drop(reason);
    }

    /// Count one more resubmit or recirculate pass. False if the packet must be dropped.
    pub(crate) fn reenter(&mut self, packet: &mut Packet) -> bool {
        let reentries = packet.internal().reentries + 1;
        if reentries > self.config.max_reentries {
            warn!(
                switch = self.config.switch_id,
                packet = packet.id(),
                "Dropping packet after {} resubmit/recirculate passes",
                self.config.max_reentries
            );
            self.stats.count_drop(DropReason::ReentryLimit);
            return false;
        }
        packet.internal_mut().reentries = reentries;
        true
    }

    pub(crate) fn trace_packet(&self, gress: Gress, stage: &str, packet: &Packet) {
        if self.config.enable_tracing {
            trace!(
                switch = self.config.switch_id,
                packet = packet.id(),
                "{gress} {stage}:\n{packet}"
            );
        }
    }
}

impl<P: Program, D: Device, R: Replicator> Drop for PsaSwitch<P, D, R> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Read a metadata field as a port number or identifier. Values wider than 32 bits saturate.
pub(crate) fn read_u32(phv: &Phv, id: FieldId) -> u32 {
    u32::try_from(phv.get(id)).unwrap_or(u32::MAX)
}
