// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Egress buffering, egress pipeline and the paths shared by both pipelines: clones,
//! multicast replication and recirculation.

use crate::constants::{PSA_PORT_RECIRCULATE, PacketPath};
use crate::mirroring::{MirroringSessionConfig, SessionId};
use crate::pre::Replicator;
use crate::program::{Address, Device, Gress, PipelineContext, Program};
use crate::stats::DropReason;
use crate::switch::PsaSwitch;

use packet::Packet;
use queue::Dequeued;
use sim::SimTime;
#[allow(unused)]
use tracing::{debug, info, trace, warn};

impl<P: Program, D: Device, R: Replicator> PsaSwitch<P, D, R> {
    /// Put a packet in the egress queue of `port` selected by `intrinsic_metadata.priority`
    /// (priority 0 if the program does not declare it). Packets that can't be queued are
    /// dropped and counted.
    pub(crate) fn enqueue(&mut self, port: u32, mut packet: Packet, now: SimTime) {
        let switch = self.config.switch_id;
        let id = packet.id();
        packet.set_egress_port(port);
        let priority = self.fields.priority.map_or(0, |field| {
            usize::try_from(packet.phv().get(field)).unwrap_or(usize::MAX)
        });
        if let Some(q) = self.queueing {
            let depth = self.egress.port_len(port) as u64;
            let phv = packet.phv_mut();
            phv.set(q.enq_timestamp, now.as_nanos());
            phv.set(q.enq_qdepth, depth);
        }
        packet.internal_mut().enqueued_at = now.as_nanos();

        match self.egress.push(port, priority, packet, now) {
            Ok(()) => {
                self.stats.enqueued += 1;
                debug!(switch, packet = id, "Enqueued on port {port} with priority {priority}");
            }
            Err(rejected) => {
                warn!(switch, packet = id, "Dropping packet: {}", rejected.error);
                self.count_rejection(&rejected.error);
            }
        }
    }

    /// Replicate `source` to the members of group `mgid`. Every replica gets its own copy of
    /// the header view, with the class of service, instance and packet path set.
    pub(crate) fn multicast(&mut self, source: &Packet, mgid: u32, path: PacketPath, cos: u128, now: SimTime) {
        let f = self.fields;
        let replicas = self.pre.replicate(mgid);
        if replicas.is_empty() {
            debug!(
                switch = self.config.switch_id,
                packet = source.id(),
                "Multicast group {mgid} has no members"
            );
        }
        for replica in replicas {
            trace!(
                switch = self.config.switch_id,
                packet = source.id(),
                "Replicating packet on port {} with instance {}",
                replica.port,
                replica.rid
            );
            let mut copy = source.clone_with_phv();
            let copy_id = self.copy_id();
            copy.set_copy_id(copy_id);
            let phv = copy.phv_mut();
            phv.set(f.eg_cos, cos);
            phv.set(f.eg_instance, replica.rid);
            phv.set(f.eg_parser_path, path);
            self.stats.replicas += 1;
            self.enqueue(replica.port, copy, now);
        }
    }

    /// Send a clone to the destinations of its mirroring session: the multicast group
    /// first, then the egress port.
    pub(crate) fn deliver_clone(
        &mut self,
        clone: Packet,
        config: MirroringSessionConfig,
        path: PacketPath,
        now: SimTime,
    ) {
        if let Some(mgid) = config.mgid {
            debug!(
                switch = self.config.switch_id,
                packet = clone.id(),
                "Cloning packet to multicast group {mgid}"
            );
            self.multicast(&clone, mgid, path, 0, now);
        }
        if let Some(port) = config.egress_port {
            debug!(
                switch = self.config.switch_id,
                packet = clone.id(),
                "Cloning packet to egress port {port}"
            );
            self.enqueue(port, clone, now);
        }
    }

    /// Dequeue one packet for `worker` and take it through egress.
    ///
    /// Returns false if no packet could be dequeued: all queues are empty or no queued
    /// packet of this worker is eligible yet. Returns true otherwise, whatever happens to
    /// the packet.
    pub fn handle_egress_pipeline(&mut self, worker: usize, now: SimTime) -> bool {
        if self.egress.is_empty() {
            return false;
        }
        let switch = self.config.switch_id;
        let Dequeued {
            port,
            priority,
            item: mut packet,
        } = match self.egress.pop(worker, now) {
            Ok(Some(dequeued)) => dequeued,
            Ok(None) => return false,
            Err(e) => {
                warn!(switch, "Egress failed: {e}");
                return false;
            }
        };
        let f = self.fields;
        let id = packet.id();
        trace!(switch, packet = id, "Egress on port {port} from priority {priority}");

        if let Some(q) = self.queueing {
            let delta = now.as_nanos().saturating_sub(packet.internal().enqueued_at);
            let depth = self.egress.port_len(port) as u64;
            let phv = packet.phv_mut();
            phv.set(q.deq_timedelta, delta);
            phv.set(q.deq_qdepth, depth);
        }

        // headers were deparsed at the end of ingress: none can be assumed valid
        let phv = packet.phv_mut();
        phv.reset();
        phv.set(f.eg_parser_port, port);
        phv.set(f.eg_timestamp, now.as_nanos());

        let ctx = PipelineContext {
            switch_id: switch,
            now,
            hashes: &self.hashes,
        };
        self.program.parse(Gress::Egress, &mut packet, &ctx);

        let parser_error = packet.error_code().get();
        let phv = packet.phv_mut();
        phv.set(f.eg_port, phv.get(f.eg_parser_port));
        phv.set(f.eg_path, phv.get(f.eg_parser_path));
        phv.set(f.eg_parser_error, parser_error);

        phv.set(f.eg_clone, 0u8);
        phv.set(f.eg_drop, 0u8);

        self.program.apply(Gress::Egress, &mut packet, &ctx);
        packet.reset_exit();

        let phv = packet.phv_mut();
        phv.set(f.eg_deparser_port, phv.get(f.eg_parser_port));
        self.program.deparse(Gress::Egress, &mut packet, &ctx);
        self.trace_packet(Gress::Egress, "deparse", &packet);

        if packet.phv().is_set(f.eg_clone) {
            let session = packet.phv().get(f.eg_clone_session);
            self.egress_clone(&packet, session, now);
        }

        if packet.phv().is_set(f.eg_drop) {
            debug!(switch, packet = id, "Dropping packet at the end of egress");
            self.stats.count_drop(DropReason::EgressDrop);
            return true;
        }

        if port == PSA_PORT_RECIRCULATE {
            self.recirculate(packet, now);
            return true;
        }

        let protocol = packet.internal().protocol;
        let address_index = packet.internal().address_index;
        let payload = packet.into_payload();
        debug!(switch, packet = id, "Transmitting {} bytes on port {port}", payload.len());
        self.stats.transmitted += 1;
        match self.destinations.get(address_index) {
            Some(destination) => self.device.transmit(payload, port, protocol, destination),
            None => self.device.transmit(payload, port, protocol, &Address::default()),
        }
        true
    }

    /// Copy the packet as output by the egress deparser to the destinations of a session
    fn egress_clone(&mut self, packet: &Packet, session: u128, now: SimTime) {
        let switch = self.config.switch_id;
        let config = SessionId::try_from(session)
            .ok()
            .and_then(|session| self.mirroring.get(session).copied());
        let Some(config) = config else {
            debug!(
                switch,
                packet = packet.id(),
                "Cloning packet after egress to unconfigured session id {session} causes no clone packets to be created"
            );
            return;
        };
        debug!(switch, packet = packet.id(), "Cloning packet after egress to session id {session}");

        let mut copy = packet.clone_no_phv();
        let copy_id = self.copy_id();
        copy.set_copy_id(copy_id);
        let phv = copy.phv_mut();
        phv.reset_metadata();
        phv.set(self.fields.eg_parser_path, PacketPath::CloneE2E);
        self.stats.egress_clones += 1;

        self.deliver_clone(copy, config, PacketPath::CloneE2E, now);
    }

    /// Send a packet back to ingress as if it arrived on the recirculation port
    fn recirculate(&mut self, mut packet: Packet, now: SimTime) {
        let f = self.fields;
        let switch = self.config.switch_id;
        let id = packet.id();
        if !self.reenter(&mut packet) {
            return;
        }
        debug!(switch, packet = id, "Recirculating packet");

        let phv = packet.phv_mut();
        phv.reset();
        phv.reset_header_stacks();
        phv.reset_metadata();
        phv.set(f.ig_parser_port, PSA_PORT_RECIRCULATE);
        phv.set(f.ig_parser_path, PacketPath::Recirculate);
        packet.set_ingress_port(PSA_PORT_RECIRCULATE);
        let length = packet.data_size();
        packet.internal_mut().packet_length = length;

        self.stats.recirculated += 1;
        if let Err(rejected) = self.input.push(packet) {
            warn!(switch, packet = id, "Dropping recirculated packet: {}", rejected.error);
            self.count_rejection(&rejected.error);
            return;
        }
        self.handle_ingress_pipeline(now);
    }
}
