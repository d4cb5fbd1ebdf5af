// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Packet reception and ingress pipeline

use crate::constants::PacketPath;
use crate::mirroring::SessionId;
use crate::pre::Replicator;
use crate::program::{Address, Device, Gress, PipelineContext, Program};
use crate::stats::DropReason;
use crate::switch::{PsaSwitch, read_u32};

use packet::{BufferState, Packet, PacketId};
use sim::SimTime;
#[allow(unused)]
use tracing::{debug, info, trace, warn};

/// What became of a packet after one ingress pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IngressOutcome {
    /// Dropped, enqueued or replicated
    Done,
    /// Put back in the input buffer for another pass
    Resubmitted,
}

impl<P: Program, D: Device, R: Replicator> PsaSwitch<P, D, R> {
    /// Accept a packet from a port and run ingress on it.
    /// `protocol` and `destination` are kept aside and handed back to the device when the
    /// packet, or any copy of it, is transmitted.
    pub fn receive_packet(
        &mut self,
        payload: &[u8],
        in_port: u32,
        protocol: u16,
        destination: &Address,
        now: SimTime,
    ) -> PacketId {
        let id = self.next_packet_id;
        self.next_packet_id += 1;
        self.stats.received += 1;

        let mut packet = Packet::new(id, in_port, payload, self.program.schema());
        packet.phv_mut().reset_metadata();
        let address_index = self.address_index(destination);
        let internal = packet.internal_mut();
        internal.protocol = protocol;
        internal.address_index = address_index;

        let f = self.fields;
        let phv = packet.phv_mut();
        phv.set(f.ig_parser_path, PacketPath::Normal);
        phv.set(f.ig_parser_port, in_port);

        debug!(
            switch = self.config.switch_id,
            packet = id,
            "Received packet on port {in_port}, {} bytes",
            payload.len()
        );
        if let Err(rejected) = self.input.push(packet) {
            warn!(
                switch = self.config.switch_id,
                packet = id,
                "Dropping received packet: {}",
                rejected.error
            );
            self.count_rejection(&rejected.error);
            return id;
        }
        self.handle_ingress_pipeline(now);
        id
    }

    /// Take the packet at the head of the input buffer through ingress. A resubmitted packet
    /// goes through ingress again right away. Nothing happens if the input buffer is empty.
    pub fn handle_ingress_pipeline(&mut self, now: SimTime) {
        while let Some(packet) = self.input.pop() {
            if self.ingress(packet, now) == IngressOutcome::Done {
                break;
            }
        }
    }

    fn ingress(&mut self, mut packet: Packet, now: SimTime) -> IngressOutcome {
        let f = self.fields;
        let switch = self.config.switch_id;
        let id = packet.id();
        trace!(
            switch,
            packet = id,
            "Ingress from port {}, {} bytes",
            read_u32(packet.phv(), f.ig_parser_port),
            packet.data_size()
        );

        // clones and resubmitted packets start from the packet as it entered the parser
        let in_state = packet.save_buffer_state();
        let packet_length = packet.internal().packet_length;

        packet.phv_mut().set(f.ig_timestamp, now.as_nanos());

        let ctx = PipelineContext {
            switch_id: switch,
            now,
            hashes: &self.hashes,
        };
        self.program.parse(Gress::Ingress, &mut packet, &ctx);

        let parser_error = packet.error_code().get();
        let phv = packet.phv_mut();
        phv.set(f.ig_port, phv.get(f.ig_parser_port));
        phv.set(f.ig_path, phv.get(f.ig_parser_path));
        phv.set(f.ig_parser_error, parser_error);

        phv.set(f.ig_cos, 0u8);
        phv.set(f.ig_clone, 0u8);
        phv.set(f.ig_drop, 1u8);
        phv.set(f.ig_resubmit, 0u8);
        phv.set(f.ig_mgid, 0u8);

        self.program.apply(Gress::Ingress, &mut packet, &ctx);
        packet.reset_exit();
        self.trace_packet(Gress::Ingress, "apply", &packet);

        let cos = packet.phv().get(f.ig_cos);

        // dropped packets are still cloned
        if packet.phv().is_set(f.ig_clone) {
            let session = packet.phv().get(f.ig_clone_session);
            self.ingress_clone(&mut packet, session, in_state, packet_length, now);
        }

        if packet.phv().is_set(f.ig_drop) {
            debug!(switch, packet = id, "Dropping packet at the end of ingress");
            self.stats.count_drop(DropReason::IngressDrop);
            return IngressOutcome::Done;
        }

        if packet.phv().is_set(f.ig_resubmit) {
            return self.resubmit(packet, in_state);
        }

        let ctx = PipelineContext {
            switch_id: switch,
            now,
            hashes: &self.hashes,
        };
        self.program.deparse(Gress::Ingress, &mut packet, &ctx);

        let mgid = read_u32(packet.phv(), f.ig_mgid);
        if mgid != 0 {
            debug!(switch, packet = id, "Multicast to group {mgid}");
            self.multicast(&packet, mgid, PacketPath::NormalMulticast, cos, now);
            return IngressOutcome::Done;
        }

        let phv = packet.phv_mut();
        phv.set(f.eg_instance, 0u8);
        phv.set(f.eg_cos, cos);
        phv.set(f.eg_parser_path, PacketPath::NormalUnicast);
        let port = read_u32(phv, f.ig_egress_port);
        trace!(switch, packet = id, "Unicast to port {port}");
        self.enqueue(port, packet, now);
        IngressOutcome::Done
    }

    /// Copy the packet as it entered the ingress parser to the destinations of a session
    fn ingress_clone(
        &mut self,
        packet: &mut Packet,
        session: u128,
        in_state: BufferState,
        packet_length: usize,
        now: SimTime,
    ) {
        let switch = self.config.switch_id;
        let config = SessionId::try_from(session)
            .ok()
            .and_then(|session| self.mirroring.get(session).copied());
        let Some(config) = config else {
            debug!(
                switch,
                packet = packet.id(),
                "Cloning packet at ingress to unconfigured session id {session} causes no clone packets to be created"
            );
            return;
        };
        debug!(switch, packet = packet.id(), "Cloning packet at ingress to session id {session}");

        let out_state = packet.save_buffer_state();
        if let Err(e) = packet.restore_buffer_state(in_state) {
            warn!(switch, packet = packet.id(), "Can't clone packet at ingress: {e}");
            self.stats.count_drop(DropReason::BufferState);
            return;
        }
        let mut copy = packet.clone_no_phv();
        let copy_id = self.copy_id();
        copy.set_copy_id(copy_id);
        copy.internal_mut().packet_length = packet_length;
        let phv = copy.phv_mut();
        phv.reset_metadata();
        phv.set(self.fields.eg_parser_path, PacketPath::CloneI2E);
        self.stats.ingress_clones += 1;

        self.deliver_clone(copy, config, PacketPath::CloneI2E, now);

        if let Err(e) = packet.restore_buffer_state(out_state) {
            warn!(switch, packet = packet.id(), "Can't restore packet after ingress clone: {e}");
        }
    }

    fn resubmit(&mut self, mut packet: Packet, in_state: BufferState) -> IngressOutcome {
        let f = self.fields;
        let switch = self.config.switch_id;
        let id = packet.id();
        if let Err(e) = packet.restore_buffer_state(in_state) {
            warn!(switch, packet = id, "Can't resubmit packet: {e}");
            self.stats.count_drop(DropReason::BufferState);
            return IngressOutcome::Done;
        }
        if !self.reenter(&mut packet) {
            return IngressOutcome::Done;
        }
        let ingress_port = packet.ingress_port();
        let phv = packet.phv_mut();
        phv.reset_metadata();
        phv.set(f.ig_parser_port, ingress_port);
        phv.set(f.ig_parser_path, PacketPath::Resubmit);

        debug!(switch, packet = id, "Resubmitting packet");
        self.stats.resubmitted += 1;
        if let Err(rejected) = self.input.push(packet) {
            warn!(switch, packet = id, "Dropping resubmitted packet: {}", rejected.error);
            self.count_rejection(&rejected.error);
            return IngressOutcome::Done;
        }
        IngressOutcome::Resubmitted
    }
}
