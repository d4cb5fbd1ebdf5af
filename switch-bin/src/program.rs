// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Built-in program and device used by the demo

use ordermap::OrderMap;
use packet::{ErrorCode, Packet};
use phv::{FieldId, HeaderId, PhvSchema};
use std::fmt::Display;
use std::sync::Arc;
use switch::{
    Address, ConfigError, Device, Gress, PRIORITY_FIELD, PipelineContext, Program, PsaSchemaExt,
};
#[allow(unused)]
use tracing::{debug, trace, warn};

const ETHERNET: &str = "ethernet";
const ETHERNET_LEN: usize = 14;

fn mac(value: u128) -> [u8; 6] {
    let bytes = value.to_be_bytes();
    let mut mac = [0u8; 6];
    mac.copy_from_slice(&bytes[10..]);
    mac
}

/// Ethernet forwarding: the egress port is picked by hashing the destination MAC with
/// `bmv2_hash`, never the ingress port, and the priority by hashing the source MAC with
/// `hash_ex`. Frames shorter than an Ethernet header are dropped.
pub struct HashForwarding {
    schema: Arc<PhvSchema>,
    ethernet: HeaderId,
    dst: FieldId,
    src: FieldId,
    ether_type: FieldId,
    ig_port: FieldId,
    ig_drop: FieldId,
    ig_egress_port: FieldId,
    priority: FieldId,
    ports: u32,
    queues: u64,
}

impl HashForwarding {
    pub fn new(ports: u32, queues: usize) -> Result<Self, ConfigError> {
        let schema = PhvSchema::builder()
            .header(ETHERNET, &[("dst", 48), ("src", 48), ("ether_type", 16)])
            .psa_metadata()
            .priority_metadata()
            .build()?;
        let ethernet = schema
            .header_id(ETHERNET)
            .ok_or_else(|| ConfigError::MissingField(ETHERNET.to_string()))?;
        Ok(Self {
            ethernet,
            dst: schema.resolve("ethernet.dst")?,
            src: schema.resolve("ethernet.src")?,
            ether_type: schema.resolve("ethernet.ether_type")?,
            ig_port: schema.resolve("psa_ingress_input_metadata.ingress_port")?,
            ig_drop: schema.resolve("psa_ingress_output_metadata.drop")?,
            ig_egress_port: schema.resolve("psa_ingress_output_metadata.egress_port")?,
            priority: schema.resolve(PRIORITY_FIELD)?,
            schema,
            ports: ports.max(1),
            queues: u64::try_from(queues.max(1)).unwrap_or(u64::MAX),
        })
    }

    fn forward(&self, packet: &mut Packet, ctx: &PipelineContext<'_>) {
        let phv = packet.phv();
        if !phv.is_valid(self.ethernet) {
            return;
        }
        let in_port = u32::try_from(phv.get(self.ig_port)).unwrap_or(u32::MAX);
        let dst = mac(phv.get(self.dst));
        let src = mac(phv.get(self.src));
        let (port_hash, priority_hash) =
            match (ctx.hashes.hash("bmv2_hash", &dst), ctx.hashes.hash("hash_ex", &src)) {
                (Ok(p), Ok(q)) => (p, q),
                (Err(e), _) | (_, Err(e)) => {
                    warn!(switch = ctx.switch_id, packet = packet.id(), "Can't forward: {e}");
                    return;
                }
            };
        #[allow(clippy::cast_possible_truncation)]
        let mut port = (port_hash % u64::from(self.ports)) as u32;
        if port == in_port && self.ports > 1 {
            port = (port + 1) % self.ports;
        }
        let priority = priority_hash % self.queues;
        trace!(
            switch = ctx.switch_id,
            packet = packet.id(),
            "Forwarding to port {port} with priority {priority}"
        );
        let phv = packet.phv_mut();
        phv.set(self.ig_drop, 0u8);
        phv.set(self.ig_egress_port, port);
        phv.set(self.priority, priority);
    }
}

impl Program for HashForwarding {
    fn schema(&self) -> &Arc<PhvSchema> {
        &self.schema
    }

    fn parse(&mut self, _gress: Gress, packet: &mut Packet, _ctx: &PipelineContext<'_>) {
        let mut header = [0u8; ETHERNET_LEN];
        match packet.buffer_mut().pull(ETHERNET_LEN) {
            Ok(bytes) => header.copy_from_slice(bytes),
            Err(_) => {
                packet.set_error_code(ErrorCode::PACKET_TOO_SHORT);
                return;
            }
        }
        let read = |bytes: &[u8]| bytes.iter().fold(0u128, |acc, b| (acc << 8) | u128::from(*b));
        let phv = packet.phv_mut();
        phv.set(self.dst, read(&header[0..6]));
        phv.set(self.src, read(&header[6..12]));
        phv.set(self.ether_type, read(&header[12..14]));
        phv.set_valid(self.ethernet, true);
    }

    fn apply(&mut self, gress: Gress, packet: &mut Packet, ctx: &PipelineContext<'_>) {
        if gress == Gress::Ingress {
            self.forward(packet, ctx);
        }
    }

    fn deparse(&mut self, _gress: Gress, packet: &mut Packet, _ctx: &PipelineContext<'_>) {
        let phv = packet.phv();
        if !phv.is_valid(self.ethernet) {
            return;
        }
        let mut header = [0u8; ETHERNET_LEN];
        header[0..6].copy_from_slice(&mac(phv.get(self.dst)));
        header[6..12].copy_from_slice(&mac(phv.get(self.src)));
        header[12..14].copy_from_slice(&phv.get(self.ether_type).to_be_bytes()[14..]);
        packet.buffer_mut().push(&header);
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PortCounters {
    pub packets: u64,
    pub bytes: u64,
}

/// Device that only counts what it is asked to transmit
#[derive(Debug, Default)]
pub struct CountingDevice {
    ports: OrderMap<u32, PortCounters>,
}

impl CountingDevice {
    pub fn port(&self, port: u32) -> PortCounters {
        self.ports.get(&port).copied().unwrap_or_default()
    }

    pub fn total(&self) -> u64 {
        self.ports.values().map(|c| c.packets).sum()
    }
}

impl Device for CountingDevice {
    fn transmit(&mut self, payload: Vec<u8>, port: u32, _protocol: u16, destination: &Address) {
        trace!("Transmitting {} bytes to {destination} on port {port}", payload.len());
        let counters = self.ports.entry(port).or_default();
        counters.packets += 1;
        counters.bytes += payload.len() as u64;
    }
}

impl Display for CountingDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, " ━━━━━━ Transmitted per port ━━━━━━")?;
        writeln!(f, "{:>6} {:>12} {:>14}", "port", "packets", "bytes")?;
        let mut ports: Vec<_> = self.ports.iter().collect();
        ports.sort_by_key(|(port, _)| **port);
        for (port, counters) in ports {
            writeln!(f, "{port:>6} {:>12} {:>14}", counters.packets, counters.bytes)?;
        }
        Ok(())
    }
}
