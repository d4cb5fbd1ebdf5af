// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Test fixtures: a scripted program and a device that records what it transmits

#![allow(dead_code)]

use packet::{ErrorCode, Packet, PacketId};
use phv::{PhvSchema, SchemaBuilder};
use psa_switch::{
    Address, Device, Gress, PipelineContext, Program, PsaSchemaExt, PsaSwitch, SwitchConfig,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

pub const IG_PARSER_PORT: &str = "psa_ingress_parser_input_metadata.ingress_port";
pub const IG_PORT: &str = "psa_ingress_input_metadata.ingress_port";
pub const IG_PATH: &str = "psa_ingress_input_metadata.packet_path";
pub const IG_TIMESTAMP: &str = "psa_ingress_input_metadata.ingress_timestamp";
pub const IG_PARSER_ERROR: &str = "psa_ingress_input_metadata.parser_error";
pub const IG_COS: &str = "psa_ingress_output_metadata.class_of_service";
pub const IG_CLONE: &str = "psa_ingress_output_metadata.clone";
pub const IG_CLONE_SESSION: &str = "psa_ingress_output_metadata.clone_session_id";
pub const IG_DROP: &str = "psa_ingress_output_metadata.drop";
pub const IG_RESUBMIT: &str = "psa_ingress_output_metadata.resubmit";
pub const IG_MGID: &str = "psa_ingress_output_metadata.multicast_group";
pub const IG_EGRESS_PORT: &str = "psa_ingress_output_metadata.egress_port";
pub const EG_COS: &str = "psa_egress_input_metadata.class_of_service";
pub const EG_PORT: &str = "psa_egress_input_metadata.egress_port";
pub const EG_PATH: &str = "psa_egress_input_metadata.packet_path";
pub const EG_INSTANCE: &str = "psa_egress_input_metadata.instance";
pub const EG_TIMESTAMP: &str = "psa_egress_input_metadata.egress_timestamp";
pub const EG_CLONE: &str = "psa_egress_output_metadata.clone";
pub const EG_CLONE_SESSION: &str = "psa_egress_output_metadata.clone_session_id";
pub const EG_DROP: &str = "psa_egress_output_metadata.drop";
pub const EG_DEPARSER_PORT: &str = "psa_egress_deparser_input_metadata.egress_port";
pub const PRIORITY: &str = "intrinsic_metadata.priority";
pub const TAG: &str = "tag.value";

pub fn get(packet: &Packet, field: &str) -> u128 {
    packet.phv().field(field).unwrap()
}

pub fn set(packet: &mut Packet, field: &str, value: impl Into<u128>) {
    packet.phv_mut().set_field(field, value).unwrap();
}

/// Ingress action forwarding to `port`
pub fn forward(packet: &mut Packet, port: u32) {
    set(packet, IG_DROP, 0u8);
    set(packet, IG_EGRESS_PORT, port);
}

/// Schema with a one-byte `tag` header, the PSA metadata and the priority field
pub fn schema_builder() -> SchemaBuilder {
    PhvSchema::builder()
        .header("tag", &[("value", 8)])
        .psa_metadata()
        .priority_metadata()
}

pub fn schema() -> Arc<PhvSchema> {
    schema_builder().build().unwrap()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Parse,
    Apply,
    Deparse,
}

/// A stage invocation, with a few values seen at that time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub gress: Gress,
    pub stage: Stage,
    pub packet: PacketId,
    pub copy: u64,
    /// Bytes left in the buffer when the stage started
    pub data_size: usize,
}

pub type Action = Box<dyn FnMut(&mut Packet)>;
pub type Parser = Box<dyn FnMut(Gress, &mut Packet)>;

/// Extract the one-byte tag, or flag the packet as too short
pub fn parse_tag(packet: &mut Packet) {
    let tag = packet.buffer_mut().pull(1).map(|bytes| bytes[0]);
    match tag {
        Ok(tag) => {
            set(packet, TAG, tag);
            packet.phv_mut().set_header_valid("tag", true).unwrap();
        }
        Err(_) => packet.set_error_code(ErrorCode::PACKET_TOO_SHORT),
    }
}

/// Program with a parser that extracts a one-byte tag by default, and scripted control blocks
pub struct ScriptedProgram {
    schema: Arc<PhvSchema>,
    parser: Parser,
    ingress: Action,
    egress: Action,
    pub calls: Vec<Call>,
}

impl ScriptedProgram {
    pub fn new(ingress: impl FnMut(&mut Packet) + 'static, egress: impl FnMut(&mut Packet) + 'static) -> Self {
        Self::with_schema(schema(), ingress, egress)
    }

    pub fn with_schema(
        schema: Arc<PhvSchema>,
        ingress: impl FnMut(&mut Packet) + 'static,
        egress: impl FnMut(&mut Packet) + 'static,
    ) -> Self {
        Self {
            schema,
            parser: Box::new(|_, packet| parse_tag(packet)),
            ingress: Box::new(ingress),
            egress: Box::new(egress),
            calls: Vec::new(),
        }
    }

    /// Replace the tag parser
    #[must_use]
    pub fn with_parser(mut self, parser: impl FnMut(Gress, &mut Packet) + 'static) -> Self {
        self.parser = Box::new(parser);
        self
    }

    /// Program forwarding everything to `port`
    pub fn forwarding(port: u32) -> Self {
        Self::new(move |packet| forward(packet, port), |_| {})
    }

    fn record(&mut self, gress: Gress, stage: Stage, packet: &Packet) {
        self.calls.push(Call {
            gress,
            stage,
            packet: packet.id(),
            copy: packet.copy_id(),
            data_size: packet.data_size(),
        });
    }

    pub fn count(&self, gress: Gress, stage: Stage) -> usize {
        self.calls
            .iter()
            .filter(|c| c.gress == gress && c.stage == stage)
            .count()
    }

    pub fn stages(&self) -> Vec<(Gress, Stage)> {
        self.calls.iter().map(|c| (c.gress, c.stage)).collect()
    }
}

impl Program for ScriptedProgram {
    fn schema(&self) -> &Arc<PhvSchema> {
        &self.schema
    }

    fn parse(&mut self, gress: Gress, packet: &mut Packet, _ctx: &PipelineContext<'_>) {
        self.record(gress, Stage::Parse, packet);
        (self.parser)(gress, packet);
    }

    fn apply(&mut self, gress: Gress, packet: &mut Packet, _ctx: &PipelineContext<'_>) {
        self.record(gress, Stage::Apply, packet);
        match gress {
            Gress::Ingress => (self.ingress)(packet),
            Gress::Egress => (self.egress)(packet),
        }
    }

    fn deparse(&mut self, gress: Gress, packet: &mut Packet, _ctx: &PipelineContext<'_>) {
        self.record(gress, Stage::Deparse, packet);
        if packet.phv().header_valid("tag").unwrap() {
            let tag = u8::try_from(get(packet, TAG)).unwrap();
            packet.buffer_mut().push(&[tag]);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub payload: Vec<u8>,
    pub port: u32,
    pub protocol: u16,
    pub destination: Address,
}

#[derive(Debug, Default)]
pub struct RecordingDevice {
    pub sent: Vec<Sent>,
}

impl RecordingDevice {
    pub fn ports(&self) -> Vec<u32> {
        self.sent.iter().map(|s| s.port).collect()
    }
}

impl Device for RecordingDevice {
    fn transmit(&mut self, payload: Vec<u8>, port: u32, protocol: u16, destination: &Address) {
        self.sent.push(Sent {
            payload,
            port,
            protocol,
            destination: destination.clone(),
        });
    }
}

pub type TestSwitch = PsaSwitch<ScriptedProgram, RecordingDevice>;

pub fn switch_with(config: SwitchConfig, program: ScriptedProgram) -> TestSwitch {
    PsaSwitch::new(config, program, RecordingDevice::default()).unwrap()
}

pub fn switch(program: ScriptedProgram) -> TestSwitch {
    switch_with(SwitchConfig::default(), program)
}

pub fn mac() -> Address {
    Address::from([0x02, 0, 0, 0, 0, 0x01])
}

/// Values captured by a scripted action
pub type Seen<T> = Rc<RefCell<Vec<T>>>;

pub fn seen<T>() -> Seen<T> {
    Rc::new(RefCell::new(Vec::new()))
}
