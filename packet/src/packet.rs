// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Packet definition

use crate::buffer::{BufferError, BufferState, PacketBuffer};
use crate::meta::{ErrorCode, InternalMeta};
use phv::{Phv, PhvSchema};
use std::fmt::Display;
use std::sync::Arc;

pub type PacketId = u64;

/// A packet in the switch.
///
/// A packet has a single owner at any time. Packets are not `Clone`: copies are made with
/// [`Packet::clone_no_phv`] or [`Packet::clone_with_phv`], which produce independent packets.
#[derive(Debug)]
pub struct Packet {
    id: PacketId,
    copy_id: u64,
    ingress_port: u32,
    egress_port: u32,
    buffer: PacketBuffer,
    phv: Phv,
    internal: InternalMeta,
    error_code: ErrorCode,
    exit: bool,
}

impl Packet {
    /// Create a packet with the given payload and a fresh header view
    #[must_use]
    pub fn new(id: PacketId, ingress_port: u32, payload: &[u8], schema: &Arc<PhvSchema>) -> Self {
        Self {
            id,
            copy_id: 0,
            ingress_port,
            egress_port: 0,
            buffer: PacketBuffer::new(payload),
            phv: Phv::new(schema),
            internal: InternalMeta {
                packet_length: payload.len(),
                ..InternalMeta::default()
            },
            error_code: ErrorCode::NO_ERROR,
            exit: false,
        }
    }

    fn copy(&self, phv: Phv) -> Self {
        Self {
            id: self.id,
            copy_id: self.copy_id,
            ingress_port: self.ingress_port,
            egress_port: self.egress_port,
            buffer: PacketBuffer::new(self.buffer.as_ref()),
            phv,
            internal: self.internal,
            error_code: self.error_code,
            exit: false,
        }
    }

    /// Copy the packet from its current buffer position with a fresh header view
    #[must_use]
    pub fn clone_no_phv(&self) -> Self {
        self.copy(Phv::new(self.phv.schema()))
    }

    /// Copy the packet from its current buffer position, along with its header view.
    /// The copy's header view is independent from the original's.
    #[must_use]
    pub fn clone_with_phv(&self) -> Self {
        self.copy(self.phv.clone())
    }

    #[must_use]
    pub fn id(&self) -> PacketId {
        self.id
    }

    #[must_use]
    pub fn copy_id(&self) -> u64 {
        self.copy_id
    }

    pub fn set_copy_id(&mut self, copy_id: u64) {
        self.copy_id = copy_id;
    }

    #[must_use]
    pub fn ingress_port(&self) -> u32 {
        self.ingress_port
    }

    pub fn set_ingress_port(&mut self, port: u32) {
        self.ingress_port = port;
    }

    #[must_use]
    pub fn egress_port(&self) -> u32 {
        self.egress_port
    }

    pub fn set_egress_port(&mut self, port: u32) {
        self.egress_port = port;
    }

    #[must_use]
    pub fn phv(&self) -> &Phv {
        &self.phv
    }

    pub fn phv_mut(&mut self) -> &mut Phv {
        &mut self.phv
    }

    #[must_use]
    pub fn buffer(&self) -> &PacketBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut PacketBuffer {
        &mut self.buffer
    }

    /// The bytes not consumed by the parser
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        self.buffer.as_ref()
    }

    #[must_use]
    pub fn data_size(&self) -> usize {
        self.buffer.len()
    }

    #[must_use]
    pub fn internal(&self) -> &InternalMeta {
        &self.internal
    }

    pub fn internal_mut(&mut self) -> &mut InternalMeta {
        &mut self.internal
    }

    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        self.error_code
    }

    pub fn set_error_code(&mut self, code: ErrorCode) {
        self.error_code = code;
    }

    /// Tell if a table action requested an early exit
    #[must_use]
    pub fn exit(&self) -> bool {
        self.exit
    }

    pub fn mark_exit(&mut self) {
        self.exit = true;
    }

    pub fn reset_exit(&mut self) {
        self.exit = false;
    }

    #[must_use]
    pub fn save_buffer_state(&self) -> BufferState {
        self.buffer.save_state()
    }

    pub fn restore_buffer_state(&mut self, state: BufferState) -> Result<(), BufferError> {
        self.buffer.restore_state(state)
    }

    /// Consume the packet, keeping its remaining bytes
    #[must_use]
    pub fn into_payload(self) -> Vec<u8> {
        self.buffer.as_ref().to_vec()
    }
}

impl Display for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "packet {}.{} iport={} eport={} size={} error={}",
            self.id,
            self.copy_id,
            self.ingress_port,
            self.egress_port,
            self.data_size(),
            self.error_code
        )?;
        write!(f, "{}", self.phv)
    }
}
