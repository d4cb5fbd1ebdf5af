// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Collaborators of the switch: the match-action program that processes packets and the
//! device that transmits them.

use hash::HashRegistry;
use packet::Packet;
use phv::PhvSchema;
use sim::SimTime;
use std::fmt::Display;
use std::sync::Arc;

/// Pipeline direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Gress {
    Ingress,
    Egress,
}

/// What a program may use besides the packet
#[derive(Debug, Clone, Copy)]
pub struct PipelineContext<'a> {
    pub switch_id: u32,
    pub now: SimTime,
    pub hashes: &'a HashRegistry,
}

/// A compiled match-action program.
///
/// The switch calls the three stages of a direction in order and reads the standard
/// metadata in between. Stages work in place on the packet; a stage that cannot complete
/// records the problem in the packet error code rather than failing.
pub trait Program {
    /// Layout of the header view of every packet. It must declare the standard PSA metadata.
    fn schema(&self) -> &Arc<PhvSchema>;
    fn parse(&mut self, gress: Gress, packet: &mut Packet, ctx: &PipelineContext<'_>);
    fn apply(&mut self, gress: Gress, packet: &mut Packet, ctx: &PipelineContext<'_>);
    fn deparse(&mut self, gress: Gress, packet: &mut Packet, ctx: &PipelineContext<'_>);
}

/// Link-layer destination of a received packet, handed back on transmission
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Address(pub Vec<u8>);

impl From<&[u8]> for Address {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for Address {
    fn from(bytes: [u8; N]) -> Self {
        Self(bytes.to_vec())
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for byte in &self.0 {
            if !first {
                write!(f, ":")?;
            }
            write!(f, "{byte:02x}")?;
            first = false;
        }
        Ok(())
    }
}

/// Sink of transmitted packets
pub trait Device {
    fn transmit(&mut self, payload: Vec<u8>, port: u32, protocol: u16, destination: &Address);
}
