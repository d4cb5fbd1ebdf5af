// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! A PSA (Portable Switch Architecture) switch for discrete-event simulation.
//!
//! The switch drives packets through the ingress and egress pipelines of a match-action
//! [`Program`], implements the PSA packet paths (unicast, multicast, clones, resubmit and
//! recirculation) and buffers packets between the two pipelines in per-port, per-priority,
//! rate-limited queues. Egress is paced by a timer running on simulated time.
//!
//! The switch is single threaded and never blocks. The simulator calls
//! [`PsaSwitch::receive_packet`] when a packet arrives, and hands back the events the switch
//! scheduled through [`PsaSwitch::handle_event`].

#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

mod config;
mod constants;
mod egress;
mod errors;
mod ingress;
mod metadata;
mod mirroring;
mod pre;
mod program;
mod stats;
mod switch;
mod timer;

pub use config::{MAX_QUEUES_PER_PORT, SwitchConfig, SwitchConfigBuilder, SwitchConfigBuilderError};
pub use constants::{DEFAULT_CATCH_UP_DELAY, PSA_PORT_RECIRCULATE, PacketPath};
pub use errors::ConfigError;
pub use metadata::{PRIORITY_FIELD, PsaFields, PsaSchemaExt, QueueingFields};
pub use mirroring::{MirrorTable, MirroringSessionConfig, SessionId};
pub use pre::{GroupId, Replica, Replicator, Rid, SimplePre};
pub use program::{Address, Device, Gress, PipelineContext, Program};
pub use stats::{DropReason, SwitchStats};
pub use switch::PsaSwitch;
pub use timer::{SwitchEvent, TimerState};

/// Metadata header names
pub mod headers {
    pub use crate::metadata::{
        EGRESS_DEPARSER_INPUT, EGRESS_INPUT, EGRESS_OUTPUT, EGRESS_PARSER_INPUT, INGRESS_INPUT,
        INGRESS_OUTPUT, INGRESS_PARSER_INPUT, QUEUEING_METADATA,
    };
}
