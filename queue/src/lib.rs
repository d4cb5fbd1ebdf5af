// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Packet buffers of the switch: the ingress input FIFO and the egress buffer with
//! per-port, per-priority queues that are capacity bounded and rate limited.
//! Both are generic over the queued item so they can be exercised without packets.

#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

mod egress;
mod errors;
mod input;

pub use egress::{Dequeued, EgressBuffer, delay_ns};
pub use errors::{QueueError, Rejected};
pub use input::InputBuffer;
