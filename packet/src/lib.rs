// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Packets handled by the switch: a payload buffer, a header view and internal metadata.

#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

pub mod buffer;
mod meta;
mod packet;

pub use buffer::{BufferError, BufferState, PacketBuffer};
pub use meta::{ErrorCode, InternalMeta};
pub use packet::{Packet, PacketId};
