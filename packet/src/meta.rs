// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Packet annotations that are not part of the header view

use std::fmt::Display;

/// Switch-internal bookkeeping carried by a packet. P4 programs can't see or alter any of this.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InternalMeta {
    /// Length of the packet as received (or as cloned)
    pub packet_length: usize,
    /// Protocol number the packet was received with, reused on transmission
    pub protocol: u16,
    /// Index of the destination address in the list kept by the switch
    pub address_index: usize,
    /// Number of resubmit and recirculate passes made so far
    pub reentries: u32,
    /// Simulated time (ns) at which the packet was last put in the egress buffer
    pub enqueued_at: u64,
}

/// Parser error code, as exposed to the program in `parser_error` metadata fields
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ErrorCode(pub u32);

impl ErrorCode {
    pub const NO_ERROR: ErrorCode = ErrorCode(0);
    pub const PACKET_TOO_SHORT: ErrorCode = ErrorCode(1);
    pub const NO_MATCH: ErrorCode = ErrorCode(2);
    pub const STACK_OUT_OF_BOUNDS: ErrorCode = ErrorCode(3);
    pub const HEADER_TOO_SHORT: ErrorCode = ErrorCode(4);
    pub const PARSER_TIMEOUT: ErrorCode = ErrorCode(5);
    pub const PARSER_INVALID_ARGUMENT: ErrorCode = ErrorCode(6);

    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match *self {
            Self::NO_ERROR => "NoError",
            Self::PACKET_TOO_SHORT => "PacketTooShort",
            Self::NO_MATCH => "NoMatch",
            Self::STACK_OUT_OF_BOUNDS => "StackOutOfBounds",
            Self::HEADER_TOO_SHORT => "HeaderTooShort",
            Self::PARSER_TIMEOUT => "ParserTimeout",
            Self::PARSER_INVALID_ARGUMENT => "ParserInvalidArgument",
            ErrorCode(other) => return write!(f, "error({other})"),
        };
        write!(f, "{name}")
    }
}
