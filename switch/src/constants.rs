// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! PSA constants

use std::time::Duration;

/// Port number that sends a packet back to ingress after egress processing
pub const PSA_PORT_RECIRCULATE: u32 = 0xffff_fffa;

/// Delay of the extra egress attempt made when a tick finds nothing to send
pub const DEFAULT_CATCH_UP_DELAY: Duration = Duration::from_nanos(10);

/// How a packet reached the parser, as seen in the `packet_path` metadata fields
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::FromRepr, strum::EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
pub enum PacketPath {
    Normal = 0,
    NormalUnicast = 1,
    NormalMulticast = 2,
    #[strum(to_string = "CLONE_I2E")]
    CloneI2E = 3,
    #[strum(to_string = "CLONE_E2E")]
    CloneE2E = 4,
    Resubmit = 5,
    Recirculate = 6,
}

impl PacketPath {
    #[must_use]
    pub fn value(self) -> u32 {
        self as u32
    }
}

impl From<PacketPath> for u128 {
    fn from(path: PacketPath) -> Self {
        u128::from(path.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_packet_path_values() {
        for (n, path) in PacketPath::iter().enumerate() {
            assert_eq!(path.value() as usize, n);
            assert_eq!(PacketPath::from_repr(path.value()), Some(path));
        }
        assert_eq!(PacketPath::from_repr(7), None);
        assert_eq!(PacketPath::CloneI2E.to_string(), "CLONE_I2E");
        assert_eq!(PacketPath::NormalUnicast.to_string(), "NORMAL_UNICAST");
    }
}
