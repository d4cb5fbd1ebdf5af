// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Mirroring sessions used by ingress and egress clones

use ordermap::OrderMap;
use serde::{Deserialize, Serialize};

/// Session identifier, as found in `clone_session_id`
pub type SessionId = u16;

/// Where the clones of a session go. Both destinations can be set, in which case the
/// multicast group is served first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirroringSessionConfig {
    pub mgid: Option<u32>,
    pub egress_port: Option<u32>,
}

impl MirroringSessionConfig {
    #[must_use]
    pub fn to_port(port: u32) -> Self {
        Self {
            mgid: None,
            egress_port: Some(port),
        }
    }

    #[must_use]
    pub fn to_group(mgid: u32) -> Self {
        Self {
            mgid: Some(mgid),
            egress_port: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MirrorTable {
    sessions: OrderMap<SessionId, MirroringSessionConfig>,
}

impl MirrorTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a session, returning the previous configuration
    pub fn add(&mut self, id: SessionId, config: MirroringSessionConfig) -> Option<MirroringSessionConfig> {
        self.sessions.insert(id, config)
    }

    #[must_use]
    pub fn get(&self, id: SessionId) -> Option<&MirroringSessionConfig> {
        self.sessions.get(&id)
    }

    pub fn delete(&mut self, id: SessionId) -> Option<MirroringSessionConfig> {
        self.sessions.remove(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sessions() {
        let mut table = MirrorTable::new();
        assert!(table.add(1, MirroringSessionConfig::to_port(4)).is_none());
        assert_eq!(
            table.add(1, MirroringSessionConfig::to_group(9)),
            Some(MirroringSessionConfig::to_port(4))
        );
        assert_eq!(table.get(1).and_then(|s| s.mgid), Some(9));
        assert!(table.get(2).is_none());
        assert_eq!(table.delete(1), Some(MirroringSessionConfig::to_group(9)));
        assert!(table.delete(1).is_none());
        assert!(table.is_empty());
    }
}
