// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Packet replication engine.
//!
//! A multicast group is a list of nodes. Each node carries a replication id and a set of
//! ports, and yields one replica per port.

use ordermap::OrderMap;
use std::collections::BTreeSet;
#[allow(unused)]
use tracing::{debug, trace};

/// Multicast group identifier, as found in `multicast_group`. 0 means no multicast.
pub type GroupId = u32;

/// Replication id, copied to `psa_egress_input_metadata.instance`
pub type Rid = u16;

/// One copy of a multicast packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Replica {
    pub port: u32,
    pub rid: Rid,
}

/// Something that expands a multicast group into replicas
pub trait Replicator {
    /// Replicas of `mgid`, in replication order. Unknown or empty groups yield no replica.
    fn replicate(&self, mgid: GroupId) -> Vec<Replica>;
    /// Forget all groups
    fn reset_state(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Node {
    rid: Rid,
    ports: BTreeSet<u32>,
}

/// Replication engine with static groups
#[derive(Debug, Clone, Default)]
pub struct SimplePre {
    groups: OrderMap<GroupId, Vec<Node>>,
}

impl SimplePre {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty group. Returns false if it already exists.
    pub fn create_group(&mut self, mgid: GroupId) -> bool {
        if self.groups.contains_key(&mgid) {
            return false;
        }
        self.groups.insert(mgid, Vec::new());
        true
    }

    /// Append a node to a group, creating the group if needed
    pub fn add_node(&mut self, mgid: GroupId, rid: Rid, ports: impl IntoIterator<Item = u32>) {
        let ports: BTreeSet<u32> = ports.into_iter().collect();
        debug!("Group {mgid}: adding node rid={rid} ports={ports:?}");
        self.groups.entry(mgid).or_default().push(Node { rid, ports });
    }

    /// Remove every node with replication id `rid` from a group
    pub fn remove_node(&mut self, mgid: GroupId, rid: Rid) -> bool {
        let Some(nodes) = self.groups.get_mut(&mgid) else {
            return false;
        };
        let before = nodes.len();
        nodes.retain(|node| node.rid != rid);
        nodes.len() != before
    }

    pub fn delete_group(&mut self, mgid: GroupId) -> bool {
        self.groups.remove(&mgid).is_some()
    }

    #[must_use]
    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }
}

impl Replicator for SimplePre {
    fn replicate(&self, mgid: GroupId) -> Vec<Replica> {
        let Some(nodes) = self.groups.get(&mgid) else {
            debug!("Replication to unknown group {mgid}");
            return vec![];
        };
        nodes
            .iter()
            .flat_map(|node| {
                node.ports.iter().map(|port| Replica {
                    port: *port,
                    rid: node.rid,
                })
            })
            .collect()
    }

    fn reset_state(&mut self) {
        debug!("Removing {} multicast groups", self.groups.len());
        self.groups.clear();
    }
}
