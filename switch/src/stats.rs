// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Switch counters

use std::fmt::Display;
use strum::{EnumCount, IntoEnumIterator};

/// Why the switch discarded a packet
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::EnumCount,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
pub enum DropReason {
    /// `drop` was set at the end of ingress
    IngressDrop,
    /// `drop` was set at the end of egress
    EgressDrop,
    /// `intrinsic_metadata.priority` is not below the number of queues per port
    PriorityOutOfRange,
    /// The target egress queue was full
    QueueFull,
    /// The input buffer was full
    InputBufferFull,
    /// The packet was resubmitted or recirculated too many times
    ReentryLimit,
    /// The switch was shut down
    BufferClosed,
    /// A saved buffer state could not be restored
    BufferState,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwitchStats {
    pub received: u64,
    pub transmitted: u64,
    pub resubmitted: u64,
    pub recirculated: u64,
    pub ingress_clones: u64,
    pub egress_clones: u64,
    pub replicas: u64,
    pub enqueued: u64,
    drops: [u64; DropReason::COUNT],
}

impl SwitchStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count_drop(&mut self, reason: DropReason) {
        self.drops[reason as usize] += 1;
    }

    pub fn count_drops(&mut self, reason: DropReason, count: u64) {
        self.drops[reason as usize] += count;
    }

    #[must_use]
    pub fn drops(&self, reason: DropReason) -> u64 {
        self.drops[reason as usize]
    }

    #[must_use]
    pub fn total_drops(&self) -> u64 {
        self.drops.iter().sum()
    }
}

fn fmt_stats_heading(f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    writeln!(f, " ━━━━━━━━━━━━━━━━━━━━ Switch statistics ━━━━━━━━━━━━━━━━━━━━")
}

impl Display for SwitchStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt_stats_heading(f)?;
        let counters = [
            ("received", self.received),
            ("transmitted", self.transmitted),
            ("enqueued", self.enqueued),
            ("resubmitted", self.resubmitted),
            ("recirculated", self.recirculated),
            ("ingress clones", self.ingress_clones),
            ("egress clones", self.egress_clones),
            ("replicas", self.replicas),
        ];
        for (name, value) in counters {
            writeln!(f, "  {name:<24} {value:>12}")?;
        }
        writeln!(f, "  {:<24} {:>12}", "dropped", self.total_drops())?;
        for reason in DropReason::iter() {
            let count = self.drops(reason);
            if count > 0 {
                let name: &'static str = reason.into();
                writeln!(f, "    {name:<22} {count:>12}")?;
            }
        }
        Ok(())
    }
}
