// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Switch configuration

use crate::errors::ConfigError;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
#[allow(unused)]
use tracing::{debug, info};

/// Largest number of priority queues per port
pub const MAX_QUEUES_PER_PORT: usize = 32;

/// Static parameters of a switch. Fields left out of a YAML document take their default value.
#[derive(Builder, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[builder(default)]
#[serde(default, deny_unknown_fields)]
pub struct SwitchConfig {
    /// Identifier used in logs
    pub switch_id: u32,
    /// Line rate, in packets per second. Sets the egress tick interval and the default
    /// rate limit of every egress queue. 0 disables the egress timer.
    pub packet_rate_pps: u64,
    /// Capacity of the input buffer
    pub input_buffer_size: usize,
    /// Default capacity of each egress queue
    pub queue_buffer_size: usize,
    /// Number of priority queues per egress port
    pub queues_per_port: usize,
    /// Number of egress workers
    pub egress_workers: usize,
    /// Maximum number of resubmit and recirculate passes of a packet
    pub max_reentries: u32,
    /// Delay of the extra egress attempt made when a tick finds nothing to send
    pub catch_up_delay_ns: u64,
    /// Allow replacing the program of a running switch
    pub enable_swap: bool,
    /// Log packets at every pipeline stage
    pub enable_tracing: bool,
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            switch_id: 0,
            packet_rate_pps: 1_000_000,
            input_buffer_size: 1024,
            queue_buffer_size: 64,
            queues_per_port: 8,
            egress_workers: 1,
            max_reentries: 16,
            catch_up_delay_ns: 10,
            enable_swap: false,
            enable_tracing: false,
        }
    }
}

impl SwitchConfig {
    /// Check the configuration for values the switch can't operate with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queues_per_port == 0 || self.queues_per_port > MAX_QUEUES_PER_PORT {
            return Err(ConfigError::Invalid(format!(
                "queues_per_port must be in 1..={MAX_QUEUES_PER_PORT}, got {}",
                self.queues_per_port
            )));
        }
        if self.egress_workers == 0 {
            return Err(ConfigError::Invalid("egress_workers can't be 0".to_string()));
        }
        if self.input_buffer_size == 0 {
            return Err(ConfigError::Invalid("input_buffer_size can't be 0".to_string()));
        }
        if self.queue_buffer_size == 0 {
            return Err(ConfigError::Invalid("queue_buffer_size can't be 0".to_string()));
        }
        Ok(())
    }

    /// Interval between two egress ticks. Zero if the timer is disabled.
    #[must_use]
    pub fn egress_interval(&self) -> Duration {
        Duration::from_nanos(queue::delay_ns(self.packet_rate_pps))
    }

    #[must_use]
    pub fn catch_up_delay(&self) -> Duration {
        Duration::from_nanos(self.catch_up_delay_ns)
    }

    /// Parse and validate a YAML configuration
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: SwitchConfig = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML configuration file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Loading switch configuration from {}", path.display());
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml_ng::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = SwitchConfig::default();
        config.validate().unwrap();
        assert_eq!(config.egress_interval(), Duration::from_nanos(1_000));
        assert_eq!(config.catch_up_delay(), Duration::from_nanos(10));
    }

    #[test]
    fn test_builder() {
        let config = SwitchConfigBuilder::default()
            .switch_id(3)
            .queues_per_port(4)
            .build()
            .unwrap();
        assert_eq!(config.switch_id, 3);
        assert_eq!(config.queues_per_port, 4);
        assert_eq!(config.packet_rate_pps, 1_000_000);
    }

    #[test]
    fn test_validate() {
        let invalid = [
            SwitchConfig {
                queues_per_port: 0,
                ..SwitchConfig::default()
            },
            SwitchConfig {
                queues_per_port: 33,
                ..SwitchConfig::default()
            },
            SwitchConfig {
                egress_workers: 0,
                ..SwitchConfig::default()
            },
            SwitchConfig {
                input_buffer_size: 0,
                ..SwitchConfig::default()
            },
            SwitchConfig {
                queue_buffer_size: 0,
                ..SwitchConfig::default()
            },
        ];
        for config in invalid {
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        }
    }

    #[test]
    fn test_rate_zero_disables_timer() {
        let config = SwitchConfig {
            packet_rate_pps: 0,
            ..SwitchConfig::default()
        };
        config.validate().unwrap();
        assert_eq!(config.egress_interval(), Duration::ZERO);
    }

    #[test]
    fn test_yaml() {
        let config = SwitchConfig::from_yaml_str("switch_id: 7\npacket_rate_pps: 2000\n").unwrap();
        assert_eq!(config.switch_id, 7);
        assert_eq!(config.egress_interval(), Duration::from_micros(500));
        assert_eq!(config.queues_per_port, 8);

        let yaml = config.to_yaml().unwrap();
        assert_eq!(SwitchConfig::from_yaml_str(&yaml).unwrap(), config);
    }

    #[test]
    fn test_yaml_errors() {
        assert!(matches!(
            SwitchConfig::from_yaml_str("no_such_field: 1"),
            Err(ConfigError::Yaml(_))
        ));
        assert!(matches!(
            SwitchConfig::from_yaml_str("queues_per_port: 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SwitchConfig::from_yaml_file("/nonexistent/switch.yaml"),
            Err(ConfigError::Io(_))
        ));
    }
}
