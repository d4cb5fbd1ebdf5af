// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use clap::Parser;
use std::path::PathBuf;
use switch::{ConfigError, SwitchConfig};

#[derive(Parser, Debug)]
#[command(name = "psa-switch")]
#[command(version)]
#[command(about = "Run a PSA switch on simulated time with synthetic traffic", long_about = None)]
pub struct CmdArgs {
    #[arg(long, value_name = "PATH", help = "YAML switch configuration")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "PPS", help = "Line rate in packets per second, 0 to disable egress pacing")]
    rate: Option<u64>,

    #[arg(
        long,
        value_name = "N",
        value_parser = clap::value_parser!(u16).range(1..=32),
        help = "Number of priority queues per egress port in [1..32]"
    )]
    queues: Option<u16>,

    #[arg(
        long,
        value_name = "N",
        default_value_t = 4,
        value_parser = clap::value_parser!(u32).range(1..),
        help = "Number of switch ports traffic is spread over"
    )]
    pub ports: u32,

    #[arg(long, value_name = "N", default_value_t = 1000, help = "Number of packets to inject")]
    pub packets: u64,

    #[arg(
        long,
        value_name = "NS",
        default_value_t = 500,
        help = "Time between two injected packets, in ns"
    )]
    pub interval_ns: u64,

    #[arg(
        long,
        value_name = "BYTES",
        default_value_t = 64,
        help = "Size of injected frames, at least 14"
    )]
    pub packet_size: usize,

    #[arg(long, value_name = "US", default_value_t = 1000, help = "Simulated run time, in us")]
    pub duration_us: u64,

    #[arg(
        long,
        value_name = "FILTER",
        help = "Log filter, e.g. 'info' or 'psa_switch=debug'. Defaults to RUST_LOG, then 'info'"
    )]
    pub log_level: Option<String>,
}

impl CmdArgs {
    /// Switch configuration: the configuration file if any, overridden by the command line
    pub fn switch_config(&self) -> Result<SwitchConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => SwitchConfig::from_yaml_file(path)?,
            None => SwitchConfig::default(),
        };
        if let Some(rate) = self.rate {
            config.packet_rate_pps = rate;
        }
        if let Some(queues) = self.queues {
            config.queues_per_port = usize::from(queues);
        }
        config.validate()?;
        Ok(config)
    }
}
