// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use phv::PhvError;
use thiserror::Error;

/// Errors detected when building or reconfiguring a switch. They are fatal for the
/// operation that reported them; the packet path never produces them.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Required field '{0}' is missing from the program")]
    MissingField(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
    #[error(transparent)]
    Phv(#[from] PhvError),
}
