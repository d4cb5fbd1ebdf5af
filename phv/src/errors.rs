// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Errors of PHV schema construction and field access

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PhvError {
    #[error("Unknown header '{0}'")]
    UnknownHeader(String),
    #[error("Unknown field '{0}'")]
    UnknownField(String),
    #[error("Header '{0}' is defined more than once")]
    DuplicateHeader(String),
    #[error("Field '{0}' is defined more than once")]
    DuplicateField(String),
    #[error("Invalid width {width} for field '{field}'")]
    InvalidWidth { field: String, width: u16 },
    #[error("Value {value:#x} of field '{field}' does not fit in the requested type")]
    ValueTooWide { field: String, value: u128 },
    #[error("Header stack '{0}' is full")]
    StackFull(String),
    #[error("Unknown header stack '{0}'")]
    UnknownStack(String),
    #[error("Metadata header '{0}' can't be part of a header stack")]
    MetadataInStack(String),
}
