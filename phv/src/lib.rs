// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Packet header view (PHV)
//!
//! A [`Phv`] holds the parsed header and metadata state of a packet as a set of width-aware
//! unsigned fields addressed by qualified name (`header.field`). The layout of a PHV is given
//! by a [`PhvSchema`], which is built once per loaded program and shared by all the packets.

#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

mod errors;
mod phv;
mod schema;

pub use errors::PhvError;
pub use phv::Phv;
pub use schema::{FieldId, FieldSpec, HeaderId, HeaderSpec, MAX_FIELD_WIDTH, PhvSchema, SchemaBuilder};
