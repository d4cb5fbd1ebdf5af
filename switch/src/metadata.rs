// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! PSA standard metadata.
//!
//! The switch reads and writes a fixed set of metadata fields. They are resolved once, when
//! a program is loaded, into a [`PsaFields`] so that the packet path does not perform name
//! lookups.

use crate::errors::ConfigError;
use phv::{FieldId, PhvSchema, SchemaBuilder};

pub const INGRESS_PARSER_INPUT: &str = "psa_ingress_parser_input_metadata";
pub const INGRESS_INPUT: &str = "psa_ingress_input_metadata";
pub const INGRESS_OUTPUT: &str = "psa_ingress_output_metadata";
pub const EGRESS_PARSER_INPUT: &str = "psa_egress_parser_input_metadata";
pub const EGRESS_INPUT: &str = "psa_egress_input_metadata";
pub const EGRESS_OUTPUT: &str = "psa_egress_output_metadata";
pub const EGRESS_DEPARSER_INPUT: &str = "psa_egress_deparser_input_metadata";

/// Optional field holding the priority of the egress queue
pub const PRIORITY_FIELD: &str = "intrinsic_metadata.priority";

pub const QUEUEING_METADATA: &str = "queueing_metadata";

const PORT: u16 = 32;
const PATH: u16 = 32;
const TIMESTAMP: u16 = 64;
const ERROR: u16 = 32;

/// Standard metadata headers, with the width of each field
const PSA_HEADERS: &[(&str, &[(&str, u16)])] = &[
    (INGRESS_PARSER_INPUT, &[("ingress_port", PORT), ("packet_path", PATH)]),
    (
        INGRESS_INPUT,
        &[
            ("ingress_port", PORT),
            ("packet_path", PATH),
            ("ingress_timestamp", TIMESTAMP),
            ("parser_error", ERROR),
        ],
    ),
    (
        INGRESS_OUTPUT,
        &[
            ("class_of_service", 8),
            ("clone", 1),
            ("clone_session_id", 16),
            ("drop", 1),
            ("resubmit", 1),
            ("multicast_group", 32),
            ("egress_port", PORT),
        ],
    ),
    (EGRESS_PARSER_INPUT, &[("egress_port", PORT), ("packet_path", PATH)]),
    (
        EGRESS_INPUT,
        &[
            ("class_of_service", 8),
            ("egress_port", PORT),
            ("packet_path", PATH),
            ("instance", 16),
            ("egress_timestamp", TIMESTAMP),
            ("parser_error", ERROR),
        ],
    ),
    (EGRESS_OUTPUT, &[("clone", 1), ("clone_session_id", 16), ("drop", 1)]),
    (EGRESS_DEPARSER_INPUT, &[("egress_port", PORT)]),
];

const QUEUEING_FIELDS: &[(&str, u16)] = &[
    ("enq_timestamp", TIMESTAMP),
    ("enq_qdepth", 32),
    ("deq_timedelta", 32),
    ("deq_qdepth", 32),
];

/// Extension of [`SchemaBuilder`] to declare PSA metadata
pub trait PsaSchemaExt {
    /// Add the standard metadata headers that are not declared yet
    #[must_use]
    fn psa_metadata(self) -> Self;
    /// Add `intrinsic_metadata.priority`
    #[must_use]
    fn priority_metadata(self) -> Self;
    /// Add the `queueing_metadata` header
    #[must_use]
    fn queueing_metadata(self) -> Self;
}

impl PsaSchemaExt for SchemaBuilder {
    fn psa_metadata(self) -> Self {
        PSA_HEADERS.iter().fold(self, |builder, (name, fields)| {
            if builder.has_header(name) {
                builder
            } else {
                builder.metadata(name, fields)
            }
        })
    }

    fn priority_metadata(self) -> Self {
        self.metadata("intrinsic_metadata", &[("priority", 8)])
    }

    fn queueing_metadata(self) -> Self {
        self.metadata(QUEUEING_METADATA, QUEUEING_FIELDS)
    }
}

fn required(schema: &PhvSchema, header: &str, field: &str) -> Result<FieldId, ConfigError> {
    let name = format!("{header}.{field}");
    schema.field_id(&name).ok_or(ConfigError::MissingField(name))
}

/// Fields written when the program declares `queueing_metadata`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueingFields {
    pub enq_timestamp: FieldId,
    pub enq_qdepth: FieldId,
    pub deq_timedelta: FieldId,
    pub deq_qdepth: FieldId,
}

impl QueueingFields {
    /// Resolve the queueing fields. All of them must be present.
    #[must_use]
    pub fn resolve(schema: &PhvSchema) -> Option<Self> {
        let field = |name: &str| schema.field_id(&format!("{QUEUEING_METADATA}.{name}"));
        Some(Self {
            enq_timestamp: field("enq_timestamp")?,
            enq_qdepth: field("enq_qdepth")?,
            deq_timedelta: field("deq_timedelta")?,
            deq_qdepth: field("deq_qdepth")?,
        })
    }
}

/// Resolved standard metadata fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PsaFields {
    pub ig_parser_port: FieldId,
    pub ig_parser_path: FieldId,

    pub ig_port: FieldId,
    pub ig_path: FieldId,
    pub ig_timestamp: FieldId,
    pub ig_parser_error: FieldId,

    pub ig_cos: FieldId,
    pub ig_clone: FieldId,
    pub ig_clone_session: FieldId,
    pub ig_drop: FieldId,
    pub ig_resubmit: FieldId,
    pub ig_mgid: FieldId,
    pub ig_egress_port: FieldId,

    pub eg_parser_port: FieldId,
    pub eg_parser_path: FieldId,

    pub eg_cos: FieldId,
    pub eg_port: FieldId,
    pub eg_path: FieldId,
    pub eg_instance: FieldId,
    pub eg_timestamp: FieldId,
    pub eg_parser_error: FieldId,

    pub eg_clone: FieldId,
    pub eg_clone_session: FieldId,
    pub eg_drop: FieldId,

    pub eg_deparser_port: FieldId,

    pub priority: Option<FieldId>,
}

impl PsaFields {
    /// Resolve every required field.
    /// # Errors
    ///
    /// Fails with [`ConfigError::MissingField`] naming the first missing field.
    pub fn resolve(schema: &PhvSchema) -> Result<Self, ConfigError> {
        Ok(Self {
            ig_parser_port: required(schema, INGRESS_PARSER_INPUT, "ingress_port")?,
            ig_parser_path: required(schema, INGRESS_PARSER_INPUT, "packet_path")?,

            ig_port: required(schema, INGRESS_INPUT, "ingress_port")?,
            ig_path: required(schema, INGRESS_INPUT, "packet_path")?,
            ig_timestamp: required(schema, INGRESS_INPUT, "ingress_timestamp")?,
            ig_parser_error: required(schema, INGRESS_INPUT, "parser_error")?,

            ig_cos: required(schema, INGRESS_OUTPUT, "class_of_service")?,
            ig_clone: required(schema, INGRESS_OUTPUT, "clone")?,
            ig_clone_session: required(schema, INGRESS_OUTPUT, "clone_session_id")?,
            ig_drop: required(schema, INGRESS_OUTPUT, "drop")?,
            ig_resubmit: required(schema, INGRESS_OUTPUT, "resubmit")?,
            ig_mgid: required(schema, INGRESS_OUTPUT, "multicast_group")?,
            ig_egress_port: required(schema, INGRESS_OUTPUT, "egress_port")?,

            eg_parser_port: required(schema, EGRESS_PARSER_INPUT, "egress_port")?,
            eg_parser_path: required(schema, EGRESS_PARSER_INPUT, "packet_path")?,

            eg_cos: required(schema, EGRESS_INPUT, "class_of_service")?,
            eg_port: required(schema, EGRESS_INPUT, "egress_port")?,
            eg_path: required(schema, EGRESS_INPUT, "packet_path")?,
            eg_instance: required(schema, EGRESS_INPUT, "instance")?,
            eg_timestamp: required(schema, EGRESS_INPUT, "egress_timestamp")?,
            eg_parser_error: required(schema, EGRESS_INPUT, "parser_error")?,

            eg_clone: required(schema, EGRESS_OUTPUT, "clone")?,
            eg_clone_session: required(schema, EGRESS_OUTPUT, "clone_session_id")?,
            eg_drop: required(schema, EGRESS_OUTPUT, "drop")?,

            eg_deparser_port: required(schema, EGRESS_DEPARSER_INPUT, "egress_port")?,

            priority: schema.field_id(PRIORITY_FIELD),
        })
    }
}
