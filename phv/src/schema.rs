// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! PHV layout: headers, fields and header stacks

use crate::PhvError;
use ordermap::OrderMap;
use std::fmt::Display;
use std::sync::Arc;

/// Widest field supported
pub const MAX_FIELD_WIDTH: u16 = 128;

/// Index of a header in a [`PhvSchema`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeaderId(pub(crate) usize);

/// Index of a field in a [`PhvSchema`]. Resolving a qualified name to a [`FieldId`] once
/// avoids string lookups when the field is accessed per packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId {
    pub(crate) header: usize,
    pub(crate) field: usize,
}

impl FieldId {
    #[must_use]
    pub fn header(&self) -> HeaderId {
        HeaderId(self.header)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub width: u16,
}

impl FieldSpec {
    #[must_use]
    pub(crate) fn mask(&self) -> u128 {
        if self.width >= MAX_FIELD_WIDTH {
            u128::MAX
        } else {
            (1u128 << self.width) - 1
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderSpec {
    pub name: String,
    pub metadata: bool,
    pub fields: Vec<FieldSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StackSpec {
    pub(crate) name: String,
    pub(crate) members: Vec<HeaderId>,
}

/// The layout of the PHV of a program
#[derive(Debug)]
pub struct PhvSchema {
    headers: Vec<HeaderSpec>,
    stacks: Vec<StackSpec>,
    header_index: OrderMap<String, HeaderId>,
    field_index: OrderMap<String, FieldId>,
    stack_index: OrderMap<String, usize>,
}

impl PhvSchema {
    #[must_use]
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    #[must_use]
    pub fn header_id(&self, name: &str) -> Option<HeaderId> {
        self.header_index.get(name).copied()
    }

    /// Resolve a qualified field name (`header.field`)
    #[must_use]
    pub fn field_id(&self, qualified: &str) -> Option<FieldId> {
        self.field_index.get(qualified).copied()
    }

    /// Like [`PhvSchema::field_id`] but failing with [`PhvError::UnknownField`]
    pub fn resolve(&self, qualified: &str) -> Result<FieldId, PhvError> {
        self.field_id(qualified)
            .ok_or_else(|| PhvError::UnknownField(qualified.to_owned()))
    }

    #[must_use]
    pub fn has_field(&self, qualified: &str) -> bool {
        self.field_index.contains_key(qualified)
    }

    #[must_use]
    pub fn header(&self, id: HeaderId) -> &HeaderSpec {
        &self.headers[id.0]
    }

    #[must_use]
    pub fn field(&self, id: FieldId) -> &FieldSpec {
        &self.headers[id.header].fields[id.field]
    }

    #[must_use]
    pub fn field_name(&self, id: FieldId) -> String {
        let header = &self.headers[id.header];
        format!("{}.{}", header.name, header.fields[id.field].name)
    }

    pub fn headers(&self) -> impl Iterator<Item = (HeaderId, &HeaderSpec)> {
        self.headers
            .iter()
            .enumerate()
            .map(|(n, spec)| (HeaderId(n), spec))
    }

    #[must_use]
    pub fn num_headers(&self) -> usize {
        self.headers.len()
    }

    #[must_use]
    pub(crate) fn num_stacks(&self) -> usize {
        self.stacks.len()
    }

    #[must_use]
    pub(crate) fn stack_index(&self, name: &str) -> Option<usize> {
        self.stack_index.get(name).copied()
    }

    #[must_use]
    pub(crate) fn stack(&self, index: usize) -> &StackSpec {
        &self.stacks[index]
    }
}

impl Display for PhvSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for header in &self.headers {
            let kind = if header.metadata { "metadata" } else { "header" };
            writeln!(f, "{kind} {}", header.name)?;
            for field in &header.fields {
                writeln!(f, "  {}: bit<{}>", field.name, field.width)?;
            }
        }
        for stack in &self.stacks {
            writeln!(f, "stack {} [{}]", stack.name, stack.members.len())?;
        }
        Ok(())
    }
}

/// Incremental construction of a [`PhvSchema`]
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    headers: Vec<HeaderSpec>,
    stacks: Vec<(String, Vec<String>)>,
}

impl SchemaBuilder {
    fn add(mut self, name: &str, metadata: bool, fields: &[(&str, u16)]) -> Self {
        self.headers.push(HeaderSpec {
            name: name.to_owned(),
            metadata,
            fields: fields
                .iter()
                .map(|(name, width)| FieldSpec {
                    name: (*name).to_owned(),
                    width: *width,
                })
                .collect(),
        });
        self
    }

    /// Add a packet header with the given `(name, width)` fields
    #[must_use]
    pub fn header(self, name: &str, fields: &[(&str, u16)]) -> Self {
        self.add(name, false, fields)
    }

    /// Add a metadata header. Metadata headers are always valid.
    #[must_use]
    pub fn metadata(self, name: &str, fields: &[(&str, u16)]) -> Self {
        self.add(name, true, fields)
    }

    /// Add a header stack made of previously declared headers, in order
    #[must_use]
    pub fn stack(mut self, name: &str, members: &[&str]) -> Self {
        self.stacks.push((
            name.to_owned(),
            members.iter().map(|m| (*m).to_owned()).collect(),
        ));
        self
    }

    /// Tell if a header with the given name was already added
    #[must_use]
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h.name == name)
    }

    /// Validate and freeze the schema
    pub fn build(self) -> Result<Arc<PhvSchema>, PhvError> {
        let mut header_index = OrderMap::new();
        let mut field_index = OrderMap::new();
        for (h, header) in self.headers.iter().enumerate() {
            if header_index
                .insert(header.name.clone(), HeaderId(h))
                .is_some()
            {
                return Err(PhvError::DuplicateHeader(header.name.clone()));
            }
            for (f, field) in header.fields.iter().enumerate() {
                let qualified = format!("{}.{}", header.name, field.name);
                if field.width == 0 || field.width > MAX_FIELD_WIDTH {
                    return Err(PhvError::InvalidWidth {
                        field: qualified,
                        width: field.width,
                    });
                }
                if field_index
                    .insert(qualified.clone(), FieldId { header: h, field: f })
                    .is_some()
                {
                    return Err(PhvError::DuplicateField(qualified));
                }
            }
        }

        let mut stacks = Vec::with_capacity(self.stacks.len());
        let mut stack_index = OrderMap::new();
        for (name, members) in self.stacks {
            let mut ids = Vec::with_capacity(members.len());
            for member in &members {
                let id = *header_index
                    .get(member)
                    .ok_or_else(|| PhvError::UnknownHeader(member.clone()))?;
                if self.headers[id.0].metadata {
                    return Err(PhvError::MetadataInStack(member.clone()));
                }
                ids.push(id);
            }
            stack_index.insert(name.clone(), stacks.len());
            stacks.push(StackSpec { name, members: ids });
        }

        Ok(Arc::new(PhvSchema {
            headers: self.headers,
            stacks,
            header_index,
            field_index,
            stack_index,
        }))
    }
}
