// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Per-packet header and metadata values

use crate::schema::{FieldId, HeaderId, PhvSchema};
use crate::PhvError;
use std::fmt::Display;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
struct HeaderState {
    valid: bool,
    values: Vec<u128>,
}

/// The header view of a single packet.
///
/// Cloning a [`Phv`] yields a fully independent copy: packets never share header state.
#[derive(Debug, Clone)]
pub struct Phv {
    schema: Arc<PhvSchema>,
    headers: Vec<HeaderState>,
    stack_next: Vec<usize>,
}

impl PartialEq for Phv {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.schema, &other.schema)
            && self.headers == other.headers
            && self.stack_next == other.stack_next
    }
}

impl Phv {
    /// Build a PHV for the given schema: metadata headers are valid, packet headers are not,
    /// and all fields are zero.
    #[must_use]
    pub fn new(schema: &Arc<PhvSchema>) -> Self {
        let headers = schema
            .headers()
            .map(|(_, spec)| HeaderState {
                valid: spec.metadata,
                values: vec![0; spec.fields.len()],
            })
            .collect();
        Self {
            schema: Arc::clone(schema),
            headers,
            stack_next: vec![0; schema.num_stacks()],
        }
    }

    #[must_use]
    pub fn schema(&self) -> &Arc<PhvSchema> {
        &self.schema
    }

    /// Read a field
    #[must_use]
    pub fn get(&self, id: FieldId) -> u128 {
        self.headers[id.header].values[id.field]
    }

    /// Write a field. The value is truncated to the width of the field.
    pub fn set(&mut self, id: FieldId, value: impl Into<u128>) {
        let mask = self.schema.field(id).mask();
        self.headers[id.header].values[id.field] = value.into() & mask;
    }

    /// Read a field converted to `T`
    ///
    /// # Errors
    ///
    /// Fails with [`PhvError::ValueTooWide`] if the current value does not fit in `T`.
    pub fn get_as<T: TryFrom<u128>>(&self, id: FieldId) -> Result<T, PhvError> {
        let value = self.get(id);
        T::try_from(value).map_err(|_| PhvError::ValueTooWide {
            field: self.schema.field_name(id),
            value,
        })
    }

    /// Tell if a field is non-zero. This is how one-bit flags are read.
    #[must_use]
    pub fn is_set(&self, id: FieldId) -> bool {
        self.get(id) != 0
    }

    #[must_use]
    pub fn has_field(&self, qualified: &str) -> bool {
        self.schema.has_field(qualified)
    }

    /// Read a field by qualified name
    pub fn field(&self, qualified: &str) -> Result<u128, PhvError> {
        Ok(self.get(self.schema.resolve(qualified)?))
    }

    /// Read a field by qualified name, converted to `T`
    pub fn field_as<T: TryFrom<u128>>(&self, qualified: &str) -> Result<T, PhvError> {
        self.get_as(self.schema.resolve(qualified)?)
    }

    /// Write a field by qualified name
    pub fn set_field(&mut self, qualified: &str, value: impl Into<u128>) -> Result<(), PhvError> {
        let id = self.schema.resolve(qualified)?;
        self.set(id, value);
        Ok(())
    }

    #[must_use]
    pub fn is_valid(&self, header: HeaderId) -> bool {
        self.headers[header.0].valid
    }

    /// Set the validity bit of a header. Metadata headers remain valid.
    pub fn set_valid(&mut self, header: HeaderId, valid: bool) {
        if !self.schema.header(header).metadata {
            self.headers[header.0].valid = valid;
        }
    }

    pub fn header_valid(&self, name: &str) -> Result<bool, PhvError> {
        let id = self
            .schema
            .header_id(name)
            .ok_or_else(|| PhvError::UnknownHeader(name.to_owned()))?;
        Ok(self.is_valid(id))
    }

    pub fn set_header_valid(&mut self, name: &str, valid: bool) -> Result<(), PhvError> {
        let id = self
            .schema
            .header_id(name)
            .ok_or_else(|| PhvError::UnknownHeader(name.to_owned()))?;
        self.set_valid(id, valid);
        Ok(())
    }

    /// Headers currently valid, excluding metadata
    pub fn valid_headers(&self) -> impl Iterator<Item = HeaderId> + '_ {
        self.schema
            .headers()
            .filter(|(id, spec)| !spec.metadata && self.is_valid(*id))
            .map(|(id, _)| id)
    }

    /// Mark every packet header invalid and clear its fields. Metadata is untouched.
    pub fn reset(&mut self) {
        for (state, (_, spec)) in self.headers.iter_mut().zip(self.schema.headers()) {
            if !spec.metadata {
                state.valid = false;
                state.values.fill(0);
            }
        }
    }

    /// Clear every metadata field
    pub fn reset_metadata(&mut self) {
        for (state, (_, spec)) in self.headers.iter_mut().zip(self.schema.headers()) {
            if spec.metadata {
                state.values.fill(0);
            }
        }
    }

    /// Rewind all header stacks
    pub fn reset_header_stacks(&mut self) {
        self.stack_next.fill(0);
    }

    /// Index of the next free element of a header stack
    pub fn stack_next(&self, stack: &str) -> Result<usize, PhvError> {
        let index = self
            .schema
            .stack_index(stack)
            .ok_or_else(|| PhvError::UnknownStack(stack.to_owned()))?;
        Ok(self.stack_next[index])
    }

    /// Make the next element of a header stack valid and return it
    pub fn push_stack(&mut self, stack: &str) -> Result<HeaderId, PhvError> {
        let index = self
            .schema
            .stack_index(stack)
            .ok_or_else(|| PhvError::UnknownStack(stack.to_owned()))?;
        let next = self.stack_next[index];
        let Some(&header) = self.schema.stack(index).members.get(next) else {
            return Err(PhvError::StackFull(stack.to_owned()));
        };
        self.headers[header.0].valid = true;
        self.stack_next[index] = next + 1;
        Ok(header)
    }
}

impl Display for Phv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for ((_, spec), state) in self.schema.headers().zip(&self.headers) {
            if !state.valid {
                continue;
            }
            write!(f, "{}:", spec.name)?;
            for (field, value) in spec.fields.iter().zip(&state.values) {
                write!(f, " {}={value:#x}", field.name)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PhvSchema;

    fn schema() -> Arc<PhvSchema> {
        PhvSchema::builder()
            .header("ethernet", &[("dst", 48), ("src", 48), ("ether_type", 16)])
            .header("mpls0", &[("label", 20)])
            .header("mpls1", &[("label", 20)])
            .metadata("meta", &[("flag", 1), ("port", 32), ("wide", 128)])
            .stack("mpls", &["mpls0", "mpls1"])
            .build()
            .unwrap()
    }

    #[test]
    fn test_new_phv_state() {
        let schema = schema();
        let phv = Phv::new(&schema);
        assert!(!phv.header_valid("ethernet").unwrap());
        assert!(phv.header_valid("meta").unwrap());
        assert_eq!(phv.field("meta.port").unwrap(), 0);
        assert_eq!(phv.valid_headers().count(), 0);
    }

    #[test]
    fn test_set_truncates_to_width() {
        let schema = schema();
        let mut phv = Phv::new(&schema);
        phv.set_field("meta.flag", 3u8).unwrap();
        assert_eq!(phv.field("meta.flag").unwrap(), 1);
        phv.set_field("ethernet.ether_type", 0x1_0800u32).unwrap();
        assert_eq!(phv.field("ethernet.ether_type").unwrap(), 0x0800);
        phv.set_field("meta.wide", u128::MAX).unwrap();
        assert_eq!(phv.field("meta.wide").unwrap(), u128::MAX);
    }

    #[test]
    fn test_typed_access() {
        let schema = schema();
        let mut phv = Phv::new(&schema);
        phv.set_field("meta.port", 0x1_0000u32).unwrap();
        assert_eq!(phv.field_as::<u32>("meta.port").unwrap(), 0x1_0000);
        assert!(matches!(
            phv.field_as::<u16>("meta.port"),
            Err(PhvError::ValueTooWide { value: 0x1_0000, .. })
        ));
        assert!(matches!(
            phv.set_field("meta.none", 1u8),
            Err(PhvError::UnknownField(_))
        ));
        let id = schema.field_id("meta.flag").unwrap();
        assert!(!phv.is_set(id));
        phv.set(id, true);
        assert!(phv.is_set(id));
    }

    #[test]
    fn test_resets() {
        let schema = schema();
        let mut phv = Phv::new(&schema);
        phv.set_header_valid("ethernet", true).unwrap();
        phv.set_field("ethernet.src", 0xaabb_u32).unwrap();
        phv.set_field("meta.port", 7u32).unwrap();
        phv.push_stack("mpls").unwrap();

        phv.reset();
        assert!(!phv.header_valid("ethernet").unwrap());
        assert!(!phv.header_valid("mpls0").unwrap());
        assert_eq!(phv.field("ethernet.src").unwrap(), 0);
        assert_eq!(phv.field("meta.port").unwrap(), 7);
        assert_eq!(phv.stack_next("mpls").unwrap(), 1);

        phv.reset_header_stacks();
        assert_eq!(phv.stack_next("mpls").unwrap(), 0);

        phv.reset_metadata();
        assert_eq!(phv.field("meta.port").unwrap(), 0);
        assert!(phv.header_valid("meta").unwrap());
    }

    #[test]
    fn test_metadata_always_valid() {
        let schema = schema();
        let mut phv = Phv::new(&schema);
        phv.set_header_valid("meta", false).unwrap();
        assert!(phv.header_valid("meta").unwrap());
    }

    #[test]
    fn test_header_stack() {
        let schema = schema();
        let mut phv = Phv::new(&schema);
        let first = phv.push_stack("mpls").unwrap();
        assert_eq!(first, schema.header_id("mpls0").unwrap());
        let second = phv.push_stack("mpls").unwrap();
        assert_eq!(second, schema.header_id("mpls1").unwrap());
        assert_eq!(
            phv.push_stack("mpls"),
            Err(PhvError::StackFull("mpls".to_owned()))
        );
        assert!(phv.header_valid("mpls1").unwrap());
        assert_eq!(
            phv.stack_next("vlan"),
            Err(PhvError::UnknownStack("vlan".to_owned()))
        );
    }

    #[test]
    fn test_clones_are_independent() {
        let schema = schema();
        let mut phv = Phv::new(&schema);
        phv.set_field("meta.port", 1u32).unwrap();
        let mut copy = phv.clone();
        assert_eq!(copy, phv);
        copy.set_field("meta.port", 2u32).unwrap();
        assert_eq!(phv.field("meta.port").unwrap(), 1);
        assert_ne!(copy, phv);
    }

    #[test]
    fn test_masking_never_exceeds_width() {
        let schema = schema();
        let id = schema.field_id("mpls0.label").unwrap();
        bolero::check!()
            .with_type::<u128>()
            .for_each(|value: &u128| {
                let mut phv = Phv::new(&schema);
                phv.set(id, *value);
                assert!(phv.get(id) < (1 << 20));
                assert_eq!(phv.get(id), value & 0xf_ffff);
            });
    }
}
