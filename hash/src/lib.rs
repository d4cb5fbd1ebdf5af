// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Named hash functions available to match-action programs.
//!
//! Algorithms are registered explicitly in a [`HashRegistry`] owned by whoever builds the
//! switch. [`HashRegistry::with_defaults`] provides `hash_ex` and `bmv2_hash`.

#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

mod algorithms;

pub use algorithms::{bmv2_hash, hash_ex};

use ordermap::OrderMap;
use thiserror::Error;
#[allow(unused)]
use tracing::{debug, warn};

/// A keyed hash function
pub type HashFn = fn(&[u8]) -> u64;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HashError {
    #[error("Unknown hash algorithm '{0}'")]
    UnknownAlgorithm(String),
    #[error("Hash algorithm '{0}' is already registered")]
    Duplicate(String),
}

/// Hash algorithms by name
#[derive(Debug, Clone, Default)]
pub struct HashRegistry {
    algorithms: OrderMap<String, HashFn>,
}

impl HashRegistry {
    /// An empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the builtin algorithms
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut algorithms = OrderMap::new();
        algorithms.insert("hash_ex".to_string(), hash_ex as HashFn);
        algorithms.insert("bmv2_hash".to_string(), bmv2_hash as HashFn);
        Self { algorithms }
    }

    pub fn register(&mut self, name: &str, function: HashFn) -> Result<(), HashError> {
        if self.algorithms.contains_key(name) {
            warn!("Refusing to register hash algorithm '{name}' twice");
            return Err(HashError::Duplicate(name.to_string()));
        }
        debug!("Registered hash algorithm '{name}'");
        self.algorithms.insert(name.to_string(), function);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<HashFn> {
        self.algorithms.get(name).copied()
    }

    /// Hash `data` with the algorithm named `name`
    pub fn hash(&self, name: &str, data: &[u8]) -> Result<u64, HashError> {
        let function = self
            .get(name)
            .ok_or_else(|| HashError::UnknownAlgorithm(name.to_string()))?;
        Ok(function(data))
    }

    /// Names of the registered algorithms, in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.algorithms.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.algorithms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.algorithms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(_: &[u8]) -> u64 {
        42
    }

    #[test]
    fn test_defaults() {
        let registry = HashRegistry::with_defaults();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["hash_ex", "bmv2_hash"]);
        assert_eq!(registry.hash("hash_ex", b"abc").unwrap(), hash_ex(b"abc"));
        assert_eq!(registry.hash("bmv2_hash", b"abc").unwrap(), bmv2_hash(b"abc"));
    }

    #[test]
    fn test_register() {
        let mut registry = HashRegistry::new();
        assert!(registry.is_empty());
        registry.register("constant", constant).unwrap();
        assert_eq!(registry.hash("constant", &[1, 2]).unwrap(), 42);
        assert_eq!(
            registry.register("constant", constant),
            Err(HashError::Duplicate("constant".to_string()))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown() {
        let registry = HashRegistry::with_defaults();
        assert_eq!(
            registry.hash("crc7", b""),
            Err(HashError::UnknownAlgorithm("crc7".to_string()))
        );
        assert!(registry.get("crc7").is_none());
    }
}
