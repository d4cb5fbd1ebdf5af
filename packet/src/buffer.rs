// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! [`PacketBuffer`] and related traits

use std::convert::Infallible;
use std::fmt::Debug;

/// Headroom reserved in front of a payload when a buffer is created
pub const DEFAULT_HEADROOM: usize = 128;

/// Trait representing the ability to get the unused headroom in a packet buffer.
pub trait Headroom {
    /// Get the (unused) headroom in a packet buffer.
    fn headroom(&self) -> usize;
}

/// Trait representing the ability to prepend data to a packet buffer.
pub trait Prepend {
    /// Error which may occur when attempting to prepend data to the buffer.
    type Error: Debug;
    /// Prepend `len` bytes to the buffer, returning a slice to the new start of the buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the operation can not be performed.
    fn prepend(&mut self, len: usize) -> Result<&mut [u8], Self::Error>;
}

/// Trait representing the ability to trim data from the start of a packet buffer.
pub trait TrimFromStart {
    /// Error which may occur when attempting to trim data from the start of the buffer.
    type Error: Debug;
    /// Trim `len` bytes from the start of the buffer, returning the remaining data.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the buffer does not have `len` bytes in it.
    fn trim_from_start(&mut self, len: usize) -> Result<&mut [u8], Self::Error>;
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("Buffer holds {available} bytes, {requested} were requested")]
    NotLongEnough { requested: usize, available: usize },
    #[error("Can't restore a state of {data_size} bytes on a buffer of {capacity} bytes")]
    InvalidState { data_size: usize, capacity: usize },
}

/// Snapshot of how much of a buffer has not been consumed by a parser.
///
/// Bytes are only ever pulled from or pushed to the front of a buffer, so the
/// size of the remaining data fully identifies a parse position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferState {
    data_size: usize,
}

impl BufferState {
    #[must_use]
    pub fn data_size(&self) -> usize {
        self.data_size
    }
}

/// A byte buffer with headroom. Parsing pulls bytes from the front, deparsing pushes them back.
/// Pulled bytes stay in the headroom so that an earlier [`BufferState`] can be restored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketBuffer {
    data: Vec<u8>,
    head: usize,
}

impl PacketBuffer {
    #[must_use]
    pub fn new(payload: &[u8]) -> Self {
        Self::with_headroom(payload, DEFAULT_HEADROOM)
    }

    #[must_use]
    pub fn with_headroom(payload: &[u8], headroom: usize) -> Self {
        let mut data = vec![0; headroom + payload.len()];
        data[headroom..].copy_from_slice(payload);
        Self {
            data,
            head: headroom,
        }
    }

    /// Number of bytes not yet consumed
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len() - self.head
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn save_state(&self) -> BufferState {
        BufferState {
            data_size: self.len(),
        }
    }

    /// Move the start of the buffer back (or forth) to where it was when `state` was saved
    pub fn restore_state(&mut self, state: BufferState) -> Result<(), BufferError> {
        if state.data_size > self.data.len() {
            return Err(BufferError::InvalidState {
                data_size: state.data_size,
                capacity: self.data.len(),
            });
        }
        self.head = self.data.len() - state.data_size;
        Ok(())
    }

    /// Consume `len` bytes from the front of the buffer and return them
    pub fn pull(&mut self, len: usize) -> Result<&[u8], BufferError> {
        let start = self.head;
        self.trim_from_start(len)?;
        Ok(&self.data[start..start + len])
    }

    /// Push `bytes` in front of the buffer
    pub fn push(&mut self, bytes: &[u8]) {
        match self.prepend(bytes.len()) {
            Ok(front) => front[..bytes.len()].copy_from_slice(bytes),
            Err(never) => match never {},
        }
    }
}

impl AsRef<[u8]> for PacketBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data[self.head..]
    }
}

impl AsMut<[u8]> for PacketBuffer {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.head..]
    }
}

impl Headroom for PacketBuffer {
    fn headroom(&self) -> usize {
        self.head
    }
}

impl Prepend for PacketBuffer {
    type Error = Infallible;

    fn prepend(&mut self, len: usize) -> Result<&mut [u8], Self::Error> {
        if len > self.head {
            let grow = len - self.head + DEFAULT_HEADROOM;
            let mut data = vec![0; grow + self.data.len()];
            data[grow..].copy_from_slice(&self.data);
            self.data = data;
            self.head += grow;
        }
        self.head -= len;
        Ok(&mut self.data[self.head..])
    }
}

impl TrimFromStart for PacketBuffer {
    type Error = BufferError;

    fn trim_from_start(&mut self, len: usize) -> Result<&mut [u8], Self::Error> {
        if len > self.len() {
            return Err(BufferError::NotLongEnough {
                requested: len,
                available: self.len(),
            });
        }
        self.head += len;
        Ok(&mut self.data[self.head..])
    }
}
