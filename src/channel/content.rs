//! Positioned content units
//!
//! A content unit is one immutable chunk of stream payload at a byte
//! position within the channel. Positions are monotonically non-decreasing
//! per channel but not necessarily contiguous; a later unit may represent a
//! skip. Cloning is cheap because the payload is a reference-counted
//! `Bytes`, so every output stream in a fan-out pass shares one allocation.

use bytes::Bytes;

/// One immutable, positioned chunk of stream payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    position: u64,
    data: Bytes,
}

impl Content {
    /// Create a content unit at the given stream position
    pub fn new(position: u64, data: impl Into<Bytes>) -> Self {
        Self {
            position,
            data: data.into(),
        }
    }

    /// Byte offset of this unit within the channel's stream
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Payload bytes
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
