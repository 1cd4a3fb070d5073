//! Record Data Structure
//!
//! This module defines the `Record` type - the unit of data in a Loghouse log.
//!
//! ## What is a Record?
//! A record is a single entry in the commit log:
//! - **offset**: Unique, monotonically increasing ID within a log, assigned
//!   by the storage engine at append time
//! - **value**: The payload (arbitrary bytes)
//!
//! The engine never interprets the value. Producers hand in bytes, consumers
//! get the same bytes back, and the offset is the only piece of metadata the
//! engine attaches.
//!
//! ## Design Decisions
//! - Uses `bytes::Bytes` for zero-copy operations (no allocations when slicing)
//! - Implements `Serialize`/`Deserialize` so collaborators can ship records
//!   over whatever wire format they choose
//! - Offset is u64 to support very large logs

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A single record in the log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Offset of this record in the log
    pub offset: u64,

    /// Value (payload)
    pub value: Bytes,
}

impl Record {
    pub fn new(offset: u64, value: Bytes) -> Self {
        Self { offset, value }
    }

    /// Bytes this record occupies on disk: the payload plus the u64 length
    /// prefix its store frame carries.
    pub fn frame_size(&self) -> usize {
        8 + self.value.len()
    }
}
