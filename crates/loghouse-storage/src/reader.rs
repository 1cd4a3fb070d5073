//! Sequential Log Reader
//!
//! `LogReader` streams the raw store bytes of every segment, oldest first.
//! The bytes come out exactly as they sit on disk: a concatenation of
//! length-prefixed frames. Segment boundaries always fall on frame
//! boundaries (frames are written atomically into one store), so a consumer
//! only needs to honor the u64 big-endian length prefixes to walk records
//! across the entire log.
//!
//! This is the hook snapshot and replication tooling read through - it
//! avoids decoding and re-encoding every record just to copy the log.

use std::io::Read;

use crate::store::StoreReader;

/// Reads the concatenated raw store bytes of all segments in order.
pub struct LogReader {
    readers: Vec<StoreReader>,
    current: usize,
}

impl LogReader {
    pub(crate) fn new(readers: Vec<StoreReader>) -> Self {
        Self {
            readers,
            current: 0,
        }
    }
}

impl Read for LogReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.current < self.readers.len() {
            let n = self.readers[self.current].read(buf)?;
            if n > 0 {
                return Ok(n);
            }
            self.current += 1;
        }
        Ok(0)
    }
}
