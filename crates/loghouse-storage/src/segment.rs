//! Log Segment
//!
//! A segment pairs one store file with one index file under a shared base
//! offset. The pair lives at `{base_offset}.store` / `{base_offset}.index`
//! inside the log directory.
//!
//! The segment owns the offset arithmetic: the index holds offsets relative
//! to `base_offset`, and `next_offset` tracks the offset the next append
//! will be assigned. On open, `next_offset` is recovered from the last
//! index entry, which makes the index the source of truth after a crash -
//! store bytes past the last indexed frame are unreachable and harmless.

use std::fs;
use std::path::Path;

use loghouse_core::Record;

use crate::config::LogConfig;
use crate::error::{Error, Result};
use crate::index::Index;
use crate::store::{Store, StoreReader};

/// One store/index pair covering the offset range
/// `[base_offset, next_offset)`.
pub struct Segment {
    store: Store,
    index: Index,
    base_offset: u64,
    next_offset: u64,
    config: LogConfig,
}

impl Segment {
    /// Open or create the segment for `base_offset` in `dir`.
    pub fn open(dir: impl AsRef<Path>, base_offset: u64, config: LogConfig) -> Result<Self> {
        let dir = dir.as_ref();
        let store = Store::open(dir.join(format!("{base_offset}.store")))?;
        let index = Index::open(dir.join(format!("{base_offset}.index")), &config)?;

        let next_offset = match index.read(-1) {
            Ok((rel_off, _)) => base_offset + rel_off as u64 + 1,
            Err(Error::EndOfIndex) => base_offset,
            Err(e) => return Err(e),
        };

        Ok(Self {
            store,
            index,
            base_offset,
            next_offset,
            config,
        })
    }

    /// Append a record's bytes and return the offset assigned to it.
    pub fn append(&mut self, value: &[u8]) -> Result<u64> {
        if self.store.size() >= self.config.max_store_bytes {
            return Err(Error::StoreFull);
        }

        let cur = self.next_offset;
        let (_, pos) = self.store.append(value)?;
        self.index.write((cur - self.base_offset) as u32, pos)?;
        self.next_offset += 1;
        Ok(cur)
    }

    /// Read the record stored at `offset`.
    pub fn read(&self, offset: u64) -> Result<Record> {
        if !self.contains(offset) {
            return Err(Error::OffsetOutOfRange(offset));
        }
        let (_, pos) = self.index.read((offset - self.base_offset) as i64)?;
        let value = self.store.read(pos)?;
        Ok(Record { offset, value })
    }

    /// Whether `offset` falls inside this segment's assigned range.
    pub fn contains(&self, offset: u64) -> bool {
        self.base_offset <= offset && offset < self.next_offset
    }

    /// True once either the store or the index has no room left under the
    /// configured limits. Checked before every append at the log layer.
    pub fn is_maxed(&self) -> bool {
        self.store.size() >= self.config.max_store_bytes || self.index.is_maxed()
    }

    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    /// Offset the next append will be assigned. Equals `base_offset` while
    /// the segment is empty.
    pub fn next_offset(&self) -> u64 {
        self.next_offset
    }

    /// Close the index (sync + shrink) and flush the store.
    pub fn close(&mut self) -> Result<()> {
        self.index.close()?;
        self.store.close()?;
        Ok(())
    }

    /// Close, then delete both files.
    pub fn remove(&mut self) -> Result<()> {
        self.close()?;
        fs::remove_file(self.index.path())?;
        fs::remove_file(self.store.path())?;
        Ok(())
    }

    /// Sequential cursor over this segment's raw store bytes.
    pub(crate) fn store_reader(&self) -> StoreReader {
        self.store.reader()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ENTRY_WIDTH;
    use crate::store::LEN_WIDTH;
    use tempfile::TempDir;

    const VALUE: &[u8] = b"hello world";

    // ---------------------------------------------------------------
    // Append / read, maxed by index
    // ---------------------------------------------------------------

    #[test]
    fn test_append_read_and_maxed_by_index() {
        let dir = TempDir::new().unwrap();
        let entries = 3u64;
        let config = LogConfig {
            max_store_bytes: 1024,
            max_index_bytes: entries * ENTRY_WIDTH,
            ..Default::default()
        };

        let base_offset = 16u64;
        let mut segment = Segment::open(dir.path(), base_offset, config).expect("open");
        assert_eq!(segment.next_offset(), base_offset);
        assert!(!segment.is_maxed());

        for i in 0..entries {
            let off = segment.append(VALUE).expect("append");
            assert_eq!(off, base_offset + i);

            let record = segment.read(off).expect("read");
            assert_eq!(&record.value[..], VALUE);
            assert_eq!(record.offset, off);
        }

        // Index is full now.
        assert!(segment.is_maxed());
        assert!(matches!(segment.append(VALUE), Err(Error::IndexFull)));
        segment.close().expect("close");
    }

    // ---------------------------------------------------------------
    // Maxed by store, recovery of next_offset on reopen
    // ---------------------------------------------------------------

    #[test]
    fn test_reopen_maxed_by_store() {
        let dir = TempDir::new().unwrap();
        let entries = 3u64;
        let frame = VALUE.len() as u64 + LEN_WIDTH;

        let config = LogConfig {
            max_store_bytes: 1024,
            max_index_bytes: 1024,
            ..Default::default()
        };
        let base_offset = 16u64;
        let mut segment = Segment::open(dir.path(), base_offset, config).expect("open");
        for _ in 0..entries {
            segment.append(VALUE).expect("append");
        }
        segment.close().expect("close");

        // Reopen with a store limit the existing frames already meet.
        let config = LogConfig {
            max_store_bytes: entries * frame,
            max_index_bytes: 1024,
            ..Default::default()
        };
        let mut segment = Segment::open(dir.path(), base_offset, config).expect("reopen");
        assert_eq!(segment.next_offset(), base_offset + entries);
        assert!(segment.is_maxed());
        assert!(matches!(segment.append(VALUE), Err(Error::StoreFull)));

        segment.remove().expect("remove");
        assert!(!dir.path().join("16.store").exists());
        assert!(!dir.path().join("16.index").exists());
    }

    #[test]
    fn test_open_empty_after_remove() {
        let dir = TempDir::new().unwrap();
        let config = LogConfig::default();

        let mut segment = Segment::open(dir.path(), 16, config.clone()).expect("open");
        segment.append(VALUE).expect("append");
        segment.remove().expect("remove");

        let segment = Segment::open(dir.path(), 16, config).expect("open fresh");
        assert_eq!(segment.next_offset(), 16);
        assert!(!segment.is_maxed());
    }

    // ---------------------------------------------------------------
    // Bounds
    // ---------------------------------------------------------------

    #[test]
    fn test_read_below_base_offset() {
        let dir = TempDir::new().unwrap();
        let mut segment = Segment::open(dir.path(), 16, LogConfig::default()).expect("open");
        segment.append(VALUE).expect("append");
        assert!(matches!(
            segment.read(15),
            Err(Error::OffsetOutOfRange(15))
        ));
    }

    #[test]
    fn test_read_at_next_offset() {
        let dir = TempDir::new().unwrap();
        let mut segment = Segment::open(dir.path(), 0, LogConfig::default()).expect("open");
        segment.append(VALUE).expect("append");
        assert!(matches!(segment.read(1), Err(Error::OffsetOutOfRange(1))));
    }
}
