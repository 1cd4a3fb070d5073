//! The Log
//!
//! The log is an ordered collection of segments behind a single
//! readers-writer lock. It owns:
//!
//! - **Routing**: appends always go to the active (newest) segment; reads
//!   go to whichever segment covers the requested offset
//! - **Rollover**: when the active segment fills up, a new segment is
//!   created at the next offset and becomes active
//! - **Lifecycle**: directory scan on open, close/remove/reset, and
//!   truncation of old segments to reclaim disk space
//!
//! ```text
//! ┌─────────────────────────── Log ───────────────────────────┐
//! │  segments: [0.store/0.index] [3.store/3.index] [7.…] ...  │
//! │                                              ▲            │
//! │                                            active         │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//!
//! `append`, `truncate`, `close`, `remove`, and `reset` take the lock
//! exclusively; `read`, `reader`, `lowest_offset`, and `highest_offset`
//! take it shared. Each store additionally carries its own mutex, which
//! serializes raw reads against in-flight buffer flushes.
//!
//! ## Durability
//!
//! Appends are buffered; the engine syncs nothing per append. Durability
//! comes from `close` (store flush, index msync + fsync). After a crash the
//! index decides which records exist - store bytes past the last indexed
//! frame are invisible on reopen.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use loghouse_core::Record;

use crate::config::LogConfig;
use crate::error::{Error, Result};
use crate::reader::LogReader;
use crate::segment::Segment;

/// Append-only, segmented, offset-addressed commit log on local disk.
pub struct Log {
    dir: PathBuf,
    config: LogConfig,
    inner: RwLock<Inner>,
}

struct Inner {
    /// Sorted ascending by base offset; the last element is the active
    /// segment, the only one appends may go to.
    segments: Vec<Segment>,
}

impl Inner {
    fn active(&self) -> &Segment {
        self.segments
            .last()
            .expect("log always holds at least one segment")
    }

    fn active_mut(&mut self) -> &mut Segment {
        self.segments
            .last_mut()
            .expect("log always holds at least one segment")
    }

    fn highest_offset(&self) -> u64 {
        self.active().next_offset().saturating_sub(1)
    }
}

impl Log {
    /// Open the log in `dir`, creating the directory if needed and
    /// reconstructing segments from the files found there.
    pub fn open(dir: impl AsRef<Path>, config: LogConfig) -> Result<Self> {
        let config = config.normalize();
        config.validate()?;

        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let segments = Self::setup(&dir, &config)?;

        Ok(Self {
            dir,
            config,
            inner: RwLock::new(Inner { segments }),
        })
    }

    /// Scan the directory and open one segment per base offset found.
    /// Creates a segment at `initial_offset` when the directory holds none.
    fn setup(dir: &Path, config: &LogConfig) -> Result<Vec<Segment>> {
        let mut base_offsets = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if !matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("store") | Some("index")
            ) {
                tracing::warn!(path = %path.display(), "ignoring unrecognized file in log directory");
                continue;
            }
            match path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<u64>().ok())
            {
                Some(base) => base_offsets.push(base),
                None => {
                    tracing::warn!(path = %path.display(), "ignoring segment file with unparseable base offset");
                }
            }
        }

        // Paired {base}.store / {base}.index files yield each base twice.
        base_offsets.sort_unstable();
        base_offsets.dedup();

        let mut segments = Vec::with_capacity(base_offsets.len().max(1));
        for base in base_offsets {
            segments.push(Segment::open(dir, base, config.clone())?);
        }
        if segments.is_empty() {
            segments.push(Segment::open(dir, config.initial_offset, config.clone())?);
        }

        tracing::debug!(
            dir = %dir.display(),
            segments = segments.len(),
            lowest = segments[0].base_offset(),
            "log opened"
        );
        Ok(segments)
    }

    /// Append a record's bytes and return the offset assigned to it.
    ///
    /// Capacity conditions roll the log over to a fresh segment; they never
    /// reach the caller.
    pub fn append(&self, value: &[u8]) -> Result<u64> {
        let mut inner = self.inner.write().unwrap();

        if inner.active().is_maxed() {
            self.roll(&mut inner)?;
        }

        match inner.active_mut().append(value) {
            Err(Error::IndexFull) | Err(Error::StoreFull) => {
                self.roll(&mut inner)?;
                inner.active_mut().append(value)
            }
            result => result,
        }
    }

    /// Create a new active segment starting where the current one ends.
    fn roll(&self, inner: &mut Inner) -> Result<()> {
        let base = inner.active().next_offset();
        tracing::debug!(
            old_base = inner.active().base_offset(),
            new_base = base,
            "rolling over to a new segment"
        );
        let segment = Segment::open(&self.dir, base, self.config.clone())?;
        inner.segments.push(segment);
        Ok(())
    }

    /// Read the record stored at `offset`.
    pub fn read(&self, offset: u64) -> Result<Record> {
        let inner = self.inner.read().unwrap();

        // Segments are sorted by base offset, so the only candidate is the
        // last one whose base offset is <= the requested offset.
        let idx = inner
            .segments
            .partition_point(|s| s.base_offset() <= offset);
        let segment = idx
            .checked_sub(1)
            .map(|i| &inner.segments[i])
            .filter(|s| s.contains(offset))
            .ok_or(Error::OffsetOutOfRange(offset))?;
        segment.read(offset)
    }

    /// Base offset of the oldest segment.
    pub fn lowest_offset(&self) -> u64 {
        let inner = self.inner.read().unwrap();
        inner.segments[0].base_offset()
    }

    /// Offset of the newest record, or 0 when the log has never held one.
    pub fn highest_offset(&self) -> u64 {
        let inner = self.inner.read().unwrap();
        inner.highest_offset()
    }

    /// Close every segment: flush stores, sync and shrink indexes.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        for segment in &mut inner.segments {
            segment.close()?;
        }
        Ok(())
    }

    /// Close the log and delete its directory tree.
    pub fn remove(&self) -> Result<()> {
        self.close()?;
        fs::remove_dir_all(&self.dir)?;
        Ok(())
    }

    /// Remove the log, then set it up again from an empty directory.
    pub fn reset(&self) -> Result<()> {
        self.remove()?;
        fs::create_dir_all(&self.dir)?;
        let mut inner = self.inner.write().unwrap();
        inner.segments = Self::setup(&self.dir, &self.config)?;
        Ok(())
    }

    /// Remove every segment whose records all lie at or below `lowest`,
    /// freeing their disk space. A segment survives if it holds any record
    /// above `lowest`.
    pub fn truncate(&self, lowest: u64) -> Result<()> {
        let mut inner = self.inner.write().unwrap();

        let mut retained = Vec::with_capacity(inner.segments.len());
        let mut removed = 0usize;
        for mut segment in inner.segments.drain(..) {
            if segment.next_offset() <= lowest + 1 {
                segment.remove()?;
                removed += 1;
            } else {
                retained.push(segment);
            }
        }

        // Truncating everything still leaves the log writable: continue at
        // the first offset past the truncation point.
        if retained.is_empty() {
            retained.push(Segment::open(&self.dir, lowest + 1, self.config.clone())?);
        }
        inner.segments = retained;

        if removed > 0 {
            tracing::debug!(lowest, removed, "truncated log");
        }
        Ok(())
    }

    /// Sequential cursor over the raw store bytes of every segment, oldest
    /// first. The stream is a concatenation of length-prefixed frames;
    /// segment boundaries always fall on frame boundaries.
    pub fn reader(&self) -> LogReader {
        let inner = self.inner.read().unwrap();
        LogReader::new(inner.segments.iter().map(|s| s.store_reader()).collect())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
