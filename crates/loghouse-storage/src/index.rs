//! Memory-Mapped Offset Index
//!
//! The index maps a record's offset to the byte position of its frame in
//! the companion store file. Entries are fixed width so a lookup is plain
//! pointer arithmetic on the map - no parsing, no syscalls:
//!
//! ```text
//! ┌────────────────────┬──────────────────┐
//! │ rel_off (u32 BE)   │ pos (u64 BE)     │   12 bytes per entry
//! └────────────────────┴──────────────────┘
//! ```
//!
//! `rel_off` is the record's offset minus the segment's base offset, which
//! keeps entries at 4 bytes instead of 8 while segment sizes stay bounded.
//!
//! ## File sizing
//!
//! A memory map's length is fixed at map time, so the file is grown to
//! `max_index_bytes` before mapping and shrunk back to the written size on
//! close. The shrink matters: the next open derives the entry count from
//! the file length, and a file left at full allocation would read as a full
//! index of zero entries.
//!
//! ## Thread Safety
//!
//! None needed here. Writes only come from the active segment under the
//! log's exclusive lock; reads run under the log's shared lock and only
//! touch entries that were fully written before the lock was taken.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use memmap2::MmapMut;

use crate::config::LogConfig;
use crate::error::{Error, Result};

/// Width of the relative-offset column.
pub(crate) const OFF_WIDTH: u64 = 4;
/// Width of the position column.
pub(crate) const POS_WIDTH: u64 = 8;
/// Width of one index entry.
pub(crate) const ENTRY_WIDTH: u64 = OFF_WIDTH + POS_WIDTH;

/// Memory-mapped, fixed-width map from relative offset to store position.
pub struct Index {
    file: File,
    path: PathBuf,
    mmap: MmapMut,
    size: u64,
    closed: bool,
}

impl Index {
    /// Open or create the index file at `path`, grow it to
    /// `config.max_index_bytes`, and map it read-write shared.
    pub fn open(path: impl AsRef<Path>, config: &LogConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;
        let size = file.metadata()?.len();
        file.set_len(config.max_index_bytes)?;

        // SAFETY: the file stays open for the lifetime of the map, and the
        // log directory is exclusive to this process while the log is open.
        let mmap = unsafe { MmapMut::map_mut(&file)? };

        Ok(Self {
            file,
            path,
            mmap,
            size,
            closed: false,
        })
    }

    /// Read the entry at index `rel`, or the last written entry when
    /// `rel == -1`. Returns the stored relative offset and store position.
    pub fn read(&self, rel: i64) -> Result<(u32, u64)> {
        if self.size == 0 {
            return Err(Error::EndOfIndex);
        }

        let entry = if rel == -1 {
            (self.size / ENTRY_WIDTH - 1) as u32
        } else {
            rel as u32
        };
        let pos = entry as u64 * ENTRY_WIDTH;
        if self.size < pos + ENTRY_WIDTH {
            return Err(Error::EndOfIndex);
        }

        let pos = pos as usize;
        let off_width = OFF_WIDTH as usize;
        let entry_width = ENTRY_WIDTH as usize;
        let rel_off = u32::from_be_bytes(self.mmap[pos..pos + off_width].try_into().unwrap());
        let store_pos =
            u64::from_be_bytes(self.mmap[pos + off_width..pos + entry_width].try_into().unwrap());
        Ok((rel_off, store_pos))
    }

    /// Write an entry at the current logical end of the index.
    pub fn write(&mut self, rel_off: u32, pos: u64) -> Result<()> {
        if self.is_maxed() {
            return Err(Error::IndexFull);
        }

        let at = self.size as usize;
        let off_width = OFF_WIDTH as usize;
        let entry_width = ENTRY_WIDTH as usize;
        self.mmap[at..at + off_width].copy_from_slice(&rel_off.to_be_bytes());
        self.mmap[at + off_width..at + entry_width].copy_from_slice(&pos.to_be_bytes());
        self.size += ENTRY_WIDTH;
        Ok(())
    }

    /// Whether the map has no room left for another entry.
    pub fn is_maxed(&self) -> bool {
        (self.mmap.len() as u64) < self.size + ENTRY_WIDTH
    }

    /// Bytes of valid entries written so far. Always a multiple of the
    /// entry width.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sync the map and the file, then shrink the file back down to the
    /// written size so the next open recovers the entry count from the
    /// file length. Safe to call more than once.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.mmap.flush()?;
        self.file.sync_all()?;
        self.file.set_len(self.size)?;
        self.closed = true;
        Ok(())
    }
}
