//! Append-Only Store File
//!
//! The store is the file that holds the actual record bytes. Records are
//! written as length-prefixed frames:
//!
//! ```text
//! ┌──────────────────┬─────────────────┐
//! │ length (u64 BE)  │ payload bytes   │
//! └──────────────────┴─────────────────┘
//! ```
//!
//! Appends go through a `BufWriter`, so a frame may sit in the process
//! buffer until a read, a close, or the buffer itself flushes it. Every
//! read flushes the buffer first, which gives read-your-writes within the
//! process without paying a syscall per append.
//!
//! The frame layout has no checksum column; a CRC could be added in front
//! of the payload without disturbing position arithmetic kept elsewhere,
//! since positions always point at the start of a frame.
//!
//! ## Thread Safety
//!
//! A single mutex guards the buffer and the file handle. Appends, reads,
//! and raw positional reads all serialize on it.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use crate::error::Result;

/// Width of the big-endian length prefix in front of every frame.
pub(crate) const LEN_WIDTH: u64 = 8;

/// Append-only byte file with length-prefixed frames and buffered writes.
pub struct Store {
    path: PathBuf,
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    buf: BufWriter<File>,
    size: u64,
}

impl Store {
    /// Open or create the store file at `path` in append mode.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .create(true)
            .append(true)
            .open(&path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            path,
            inner: Arc::new(Mutex::new(Inner {
                buf: BufWriter::new(file),
                size,
            })),
        })
    }

    /// Append a frame holding `p`. Returns the total bytes written
    /// (payload plus length prefix) and the position the frame begins at.
    pub fn append(&self, p: &[u8]) -> Result<(u64, u64)> {
        let mut inner = self.inner.lock().unwrap();
        let pos = inner.size;
        inner.buf.write_all(&(p.len() as u64).to_be_bytes())?;
        inner.buf.write_all(p)?;
        let written = p.len() as u64 + LEN_WIDTH;
        inner.size += written;
        Ok((written, pos))
    }

    /// Read back the frame that begins at `pos`.
    pub fn read(&self, pos: u64) -> Result<Bytes> {
        let mut inner = self.inner.lock().unwrap();
        inner.buf.flush()?;

        let file = inner.buf.get_ref();
        let mut len_buf = [0u8; LEN_WIDTH as usize];
        file.read_exact_at(&mut len_buf, pos)?;

        let mut payload = vec![0u8; u64::from_be_bytes(len_buf) as usize];
        file.read_exact_at(&mut payload, pos + LEN_WIDTH)?;
        Ok(Bytes::from(payload))
    }

    /// Raw positional read into `buf` starting at byte `off`, flushing
    /// buffered writes first. Returns the number of bytes read; zero means
    /// end of file.
    pub fn read_at(&self, buf: &mut [u8], off: u64) -> Result<usize> {
        let mut inner = self.inner.lock().unwrap();
        inner.buf.flush()?;
        Ok(inner.buf.get_ref().read_at(buf, off)?)
    }

    /// Byte length of all flushed and buffered frames.
    pub fn size(&self) -> u64 {
        self.inner.lock().unwrap().size
    }

    /// Flush buffered frames out to the file. Safe to call more than once;
    /// the file handle itself closes when the store is dropped.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.buf.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sequential cursor over the raw store bytes, starting at byte 0.
    pub fn reader(&self) -> StoreReader {
        StoreReader {
            inner: Arc::clone(&self.inner),
            pos: 0,
        }
    }
}

/// Reads a store's raw bytes from the beginning.
///
/// Shares the store's mutex and flushes the write buffer before every read,
/// so frames appended after the cursor was created are still visible.
pub struct StoreReader {
    inner: Arc<Mutex<Inner>>,
    pos: u64,
}

impl Read for StoreReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut inner = self.inner.lock().unwrap();
        inner.buf.flush()?;
        let n = inner.buf.get_ref().read_at(buf, self.pos)?;
        self.pos += n as u64;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const WRITE: &[u8] = b"hello world";
    const WIDTH: u64 = WRITE.len() as u64 + LEN_WIDTH;
    const NUM_RECORDS: u64 = 3;

    fn append_records(store: &Store) {
        for i in 1..=NUM_RECORDS {
            let (written, pos) = store.append(WRITE).expect("append");
            assert_eq!(pos + written, WIDTH * i);
        }
    }

    fn read_records(store: &Store) {
        let mut pos = 0;
        for _ in 0..NUM_RECORDS {
            let read = store.read(pos).expect("read");
            assert_eq!(&read[..], WRITE);
            pos += WIDTH;
        }
    }

    // ---------------------------------------------------------------
    // Append / read round-trip
    // ---------------------------------------------------------------

    #[test]
    fn test_append_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("append_read.store");

        let store = Store::open(&path).expect("open");
        append_records(&store);
        read_records(&store);

        // Reopening the same file must see the same frames.
        let store = Store::open(&path).expect("reopen");
        assert_eq!(store.size(), WIDTH * NUM_RECORDS);
        read_records(&store);
    }

    #[test]
    fn test_read_at_walks_frames() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path().join("read_at.store")).expect("open");
        append_records(&store);

        let mut off = 0u64;
        for _ in 0..NUM_RECORDS {
            let mut len_buf = [0u8; LEN_WIDTH as usize];
            let n = store.read_at(&mut len_buf, off).expect("read_at len");
            assert_eq!(n as u64, LEN_WIDTH);
            off += n as u64;

            let size = u64::from_be_bytes(len_buf);
            let mut payload = vec![0u8; size as usize];
            let n = store.read_at(&mut payload, off).expect("read_at payload");
            assert_eq!(n as u64, size);
            assert_eq!(&payload[..], WRITE);
            off += n as u64;
        }
    }

    #[test]
    fn test_read_past_end_fails() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path().join("eof.store")).expect("open");
        store.append(WRITE).expect("append");
        assert!(store.read(WIDTH * 10).is_err());
    }

    #[test]
    fn test_read_empty_payload() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path().join("empty.store")).expect("open");
        let (written, pos) = store.append(b"").expect("append");
        assert_eq!(written, LEN_WIDTH);
        assert_eq!(store.read(pos).expect("read").len(), 0);
    }

    // ---------------------------------------------------------------
    // Close flushes the buffer
    // ---------------------------------------------------------------

    #[test]
    fn test_close_flushes_buffer() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("close.store");

        let store = Store::open(&path).expect("open");
        store.append(WRITE).expect("append");

        let before = std::fs::metadata(&path).unwrap().len();
        store.close().expect("close");
        let after = std::fs::metadata(&path).unwrap().len();
        assert!(after > before);
        assert_eq!(after, WIDTH);
    }

    #[test]
    fn test_close_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path().join("close_twice.store")).expect("open");
        store.append(WRITE).expect("append");
        store.close().expect("close");
        store.close().expect("close again");
    }

    // ---------------------------------------------------------------
    // Streaming reader
    // ---------------------------------------------------------------

    #[test]
    fn test_reader_streams_raw_frames() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path().join("stream.store")).expect("open");
        append_records(&store);

        let mut all = Vec::new();
        store.reader().read_to_end(&mut all).expect("read_to_end");
        assert_eq!(all.len() as u64, WIDTH * NUM_RECORDS);

        let len = u64::from_be_bytes(all[..8].try_into().unwrap());
        assert_eq!(len, WRITE.len() as u64);
        assert_eq!(&all[8..8 + WRITE.len()], WRITE);
    }

    #[test]
    fn test_reader_sees_appends_after_creation() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path().join("late.store")).expect("open");

        let mut reader = store.reader();
        store.append(WRITE).expect("append");

        let mut all = Vec::new();
        reader.read_to_end(&mut all).expect("read_to_end");
        assert_eq!(all.len() as u64, WIDTH);
    }
}
