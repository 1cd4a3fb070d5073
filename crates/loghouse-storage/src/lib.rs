//! Loghouse Storage Engine
//!
//! This crate implements the storage engine for Loghouse - an append-only,
//! segmented, offset-addressed commit log on local disk. Producers append
//! opaque byte records and receive a monotonically increasing u64 offset;
//! consumers read records back by offset or stream the raw log bytes
//! sequentially. The log survives restarts by scanning its directory and
//! reconstructing segments from the files found there.
//!
//! ## Architecture Overview
//!
//! Four components compose bottom-up:
//!
//! ```text
//! ┌──────────────────────────── Log ────────────────────────────┐
//! │  ordering, offset routing, rollover, truncation, locking    │
//! │  ┌────────────── Segment ──────────────┐                    │
//! │  │  base offset, next offset, limits   │  × N               │
//! │  │  ┌─────────┐       ┌─────────────┐  │                    │
//! │  │  │  Store  │       │    Index    │  │                    │
//! │  │  │ frames  │◄──pos─│ mmap, 12B   │  │                    │
//! │  │  └─────────┘       │ entries     │  │                    │
//! │  │                    └─────────────┘  │                    │
//! │  └─────────────────────────────────────┘                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **Store**: append-only byte file of `[u64 BE len][payload]` frames
//!   behind a write buffer
//! - **Index**: memory-mapped file of fixed-width entries mapping a
//!   record's segment-relative offset to its frame position in the store
//! - **Segment**: one store/index pair sharing a base offset; reports when
//!   either file hits its configured limit
//! - **Log**: ordered segments behind one readers-writer lock; appends go
//!   to the active segment, reads to whichever segment covers the offset
//!
//! ## Usage Example
//!
//! ```ignore
//! use loghouse_storage::{Log, LogConfig};
//!
//! let log = Log::open("/var/lib/loghouse/orders", LogConfig::default())?;
//!
//! let offset = log.append(b"hello world")?;
//! let record = log.read(offset)?;
//! assert_eq!(&record.value[..], b"hello world");
//! ```
//!
//! ## What this crate does not do
//!
//! No replication, no compaction, no key-based lookup, no encryption, no
//! per-record checksums. The RPC surface and transport security live in
//! collaborating crates that consume `Log` through its public operations.

pub mod config;
pub mod error;
pub mod index;
pub mod log;
pub mod reader;
pub mod segment;
pub mod store;

pub use config::LogConfig;
pub use error::{Error, Result};
pub use index::Index;
pub use log::Log;
pub use reader::LogReader;
pub use segment::Segment;
pub use store::{Store, StoreReader};
