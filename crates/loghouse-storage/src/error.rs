//! Storage Error Types
//!
//! This module defines all error types that can occur during storage operations.
//!
//! ## Error Categories
//!
//! ### Caller-visible errors
//! - `OffsetOutOfRange`: a read targeted an offset no segment covers; carries
//!   the offending offset so an outer layer can translate it into a
//!   user-visible status
//! - `Io`: an underlying file or mmap syscall failed
//! - `Config`: invalid configuration, surfaced at open
//!
//! ### Internal capacity errors
//! - `IndexFull` / `StoreFull`: the active segment cannot take another entry.
//!   `Log::append` recovers from these by rolling over to a new segment, so
//!   they never escape the log layer.
//! - `EndOfIndex`: a read past the last written index entry; used by the
//!   segment layer to detect an empty index at open
//!
//! ## Usage
//!
//! All storage operations return `Result<T>` which is aliased to
//! `Result<T, Error>`. This allows clean error propagation with `?`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("offset out of range: {0}")]
    OffsetOutOfRange(u64),

    #[error("index has no room for another entry")]
    IndexFull,

    #[error("store has no room for another record")]
    StoreFull,

    #[error("read past the end of the index")]
    EndOfIndex,

    #[error("invalid config: {0}")]
    Config(String),
}
