//! Log Configuration
//!
//! Controls how segments are sized and where a fresh log starts:
//!
//! - **max_store_bytes**: store file upper bound; once reached, the active
//!   segment rolls over (default: 1024)
//! - **max_index_bytes**: index file upper bound; fixes the size of the
//!   index memory map (default: 1024)
//! - **initial_offset**: base offset for a log opened on an empty directory
//!   (default: 0)
//!
//! Zero values mean "use the default", so a `LogConfig` deserialized from a
//! partial document and one built with `..Default::default()` behave the
//! same way.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::index::ENTRY_WIDTH;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Maximum store file size in bytes before rolling over
    #[serde(default = "default_max_store_bytes")]
    pub max_store_bytes: u64,

    /// Maximum index file size in bytes; determines the mmap size
    #[serde(default = "default_max_index_bytes")]
    pub max_index_bytes: u64,

    /// Base offset assigned to the first segment of a fresh log
    #[serde(default)]
    pub initial_offset: u64,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            max_store_bytes: default_max_store_bytes(),
            max_index_bytes: default_max_index_bytes(),
            initial_offset: 0,
        }
    }
}

impl LogConfig {
    /// Replace zero-valued limits with their defaults.
    pub(crate) fn normalize(mut self) -> Self {
        if self.max_store_bytes == 0 {
            self.max_store_bytes = default_max_store_bytes();
        }
        if self.max_index_bytes == 0 {
            self.max_index_bytes = default_max_index_bytes();
        }
        self
    }

    /// The index map must fit at least one entry.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.max_index_bytes < ENTRY_WIDTH {
            return Err(Error::Config(format!(
                "max_index_bytes {} is smaller than one index entry ({} bytes)",
                self.max_index_bytes, ENTRY_WIDTH
            )));
        }
        Ok(())
    }
}

fn default_max_store_bytes() -> u64 {
    1024
}

fn default_max_index_bytes() -> u64 {
    1024
}
