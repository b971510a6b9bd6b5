//! Registry file caches.
//!
//! A cache stores raw registry file bytes under their filename and tracks
//! how fresh each file is. Two implementations:
//!
//! - [`MemoryCache`]: private to one client, gone when the process exits.
//! - [`DiskCache`]: a directory of files, shareable between processes.
//!
//! Freshness is a four-state machine (see [`FileState`]). A file older than
//! the cache timeout is [`FileState::Expired`] and has to be downloaded
//! again. A disk cache can also see a file that another process wrote after
//! this instance last loaded it: that is [`FileState::ShouldReload`], and it
//! only needs re-reading from disk.

pub mod disk;
pub mod memory;

pub use disk::DiskCache;
pub use memory::MemoryCache;

use crate::error::BootstrapError;
use std::fmt;
use std::time::Duration;

/// Default freshness window for cached registry files.
pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Freshness of one cached file, as seen by one cache instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    /// Nothing cached under this filename.
    Absent,

    /// Cached, within the timeout, and this instance has loaded the current
    /// version.
    Good,

    /// Cached and within the timeout, but written since this instance last
    /// loaded it.
    ShouldReload,

    /// Cached, but older than the timeout.
    Expired,
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FileState::Absent => "absent",
            FileState::Good => "good",
            FileState::ShouldReload => "should-reload",
            FileState::Expired => "expired",
        };
        write!(f, "{}", s)
    }
}

/// Storage for registry files.
///
/// Methods take `&mut self` because loading and saving update this
/// instance's record of which file versions it has seen.
pub trait RegistryCache: Send + Sync {
    /// Read a cached file.
    ///
    /// # Errors
    ///
    /// [`BootstrapError::Cache`] if the file is not cached or can't be read.
    fn load(&mut self, filename: &str) -> Result<Vec<u8>, BootstrapError>;

    /// Store `data` under `filename`, replacing any previous version whole.
    fn save(&mut self, filename: &str, data: &[u8]) -> Result<(), BootstrapError>;

    /// Freshness of `filename`. Errors reading the cache report
    /// [`FileState::Absent`].
    fn state(&self, filename: &str) -> FileState;

    /// Set the freshness window.
    fn set_timeout(&mut self, timeout: Duration);

    fn timeout(&self) -> Duration;
}

/// `Expired` once `age` reaches `timeout`, so a zero timeout is always
/// expired.
pub(crate) fn is_expired(age: Duration, timeout: Duration) -> bool {
    age >= timeout
}
