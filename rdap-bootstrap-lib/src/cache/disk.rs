//! Registry cache backed by a directory.
//!
//! Several processes may share one directory. Each [`DiskCache`] remembers
//! the modification time of every file as it last loaded or saved it; a
//! newer time on disk means another process wrote the file since, and the
//! state is [`FileState::ShouldReload`]. Files are replaced whole by
//! renaming a fully written temporary file over them, so a reader never sees
//! a partial write. No locks are taken: two processes refreshing at the same
//! time both write, and the last rename wins.
//!
//! Freshness relies on filesystem modification times, which may be as
//! coarse as one second. Two saves within the same tick are not told apart.

use super::{is_expired, FileState, RegistryCache, DEFAULT_CACHE_TIMEOUT};
use crate::error::BootstrapError;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::NamedTempFile;
use tracing::debug;

/// Default cache directory name, under the user's home directory.
pub const DEFAULT_CACHE_DIR_NAME: &str = ".rdap-bootstrap";

/// A registry cache stored in a directory.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
    timeout: Duration,

    /// Modification time of each file as of this instance's last load/save.
    last_loaded: HashMap<String, SystemTime>,
}

impl DiskCache {
    /// A cache in `$HOME/.rdap-bootstrap`.
    ///
    /// # Errors
    ///
    /// [`BootstrapError::Config`] if the home directory can't be determined.
    pub fn new() -> Result<Self, BootstrapError> {
        Ok(Self::with_dir(default_cache_dir()?))
    }

    /// A cache in `dir`. The directory is created on first save.
    pub fn with_dir<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            dir: dir.into(),
            timeout: DEFAULT_CACHE_TIMEOUT,
            last_loaded: HashMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the cache directory if it doesn't exist.
    pub fn init_dir(&self) -> Result<(), BootstrapError> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            BootstrapError::cache(
                self.dir.to_string_lossy(),
                format!("Failed to create cache directory: {}", e),
            )
        })
    }

    fn path(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    fn modified(&self, filename: &str) -> io::Result<SystemTime> {
        fs::metadata(self.path(filename))?.modified()
    }
}

/// `$HOME/.rdap-bootstrap`.
pub fn default_cache_dir() -> Result<PathBuf, BootstrapError> {
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_CACHE_DIR_NAME))
        .ok_or_else(|| BootstrapError::config("Unable to determine home directory for the cache"))
}

impl RegistryCache for DiskCache {
    fn load(&mut self, filename: &str) -> Result<Vec<u8>, BootstrapError> {
        let err = |e: io::Error| {
            if e.kind() == io::ErrorKind::NotFound {
                BootstrapError::cache(filename, "not found in cache")
            } else {
                BootstrapError::cache(filename, format!("Failed to read cached file: {}", e))
            }
        };

        // Taken before reading, so a concurrent replace is seen as newer.
        let modified = self.modified(filename).map_err(err)?;
        let data = fs::read(self.path(filename)).map_err(err)?;

        self.last_loaded.insert(filename.to_string(), modified);
        debug!(file = %filename, dir = %self.dir.display(), bytes = data.len(), "Loaded cached registry file");

        Ok(data)
    }

    fn save(&mut self, filename: &str, data: &[u8]) -> Result<(), BootstrapError> {
        self.init_dir()?;

        let write_err =
            |e: io::Error| BootstrapError::cache(filename, format!("Failed to write cache file: {}", e));

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(write_err)?;
        tmp.write_all(data).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(self.path(filename))
            .map_err(|e| write_err(e.error))?;

        let modified = self.modified(filename).map_err(write_err)?;
        self.last_loaded.insert(filename.to_string(), modified);
        debug!(file = %filename, dir = %self.dir.display(), bytes = data.len(), "Saved registry file to cache");

        Ok(())
    }

    fn state(&self, filename: &str) -> FileState {
        let Ok(modified) = self.modified(filename) else {
            return FileState::Absent;
        };

        // A modification time in the future counts as just written.
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);

        if is_expired(age, self.timeout) {
            return FileState::Expired;
        }

        match self.last_loaded.get(filename) {
            Some(seen) if *seen >= modified => FileState::Good,
            _ => FileState::ShouldReload,
        }
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_creates_directory() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("nested").join("cache");

        let mut cache = DiskCache::with_dir(&dir);
        assert_eq!(cache.state("asn.json"), FileState::Absent);

        cache.save("asn.json", b"{}").unwrap();
        assert!(dir.join("asn.json").is_file());
        assert_eq!(cache.state("asn.json"), FileState::Good);
        assert_eq!(cache.load("asn.json").unwrap(), b"{}");
    }

    #[test]
    fn test_load_missing() {
        let tmp = TempDir::new().unwrap();
        let mut cache = DiskCache::with_dir(tmp.path());

        let err = cache.load("dns.json").unwrap_err();
        assert!(err.to_string().contains("not found in cache"));
    }

    #[test]
    fn test_shared_directory_coherency() {
        let tmp = TempDir::new().unwrap();

        let mut a = DiskCache::with_dir(tmp.path());
        let mut b = DiskCache::with_dir(tmp.path());

        a.save("asn.json", b"first").unwrap();
        assert_eq!(a.state("asn.json"), FileState::Good);
        assert_eq!(b.state("asn.json"), FileState::ShouldReload);

        assert_eq!(b.load("asn.json").unwrap(), b"first");
        assert_eq!(b.state("asn.json"), FileState::Good);

        a.set_timeout(Duration::ZERO);
        b.set_timeout(Duration::ZERO);
        assert_eq!(a.state("asn.json"), FileState::Expired);
        assert_eq!(b.state("asn.json"), FileState::Expired);
    }

    #[test]
    fn test_newer_file_needs_reload() {
        let tmp = TempDir::new().unwrap();

        let mut a = DiskCache::with_dir(tmp.path());
        let mut b = DiskCache::with_dir(tmp.path());

        a.save("dns.json", b"v1").unwrap();
        b.load("dns.json").unwrap();

        // Make the second version unambiguously newer than the first.
        a.save("dns.json", b"v2").unwrap();
        let file = fs::File::options()
            .write(true)
            .open(tmp.path().join("dns.json"))
            .unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(5))
            .unwrap();

        assert_eq!(b.state("dns.json"), FileState::ShouldReload);
        assert_eq!(b.load("dns.json").unwrap(), b"v2");
        assert_eq!(b.state("dns.json"), FileState::Good);
    }

    #[test]
    fn test_old_file_is_expired() {
        let tmp = TempDir::new().unwrap();
        let mut cache = DiskCache::with_dir(tmp.path());
        cache.set_timeout(Duration::from_secs(60));

        cache.save("ipv6.json", b"{}").unwrap();
        let file = fs::File::options()
            .write(true)
            .open(tmp.path().join("ipv6.json"))
            .unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(120))
            .unwrap();

        assert_eq!(cache.state("ipv6.json"), FileState::Expired);
    }

    #[test]
    fn test_save_replaces_whole_file() {
        let tmp = TempDir::new().unwrap();
        let mut cache = DiskCache::with_dir(tmp.path());

        cache.save("ipv4.json", b"a much longer first version").unwrap();
        cache.save("ipv4.json", b"short").unwrap();
        assert_eq!(cache.load("ipv4.json").unwrap(), b"short");

        // Only the cache file is left behind, no temporaries.
        let names: Vec<_> = fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn test_default_dir() {
        if let Ok(dir) = default_cache_dir() {
            assert!(dir.ends_with(DEFAULT_CACHE_DIR_NAME));
        }
    }
}
