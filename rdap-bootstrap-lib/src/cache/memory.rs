//! In-process registry cache.

use super::{is_expired, FileState, RegistryCache, DEFAULT_CACHE_TIMEOUT};
use crate::error::BootstrapError;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Entry {
    data: Vec<u8>,
    saved_at: Instant,
}

/// A cache private to one client.
///
/// Nothing else can write to it, so a file is never
/// [`FileState::ShouldReload`]: it is absent, good or expired.
#[derive(Debug, Clone)]
pub struct MemoryCache {
    entries: HashMap<String, Entry>,
    timeout: Duration,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            timeout: DEFAULT_CACHE_TIMEOUT,
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryCache for MemoryCache {
    fn load(&mut self, filename: &str) -> Result<Vec<u8>, BootstrapError> {
        self.entries
            .get(filename)
            .map(|e| e.data.clone())
            .ok_or_else(|| BootstrapError::cache(filename, "not found in cache"))
    }

    fn save(&mut self, filename: &str, data: &[u8]) -> Result<(), BootstrapError> {
        self.entries.insert(
            filename.to_string(),
            Entry {
                data: data.to_vec(),
                saved_at: Instant::now(),
            },
        );
        Ok(())
    }

    fn state(&self, filename: &str) -> FileState {
        match self.entries.get(filename) {
            None => FileState::Absent,
            Some(e) if is_expired(e.saved_at.elapsed(), self.timeout) => FileState::Expired,
            Some(_) => FileState::Good,
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

    #[test]
    fn test_save_and_load() {
        let mut cache = MemoryCache::new();
        assert_eq!(cache.state("dns.json"), FileState::Absent);
        assert!(cache.load("dns.json").is_err());

        cache.save("dns.json", b"{}").unwrap();
        assert_eq!(cache.state("dns.json"), FileState::Good);
        assert_eq!(cache.load("dns.json").unwrap(), b"{}");

        cache.save("dns.json", b"{\"services\": []}").unwrap();
        assert_eq!(cache.load("dns.json").unwrap(), b"{\"services\": []}");
        assert_eq!(cache.state("asn.json"), FileState::Absent);
    }

    #[test]
    fn test_loaded_data_is_a_copy() {
        let mut cache = MemoryCache::new();
        cache.save("asn.json", b"abc").unwrap();

        let mut data = cache.load("asn.json").unwrap();
        data[0] = b'x';
        assert_eq!(cache.load("asn.json").unwrap(), b"abc");
    }

    #[test]
    fn test_timeout() {
        let mut cache = MemoryCache::new();
        assert_eq!(cache.timeout(), DEFAULT_CACHE_TIMEOUT);

        cache.save("ipv4.json", b"{}").unwrap();
        cache.set_timeout(Duration::ZERO);
        assert_eq!(cache.state("ipv4.json"), FileState::Expired);

        // Expired data stays loadable.
        assert!(cache.load("ipv4.json").is_ok());

        cache.set_timeout(Duration::from_secs(60));
        assert_eq!(cache.state("ipv4.json"), FileState::Good);
    }
}
