//! IPv4 and IPv6 network bootstrapping.
//!
//! Networks are bucketed by prefix length, each bucket sorted by start
//! address. A lookup walks the buckets from the query's own prefix length
//! down to /0 and binary searches each one, so the first hit is the longest
//! matching prefix.

use super::{Registry, RegistryFile};
use crate::error::BootstrapError;
use crate::types::Answer;
use ip_network::IpNetwork;
use std::collections::BTreeMap;
use std::net::IpAddr;
use tracing::debug;
use url::Url;

/// A registered network.
#[derive(Debug, Clone)]
pub struct NetEntry {
    pub network: IpNetwork,
    start: u128,
    end: u128,
    pub urls: Vec<Url>,
}

/// Registry for `ipv4.json` or `ipv6.json`.
#[derive(Debug, Clone)]
pub struct NetRegistry {
    family: u8,
    buckets: BTreeMap<u8, Vec<NetEntry>>,
    file: RegistryFile,
}

impl NetRegistry {
    /// Build a registry for one address family (4 or 6).
    ///
    /// Keys that are not networks of that family are ignored.
    pub fn new(json: &[u8], family: u8) -> Result<Self, BootstrapError> {
        if family != 4 && family != 6 {
            return Err(BootstrapError::config(format!(
                "Unknown IP address family {}",
                family
            )));
        }

        let file = RegistryFile::parse(json)?;
        let mut buckets: BTreeMap<u8, Vec<NetEntry>> = BTreeMap::new();

        for (key, urls) in &file.entries {
            let Ok((addr, prefix_len)) = parse_cidr(key) else {
                debug!(entry = %key, "Skipping unparsable network");
                continue;
            };
            if ip_family(addr) != family {
                continue;
            }
            let Ok(network) = IpNetwork::new_truncate(addr, prefix_len) else {
                continue;
            };

            let (start, end) = bounds(network.network_address(), prefix_len);
            buckets.entry(prefix_len).or_default().push(NetEntry {
                network,
                start,
                end,
                urls: urls.clone(),
            });
        }

        for bucket in buckets.values_mut() {
            bucket.sort_by_key(|e| e.start);
        }

        Ok(Self {
            family,
            buckets,
            file,
        })
    }

    /// The address family this registry serves, 4 or 6.
    pub fn family(&self) -> u8 {
        self.family
    }

}

impl Registry for NetRegistry {
    fn lookup(&self, query: &str) -> Result<Answer, BootstrapError> {
        // A bare address gets its own full-length mask, so a wrong-family
        // address reaches the family check below.
        let input = if query.contains('/') {
            query.to_string()
        } else {
            let addr: IpAddr = query
                .parse()
                .map_err(|_| BootstrapError::invalid_query(query, "invalid IP address"))?;
            format!("{}/{}", query, full_prefix_len(addr))
        };

        let (addr, prefix_len) = parse_cidr(&input)?;
        if ip_family(addr) != self.family {
            return Err(BootstrapError::AddressFamilyMismatch {
                query: query.to_string(),
                expected: self.family,
            });
        }

        let (start, _) = bounds(addr, prefix_len);

        for (len, bucket) in self.buckets.range(..=prefix_len).rev() {
            let index = bucket.partition_point(|e| e.start <= start);
            if index == 0 {
                continue;
            }

            let candidate = &bucket[index - 1];
            if start <= candidate.end {
                debug!(query = %input, entry = %candidate.network, prefix_len = len, "IP bootstrap match");
                return Ok(Answer {
                    query: input,
                    entry: candidate.network.to_string(),
                    urls: candidate.urls.clone(),
                });
            }
        }

        Ok(Answer::no_match(input))
    }

    fn file(&self) -> &RegistryFile {
        &self.file
    }
}

/// Split "address/prefix-length" and check the prefix fits the address.
fn parse_cidr(text: &str) -> Result<(IpAddr, u8), BootstrapError> {
    let invalid = || BootstrapError::invalid_query(text, "invalid CIDR address");

    let (addr, len) = text.split_once('/').ok_or_else(invalid)?;
    let addr: IpAddr = addr.parse().map_err(|_| invalid())?;
    let len: u8 = len.parse().map_err(|_| invalid())?;

    if len > full_prefix_len(addr) {
        return Err(invalid());
    }

    Ok((addr, len))
}

fn full_prefix_len(addr: IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

fn ip_family(addr: IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 4,
        IpAddr::V6(_) => 6,
    }
}

/// First and last address of the network containing `addr`, as integers.
fn bounds(addr: IpAddr, prefix_len: u8) -> (u128, u128) {
    let (value, bits) = match addr {
        IpAddr::V4(a) => (u128::from(u32::from(a)), 32u32),
        IpAddr::V6(a) => (u128::from(a), 128u32),
    };

    let host_bits = bits - u32::from(prefix_len);
    let host_mask = if host_bits == 128 {
        u128::MAX
    } else {
        (1u128 << host_bits) - 1
    };

    let start = value & !host_mask;
    (start, start | host_mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    const IPV4: &[u8] = include_bytes!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/testdata/bootstrap/ipv4.json"
    ));
    const IPV6: &[u8] = include_bytes!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/testdata/bootstrap/ipv6.json"
    ));

    fn check(registry: &NetRegistry, query: &str, entry: &str, url_count: usize) {
        let answer = registry.lookup(query).unwrap();
        assert_eq!(answer.entry, entry, "entry for {query:?}");
        assert_eq!(answer.urls.len(), url_count, "urls for {query:?}");
    }

    #[test]
    fn test_ipv4_lookup() {
        let r = NetRegistry::new(IPV4, 4).unwrap();

        check(&r, "41.0.0.0", "41.0.0.0/8", 2);
        check(&r, "41.255.255.255", "41.0.0.0/8", 2);
        check(&r, "41.0.0.0/8", "41.0.0.0/8", 2);
        check(&r, "41.1.0.0/16", "41.0.0.0/8", 2);
        check(&r, "8.8.8.8", "8.0.0.0/8", 2);
        check(&r, "1.1.1.1", "1.0.0.0/8", 1);
        check(&r, "255.0.0.0", "", 0);
        check(&r, "0.0.0.0/0", "", 0);

        let answer = r.lookup("41.0.0.1").unwrap();
        assert_eq!(answer.query, "41.0.0.1/32");
        assert_eq!(answer.urls[0].as_str(), "https://rdap.afrinic.net/rdap/");
    }

    #[test]
    fn test_ipv6_lookup() {
        let r = NetRegistry::new(IPV6, 6).unwrap();

        check(&r, "2001:1400::", "2001:1400::/23", 1);
        check(&r, "2001:15ff:ffff::1", "2001:1400::/23", 1);
        check(&r, "2001:0800::/22", "2001:800::/22", 1);
        check(&r, "2c0f:f000::/32", "2c00::/12", 2);
        check(&r, "4000::", "", 0);

        let answer = r.lookup("2a00:1450::1").unwrap();
        assert_eq!(answer.query, "2a00:1450::1/128");
        assert_eq!(answer.urls[0].as_str(), "https://rdap.db.ripe.net/");
    }

    #[test]
    fn test_longest_prefix_wins() {
        let json = br#"{"services": [
            [["10.0.0.0/8"], ["https://wide.example/"]],
            [["10.1.0.0/16"], ["https://narrow.example/"]],
            [["10.1.2.0/24"], ["https://narrowest.example/"]]
        ]}"#;
        let r = NetRegistry::new(json, 4).unwrap();

        check(&r, "10.1.2.3", "10.1.2.0/24", 1);
        check(&r, "10.1.3.3", "10.1.0.0/16", 1);
        check(&r, "10.2.0.1", "10.0.0.0/8", 1);
        // A query network is only matched by an equal or wider network.
        check(&r, "10.1.0.0/12", "10.0.0.0/8", 1);
    }

    #[test]
    fn test_malformed_queries() {
        let r = NetRegistry::new(IPV4, 4).unwrap();

        for query in ["41.", "", "41.0.0.0/", "41.0.0.0/33", "foo/8", "1.2.3.4/x"] {
            let err = r.lookup(query).unwrap_err();
            assert!(
                matches!(err, BootstrapError::InvalidQuery { .. }),
                "expected parse error for {query:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn test_address_family_mismatch() {
        let v4 = NetRegistry::new(IPV4, 4).unwrap();
        let v6 = NetRegistry::new(IPV6, 6).unwrap();

        let err = v4.lookup("2001:1400::").unwrap_err();
        assert!(matches!(err, BootstrapError::AddressFamilyMismatch { expected: 4, .. }));

        let err = v6.lookup("41.0.0.1").unwrap_err();
        assert!(matches!(err, BootstrapError::AddressFamilyMismatch { expected: 6, .. }));
    }

    #[test]
    fn test_bare_address_of_other_family() {
        let v4 = NetRegistry::new(IPV4, 4).unwrap();
        let v6 = NetRegistry::new(IPV6, 6).unwrap();

        for query in ["192.0.2.1", "0.0.0.0", "41.0.0.0/8"] {
            let err = v6.lookup(query).unwrap_err();
            assert!(
                matches!(err, BootstrapError::AddressFamilyMismatch { expected: 6, .. }),
                "expected family mismatch for {query:?}, got {err:?}"
            );
        }

        for query in ["::1", "2001:db8::1", "2001:db8::/32"] {
            let err = v4.lookup(query).unwrap_err();
            assert!(
                matches!(err, BootstrapError::AddressFamilyMismatch { expected: 4, .. }),
                "expected family mismatch for {query:?}, got {err:?}"
            );
        }

        // The other family's answers are unaffected.
        assert_eq!(v4.lookup("41.0.0.1").unwrap().query, "41.0.0.1/32");
        assert_eq!(v6.lookup("2a00:1450::1").unwrap().query, "2a00:1450::1/128");
    }

    #[test]
    fn test_other_family_entries_are_ignored() {
        let json = br#"{"services": [
            [["2001:db8::/32", "192.0.2.0/24", "bogus"], ["https://rdap.example/"]]
        ]}"#;
        let r = NetRegistry::new(json, 4).unwrap();

        check(&r, "192.0.2.1", "192.0.2.0/24", 1);
        assert_eq!(r.buckets.values().map(Vec::len).sum::<usize>(), 1);
    }

    #[test]
    fn test_unknown_family() {
        assert!(NetRegistry::new(IPV4, 5).is_err());
    }

    #[test]
    fn test_bounds() {
        let addr: IpAddr = "41.2.3.4".parse().unwrap();
        assert_eq!(bounds(addr, 8), (0x2900_0000, 0x29ff_ffff));
        assert_eq!(bounds(addr, 32), (0x2902_0304, 0x2902_0304));

        let addr: IpAddr = "::".parse().unwrap();
        assert_eq!(bounds(addr, 0), (0, u128::MAX));
    }
}
