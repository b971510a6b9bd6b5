//! Autonomous System number bootstrapping.

use super::{Registry, RegistryFile};
use crate::error::BootstrapError;
use crate::types::Answer;
use tracing::debug;
use url::Url;

/// A contiguous range of AS numbers served by the same RDAP servers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsnRange {
    pub min: u32,
    pub max: u32,
    pub urls: Vec<Url>,
}

impl AsnRange {
    /// The registry entry text, "AS1768" or "AS2500-AS2528".
    pub fn entry(&self) -> String {
        if self.min == self.max {
            format!("AS{}", self.min)
        } else {
            format!("AS{}-AS{}", self.min, self.max)
        }
    }
}

/// Registry for `asn.json`.
#[derive(Debug, Clone)]
pub struct AsnRegistry {
    ranges: Vec<AsnRange>,
    file: RegistryFile,
}

impl AsnRegistry {
    pub fn new(json: &[u8]) -> Result<Self, BootstrapError> {
        let file = RegistryFile::parse(json)?;

        let mut ranges: Vec<AsnRange> = file
            .entries
            .iter()
            .filter_map(|(key, urls)| match parse_range(key) {
                Some((min, max)) => Some(AsnRange {
                    min,
                    max,
                    urls: urls.clone(),
                }),
                None => {
                    debug!(entry = %key, "Skipping unparsable AS number range");
                    None
                }
            })
            .collect();

        ranges.sort_by_key(|r| r.min);

        Ok(Self { ranges, file })
    }

    /// All ranges, sorted by their first AS number.
    pub fn ranges(&self) -> &[AsnRange] {
        &self.ranges
    }
}

impl Registry for AsnRegistry {
    fn lookup(&self, query: &str) -> Result<Answer, BootstrapError> {
        let asn = parse_asn(query)?;

        let index = self.ranges.partition_point(|r| r.max < asn);
        match self.ranges.get(index) {
            Some(range) if range.min <= asn => {
                debug!(asn, entry = %range.entry(), "ASN bootstrap match");
                Ok(Answer {
                    query: asn.to_string(),
                    entry: range.entry(),
                    urls: range.urls.clone(),
                })
            }
            _ => Ok(Answer::no_match(asn.to_string())),
        }
    }

    fn file(&self) -> &RegistryFile {
        &self.file
    }
}

/// Parse "1-100" or "1768". A reversed range is swapped.
fn parse_range(text: &str) -> Option<(u32, u32)> {
    let (min, max) = match text.split_once('-') {
        Some((a, b)) => (a.trim().parse().ok()?, b.trim().parse().ok()?),
        None => {
            let n = text.trim().parse().ok()?;
            (n, n)
        }
    };

    Some(if min <= max { (min, max) } else { (max, min) })
}

/// Parse "AS1234", "as1234" or "1234".
pub(crate) fn parse_asn(query: &str) -> Result<u32, BootstrapError> {
    let digits = match query.get(..2) {
        Some(prefix) if prefix.eq_ignore_ascii_case("as") => &query[2..],
        _ => query,
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BootstrapError::invalid_query(query, "invalid AS number"));
    }

    digits
        .parse::<u32>()
        .map_err(|e| BootstrapError::invalid_query(query, format!("invalid AS number: {}", e)))
}
