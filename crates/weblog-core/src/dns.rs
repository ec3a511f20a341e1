//! Reverse-DNS cache used to fill [`NormalizedRequest::host`](crate::NormalizedRequest).
//!
//! The on-disk form is the analog `dnscache` file: one record per line,
//!
//! ```text
//! 20878239 118.92.145.70 118-92-145-70.dsl.dyn.ihug.co.nz
//! 21148889 121.63.230.155 *
//! ```
//!
//! holding minutes since the epoch, the address, and the resolved name or `*`
//! when the lookup failed.

use crate::codec::{int_to_ip4, ip4_to_int};
use std::collections::HashMap;
use std::fmt;
use std::io::{self, BufRead};
use thiserror::Error;
use tracing::warn;

const UNRESOLVED: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed dns cache line: {0:?}")]
pub struct DnsCacheError(pub String);

/// Reverse lookup from an IPv4 integer to a hostname.
pub trait HostLookup: Send + Sync {
    fn hostname(&self, ip: u32) -> Option<&str>;
}

/// One cached lookup. `hostname` is `None` when resolution failed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DnsRecord {
    pub ip: u32,
    /// Epoch seconds of the lookup, minute resolution
    pub timestamp: i64,
    pub hostname: Option<String>,
}

impl DnsRecord {
    pub fn parse_line(line: &str) -> Result<Self, DnsCacheError> {
        let malformed = || DnsCacheError(line.trim_end().to_string());

        let mut parts = line.split_whitespace();
        let (Some(minutes), Some(ip), Some(hostname), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };

        let minutes: i64 = minutes.parse().map_err(|_| malformed())?;
        let ip = ip4_to_int(ip).map_err(|_| malformed())?;
        let hostname = (hostname != UNRESOLVED).then(|| hostname.to_lowercase());

        Ok(Self {
            ip,
            timestamp: minutes.checked_mul(60).ok_or_else(malformed)?,
            hostname,
        })
    }

    pub fn is_resolved(&self) -> bool {
        self.hostname.is_some()
    }
}

// Writes the cache-file line, without a terminator
impl fmt::Display for DnsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.timestamp.div_euclid(60),
            int_to_ip4(self.ip),
            self.hostname.as_deref().unwrap_or(UNRESOLVED)
        )
    }
}

/// In-memory cache keyed by IP. When an address appears more than once the
/// most recent lookup wins.
#[derive(Debug, Clone, Default)]
pub struct DnsCache {
    records: HashMap<u32, DnsRecord>,
}

impl DnsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a cache file. Malformed or non-UTF-8 lines are logged and
    /// skipped; the count of skipped lines is returned alongside the cache.
    pub fn load<R: BufRead>(reader: R) -> io::Result<(Self, usize)> {
        let mut cache = Self::new();
        let mut skipped = 0;

        for (index, bytes) in reader.split(b'\n').enumerate() {
            let bytes = bytes?;
            let line = match std::str::from_utf8(&bytes) {
                Ok(line) => line,
                Err(e) => {
                    warn!(line = index + 1, error = %e, "skipping undecodable dns cache line");
                    skipped += 1;
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match DnsRecord::parse_line(line) {
                Ok(record) => cache.insert(record),
                Err(e) => {
                    warn!(line = index + 1, error = %e, "skipping dns cache line");
                    skipped += 1;
                }
            }
        }

        Ok((cache, skipped))
    }

    pub fn insert(&mut self, record: DnsRecord) {
        match self.records.get(&record.ip) {
            Some(existing) if existing.timestamp > record.timestamp => {}
            _ => {
                self.records.insert(record.ip, record);
            }
        }
    }

    pub fn get(&self, ip: u32) -> Option<&DnsRecord> {
        self.records.get(&ip)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &DnsRecord> {
        self.records.values()
    }

    /// Drop failed lookups made before `cutoff` (epoch seconds) so they get
    /// retried.
    pub fn flush_unresolved(&mut self, cutoff: i64) {
        self.records
            .retain(|_, r| r.is_resolved() || r.timestamp >= cutoff);
    }

    /// Drop successful lookups made before `cutoff` (epoch seconds).
    pub fn flush_resolved(&mut self, cutoff: i64) {
        self.records
            .retain(|_, r| !r.is_resolved() || r.timestamp >= cutoff);
    }
}

impl HostLookup for DnsCache {
    fn hostname(&self, ip: u32) -> Option<&str> {
        self.records.get(&ip).and_then(|r| r.hostname.as_deref())
    }
}

impl HostLookup for HashMap<u32, String> {
    fn hostname(&self, ip: u32) -> Option<&str> {
        self.get(&ip).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CACHE: &str = "\
20878239 118.92.145.70 118-92-145-70.DSL.dyn.ihug.co.nz
21148889 121.63.230.155 *
21148889 150.101.154.99 mail.advantagekitchens.com.au

not a record
21148890 118.92.145.70 newer.example.net
";

    #[test]
    fn test_parse_line() {
        let record = DnsRecord::parse_line("20878239 118.92.145.70 Host.Example.COM").unwrap();
        assert_eq!(record.ip, ip4_to_int("118.92.145.70").unwrap());
        assert_eq!(record.timestamp, 20_878_239 * 60);
        assert_eq!(record.hostname.as_deref(), Some("host.example.com"));

        let failed = DnsRecord::parse_line("21148889 121.63.230.155 *").unwrap();
        assert!(!failed.is_resolved());
    }

    #[test]
    fn test_parse_line_rejects_malformed() {
        for line in [
            "",
            "1 2",
            "x 1.2.3.4 host",
            "1 1.2.3 host",
            "1 1.2.3.4 host extra",
            "999999999999999999 1.2.3.4 host",
        ] {
            assert_eq!(DnsRecord::parse_line(line), Err(DnsCacheError(line.to_string())));
        }
    }

    #[test]
    fn test_display_writes_cache_line() {
        let record = DnsRecord::parse_line("21148889 121.63.230.155 *").unwrap();
        assert_eq!(record.to_string(), "21148889 121.63.230.155 *");

        let record = DnsRecord {
            ip: 3_221_226_219,
            timestamp: 1_234_567_890,
            hostname: Some("lost.co.nz".to_string()),
        };
        assert_eq!(record.to_string(), "20576131 192.0.2.235 lost.co.nz");
    }

    #[test]
    fn test_load_skips_bad_lines_and_keeps_newest() {
        let (cache, skipped) = DnsCache::load(CACHE.as_bytes()).unwrap();
        assert_eq!(skipped, 1);
        assert_eq!(cache.len(), 3);

        let ip = ip4_to_int("118.92.145.70").unwrap();
        assert_eq!(cache.hostname(ip), Some("newer.example.net"));
        assert_eq!(cache.hostname(ip4_to_int("121.63.230.155").unwrap()), None);
        assert_eq!(cache.hostname(1), None);
    }

    #[test]
    fn test_load_skips_undecodable_lines() {
        let mut input = b"20878239 118.92.145.70 first.example\n".to_vec();
        input.extend_from_slice(b"20878240 10.0.0.1 caf\xe9.example\n");
        input.extend_from_slice(b"20878241 10.0.0.2 second.example\n");

        let (cache, skipped) = DnsCache::load(&input[..]).unwrap();
        assert_eq!(skipped, 1);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.hostname(ip4_to_int("10.0.0.1").unwrap()), None);
        assert_eq!(cache.hostname(ip4_to_int("10.0.0.2").unwrap()), Some("second.example"));
    }

    #[test]
    fn test_older_record_does_not_replace_newer() {
        let mut cache = DnsCache::new();
        cache.insert(DnsRecord { ip: 1, timestamp: 600, hostname: Some("new".to_string()) });
        cache.insert(DnsRecord { ip: 1, timestamp: 60, hostname: Some("old".to_string()) });
        assert_eq!(cache.hostname(1), Some("new"));
    }

    #[test]
    fn test_flush_by_age() {
        let (mut cache, _) = DnsCache::load(CACHE.as_bytes()).unwrap();
        let cutoff = 21_148_889 * 60;

        cache.flush_unresolved(cutoff + 1);
        assert_eq!(cache.len(), 2);
        assert!(cache.records().all(DnsRecord::is_resolved));

        cache.flush_resolved(cutoff + 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.hostname(ip4_to_int("118.92.145.70").unwrap()),
            Some("newer.example.net")
        );
    }
}
