//! Core types for turning web-server access logs into typed request records.
//!
//! A log layout is described at run time by an Apache `LogFormat` string.
//! [`CompiledFormat`] turns that string into a line matcher once; each line is
//! then matched into a [`RawFieldRecord`] and canonicalized into a
//! [`NormalizedRequest`].
//!
//! ```
//! use weblog_core::{canonicalize, CanonicalOptions, CompiledFormat};
//!
//! let format = CompiledFormat::compile(r#"%h %l %u %t "%r" %>s %b"#).unwrap();
//! let raw = format
//!     .match_line(r#"127.0.0.1 - frank [10/Oct/2000:13:55:36 -0700] "GET /apache_pb.gif HTTP/1.0" 200 2326"#)
//!     .unwrap();
//! let request = canonicalize(&raw, &CanonicalOptions::with_domain("example.com")).unwrap();
//! assert_eq!(request.status, 200);
//! assert_eq!(request.timestamp, 971211336);
//! ```
pub mod canonical;
pub mod codec;
pub mod dns;
pub mod error;
pub mod parser;
pub mod pipeline;
pub mod sink;

pub use canonical::{canonicalize, CanonicalOptions};
pub use error::{CodecError, CompilationError, FieldConversionError, LineError, ParseError};
pub use parser::{AccessLogParser, CompiledFormat, LogParser, Preset, RawFieldRecord};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// NORMALIZED REQUEST //

/// One access-log line after canonicalization.
///
/// Optional fields are `None` wherever the log had no value or the `-`
/// placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedRequest {
    /// Website domain, lower-cased, without a leading `www.`
    #[serde(default)]
    pub domain: Option<String>,

    /// Remote IPv4 address as a big-endian integer
    pub ip: u32,

    /// Reverse-DNS name of `ip`, filled by a [`dns::HostLookup`]
    #[serde(default)]
    pub host: Option<String>,

    /// UTC seconds since the epoch
    pub timestamp: i64,

    /// Request path without the query string
    #[serde(default)]
    pub path: Option<String>,

    pub status: u16,

    /// Response body size in bytes
    #[serde(default)]
    pub size: Option<u64>,

    #[serde(default)]
    pub referrer: Option<String>,

    #[serde(default)]
    pub user_agent: Option<String>,
}

impl NormalizedRequest {
    pub fn with_host(mut self, host: Option<String>) -> Self {
        self.host = host;
        self
    }

    /// Dotted-quad form of `ip`.
    pub fn ip_quad(&self) -> String {
        codec::int_to_ip4(self.ip)
    }

    pub fn date(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp(self.timestamp, 0)
    }
}

impl fmt::Display for NormalizedRequest {
    // domain ip host timestamp path status size referrer "user agent"
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn or_dash(value: &Option<String>) -> &str {
            value.as_deref().unwrap_or("-")
        }
        let size = self.size.map_or_else(|| "-".to_string(), |s| s.to_string());
        write!(
            f,
            "{} {} {} {} {} {} {} {} \"{}\"",
            or_dash(&self.domain),
            self.ip_quad(),
            or_dash(&self.host),
            self.timestamp,
            or_dash(&self.path),
            self.status,
            size,
            or_dash(&self.referrer),
            or_dash(&self.user_agent),
        )
    }
}
