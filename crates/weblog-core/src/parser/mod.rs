//! access log parsing - compile a LogFormat string, match lines, canonicalize

pub mod directive;
pub mod format;
pub mod matcher;
pub mod preset;

pub use directive::{CaptureKind, Directive, Resolution, StandardDirective};
pub use format::CompiledFormat;
pub use matcher::RawFieldRecord;
pub use preset::Preset;

use crate::canonical::{canonicalize, CanonicalOptions};
use crate::dns::HostLookup;
use crate::error::LineError;
use crate::NormalizedRequest;
use std::sync::Arc;

// Parser trait - turns one line into one request

pub trait LogParser: Send + Sync {
    fn name(&self) -> &str;
    fn parse(&self, line: &str) -> Result<NormalizedRequest, LineError>;
}

/// Matches lines against a compiled format and canonicalizes the result,
/// optionally resolving `host` through a reverse-DNS lookup.
#[derive(Clone)]
pub struct AccessLogParser {
    name: String,
    format: CompiledFormat,
    options: CanonicalOptions,
    hosts: Option<Arc<dyn HostLookup>>,
}

impl AccessLogParser {
    pub fn new(format: CompiledFormat, options: CanonicalOptions) -> Self {
        Self {
            name: format.format().to_string(),
            format,
            options,
            hosts: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_hosts(mut self, hosts: Arc<dyn HostLookup>) -> Self {
        self.hosts = Some(hosts);
        self
    }

    pub fn format(&self) -> &CompiledFormat {
        &self.format
    }

    pub fn options(&self) -> &CanonicalOptions {
        &self.options
    }
}

impl LogParser for AccessLogParser {
    fn name(&self) -> &str {
        &self.name
    }

    fn parse(&self, line: &str) -> Result<NormalizedRequest, LineError> {
        let raw = self.format.match_line(line)?;
        let request = canonicalize(&raw, &self.options)?;
        Ok(match &self.hosts {
            Some(hosts) => {
                let host = hosts.hostname(request.ip).map(str::to_string);
                request.with_host(host)
            }
            None => request,
        })
    }
}

impl std::fmt::Debug for AccessLogParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessLogParser")
            .field("name", &self.name)
            .field("format", &self.format.format())
            .field("options", &self.options)
            .field("hosts", &self.hosts.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::DnsCache;
    use crate::dns::DnsRecord;

    const LINE: &str = r#"10.0.0.1 - - [01/Jan/2017:09:00:00 +0000] "GET /contact.html HTTP/1.1" 200 250"#;

    fn parser() -> AccessLogParser {
        AccessLogParser::new(
            Preset::Common.compile().unwrap(),
            CanonicalOptions::with_domain("example.com"),
        )
    }

    #[test]
    fn test_parse_line() {
        let req = parser().parse(LINE).unwrap();
        assert_eq!(req.domain.as_deref(), Some("example.com"));
        assert_eq!(req.path.as_deref(), Some("/contact.html"));
        assert_eq!(req.host, None);
    }

    #[test]
    fn test_errors_are_classified() {
        let parser = parser();
        assert!(matches!(parser.parse("blah blah blah"), Err(LineError::Parse(_))));
        let bad_status = LINE.replace(" 200 ", " ok ");
        assert!(matches!(parser.parse(&bad_status), Err(LineError::Conversion(_))));
    }

    #[test]
    fn test_host_filled_from_lookup() {
        let mut cache = DnsCache::new();
        cache.insert(DnsRecord {
            ip: 167_772_161,
            timestamp: 0,
            hostname: Some("gateway.lan".to_string()),
        });
        let parser = parser().with_hosts(Arc::new(cache)).named("common");
        assert_eq!(parser.name(), "common");
        let req = parser.parse(LINE).unwrap();
        assert_eq!(req.host.as_deref(), Some("gateway.lan"));
    }
}
