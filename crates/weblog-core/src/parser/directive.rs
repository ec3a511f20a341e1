//! Directive vocabulary: what each format token captures and which field
//! identifier it produces.
//!
//! Resolution always runs in the same order:
//!
//! 1. the fixed `mod_log_config` table ([`StandardDirective`]),
//! 2. the generic request-header rule `%{NAME}i` → `request_header_<name>`,
//! 3. the cleaned token text itself.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static REQUEST_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^%\{(?P<name>[\w\-]+)\}i$").unwrap());

/// Directives from the Apache `mod_log_config` table.
///
/// Some tokens share an identifier (`%b`/`%B`, `%s`/`%>s`); using both in one
/// format is a duplicate-identifier compilation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardDirective {
    RemoteIpAddress,
    LocalIpAddress,
    ResponseSize,
    UsecTaken,
    FileName,
    RemoteHost,
    RequestProtocol,
    BytesReceived,
    KeepaliveIndex,
    RemoteLogname,
    RequestLogId,
    RequestMethod,
    BytesSent,
    CanonicalPort,
    ProcessId,
    Query,
    Request,
    Handler,
    Status,
    TimeReceived,
    SecTaken,
    RemoteUser,
    RequestPath,
    ServerName,
    CanonicalServerName,
    ConnectionStatus,
}

impl StandardDirective {
    /// Look up a cleaned token in the directive table. Case-sensitive:
    /// `%h` and `%H` are different directives.
    pub fn from_token(token: &str) -> Option<Self> {
        let directive = match token {
            "%a" => Self::RemoteIpAddress,
            "%A" => Self::LocalIpAddress,
            "%b" | "%B" => Self::ResponseSize,
            "%D" => Self::UsecTaken,
            "%f" => Self::FileName,
            "%h" => Self::RemoteHost,
            "%H" => Self::RequestProtocol,
            "%I" => Self::BytesReceived,
            "%k" => Self::KeepaliveIndex,
            "%l" => Self::RemoteLogname,
            "%L" => Self::RequestLogId,
            "%m" => Self::RequestMethod,
            "%O" => Self::BytesSent,
            "%p" => Self::CanonicalPort,
            "%P" => Self::ProcessId,
            "%q" => Self::Query,
            "%r" => Self::Request,
            "%R" => Self::Handler,
            "%s" | "%>s" => Self::Status,
            "%t" => Self::TimeReceived,
            "%T" => Self::SecTaken,
            "%u" => Self::RemoteUser,
            "%U" => Self::RequestPath,
            "%v" => Self::ServerName,
            "%V" => Self::CanonicalServerName,
            "%X" => Self::ConnectionStatus,
            _ => return None,
        };
        Some(directive)
    }

    pub fn identifier(self) -> &'static str {
        match self {
            Self::RemoteIpAddress => "remote_ip_address",
            Self::LocalIpAddress => "local_ip_address",
            Self::ResponseSize => "response_size",
            Self::UsecTaken => "usec_taken",
            Self::FileName => "file_name",
            Self::RemoteHost => "remote_host",
            Self::RequestProtocol => "request_protocol",
            Self::BytesReceived => "bytes_received",
            Self::KeepaliveIndex => "keepalive_index",
            Self::RemoteLogname => "remote_logname",
            Self::RequestLogId => "request_log_id",
            Self::RequestMethod => "request_method",
            Self::BytesSent => "bytes_sent",
            Self::CanonicalPort => "canonical_port",
            Self::ProcessId => "process_id",
            Self::Query => "query",
            Self::Request => "request",
            Self::Handler => "handler",
            Self::Status => "status",
            Self::TimeReceived => "time_received",
            Self::SecTaken => "sec_taken",
            Self::RemoteUser => "remote_user",
            Self::RequestPath => "request_path",
            Self::ServerName => "server_name",
            Self::CanonicalServerName => "canonical_server_name",
            Self::ConnectionStatus => "connection_status",
        }
    }
}

/// How a directive's field identifier was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Standard(StandardDirective),
    /// `%{NAME}i`, holding the final `request_header_*` identifier.
    RequestHeader(String),
    /// Anything else; the identifier is the cleaned token text.
    Literal(String),
}

impl Resolution {
    pub fn resolve(cleaned: &str) -> Self {
        if let Some(directive) = StandardDirective::from_token(cleaned) {
            return Self::Standard(directive);
        }
        if let Some(caps) = REQUEST_HEADER.captures(cleaned) {
            let name = caps["name"].to_lowercase().replace('-', "_");
            return Self::RequestHeader(format!("request_header_{name}"));
        }
        Self::Literal(cleaned.to_string())
    }

    pub fn identifier(&self) -> &str {
        match self {
            Self::Standard(directive) => directive.identifier(),
            Self::RequestHeader(identifier) | Self::Literal(identifier) => identifier,
        }
    }
}

/// The capture rule a token contributes to the line pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureKind {
    /// `[...]`, capturing everything up to the closing bracket.
    Bracketed,
    /// `"..."`, allowing backslash-escaped characters inside.
    Quoted,
    /// A single run of non-whitespace.
    Bare,
}

impl CaptureKind {
    pub fn for_token(token: &str) -> Self {
        if token == "%t" || (token.starts_with('[') && token.ends_with(']')) {
            Self::Bracketed
        } else if token.starts_with('"') {
            Self::Quoted
        } else {
            Self::Bare
        }
    }

    /// Regex fragment with exactly one capture group. Delimiters stay outside
    /// the group.
    pub fn fragment(self) -> &'static str {
        match self {
            Self::Bracketed => r"\[([^\]]+)\]",
            Self::Quoted => r#""((?:[^"\\]|\\.)*)""#,
            Self::Bare => r"(\S+)",
        }
    }
}

impl fmt::Display for CaptureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bracketed => "bracketed",
            Self::Quoted => "quoted",
            Self::Bare => "bare",
        })
    }
}

/// One resolved token of a log format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    token: String,
    kind: CaptureKind,
    resolution: Resolution,
}

impl Directive {
    pub fn new(token: &str) -> Self {
        let kind = CaptureKind::for_token(token);
        let cleaned = match kind {
            CaptureKind::Bracketed => token.trim_start_matches('[').trim_end_matches(']'),
            CaptureKind::Quoted | CaptureKind::Bare => token.trim_matches('"'),
        };
        Self {
            token: token.to_string(),
            kind,
            resolution: Resolution::resolve(cleaned),
        }
    }

    /// Token as written in the format string, quotes included.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn kind(&self) -> CaptureKind {
        self.kind
    }

    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    pub fn identifier(&self) -> &str {
        self.resolution.identifier()
    }
}
