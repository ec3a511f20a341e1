//! Field canonicalizer: turns a [`RawFieldRecord`] into a typed
//! [`NormalizedRequest`].
//!
//! This is a pure function of the record and the options. It never touches
//! the line matcher and keeps no state between calls.

use crate::codec::{date_to_epoch, ip4_to_int};
use crate::error::FieldConversionError;
use crate::parser::RawFieldRecord;
use crate::NormalizedRequest;
use std::fmt;
use std::str::FromStr;

const PLACEHOLDER: &str = "-";
const IPV6_LOOPBACK: &str = "::1";
const IPV4_LOOPBACK: &str = "127.0.0.1";

/// Caller-supplied settings for canonicalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalOptions {
    /// Domain to use for every line, for formats without a `%v` or
    /// `%{Host}i` directive.
    pub domain: Option<String>,
}

impl CanonicalOptions {
    pub fn with_domain(domain: impl Into<String>) -> Self {
        Self {
            domain: Some(domain.into()),
        }
    }
}

pub fn canonicalize(
    raw: &RawFieldRecord<'_>,
    options: &CanonicalOptions,
) -> Result<NormalizedRequest, FieldConversionError> {
    let domain = match &options.domain {
        Some(domain) => normalize_domain(domain),
        None => present(raw.get("request_header_host"))
            .or_else(|| present(raw.get("server_name")))
            .and_then(normalize_domain),
    };

    Ok(NormalizedRequest {
        domain,
        ip: remote_ip(raw)?,
        host: None,
        timestamp: timestamp(raw)?,
        path: request_path(raw),
        status: status(raw)?,
        size: response_size(raw)?,
        referrer: present(raw.get("request_header_referer")).map(str::to_string),
        user_agent: present(raw.get("request_header_user_agent")).map(str::to_string),
    })
}

// None for a missing field or the `-` placeholder
fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| *v != PLACEHOLDER)
}

fn normalize_domain(domain: &str) -> Option<String> {
    let domain = domain.trim().to_lowercase();
    let domain = domain.strip_prefix("www.").unwrap_or(&domain);
    if domain.is_empty() || domain == PLACEHOLDER {
        None
    } else {
        Some(domain.to_string())
    }
}

fn remote_ip(raw: &RawFieldRecord<'_>) -> Result<u32, FieldConversionError> {
    let (field, value) = match raw.get("remote_host") {
        Some(value) => ("remote_host", value),
        None => (
            "remote_ip_address",
            raw.get("remote_ip_address")
                .ok_or(FieldConversionError::Missing("remote_host"))?,
        ),
    };
    let quad = if value == IPV6_LOOPBACK { IPV4_LOOPBACK } else { value };
    ip4_to_int(quad).map_err(|e| FieldConversionError::invalid(field, value, e))
}

fn timestamp(raw: &RawFieldRecord<'_>) -> Result<i64, FieldConversionError> {
    let value = raw
        .get("time_received")
        .ok_or(FieldConversionError::Missing("time_received"))?;
    date_to_epoch(value).map_err(|e| FieldConversionError::invalid("time_received", value, e))
}

fn request_path(raw: &RawFieldRecord<'_>) -> Option<String> {
    let path = match raw.get("request") {
        // METHOD PATH PROTOCOL
        Some(request) => request.split_whitespace().nth(1)?,
        None => raw.get("request_path")?,
    };
    let path = path.split_once('?').map_or(path, |(path, _query)| path);
    if path.is_empty() || path == "*" || path == PLACEHOLDER {
        None
    } else {
        Some(path.to_string())
    }
}

fn status(raw: &RawFieldRecord<'_>) -> Result<u16, FieldConversionError> {
    let value = raw
        .get("status")
        .ok_or(FieldConversionError::Missing("status"))?;
    unsigned("status", value)
}

fn response_size(raw: &RawFieldRecord<'_>) -> Result<Option<u64>, FieldConversionError> {
    present(raw.get("response_size"))
        .map(|value| unsigned("response_size", value))
        .transpose()
}

// digits only: str::parse would also take a leading '+'
fn unsigned<T>(field: &'static str, value: &str) -> Result<T, FieldConversionError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FieldConversionError::invalid(field, value, "not a decimal number"));
    }
    value
        .parse()
        .map_err(|e| FieldConversionError::invalid(field, value, e))
}
