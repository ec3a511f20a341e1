// Named Apache log formats

use super::format::CompiledFormat;
use crate::error::CompilationError;
use std::fmt;
use std::str::FromStr;

/// The stock Apache formats, plus the virtual-host variant that logs the
/// `Host` header and request duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preset {
    Common,
    Combined,
    VCommon,
    VCombined,
    VhostCombined,
}

impl Preset {
    pub const ALL: [Preset; 5] = [
        Preset::Common,
        Preset::Combined,
        Preset::VCommon,
        Preset::VCombined,
        Preset::VhostCombined,
    ];

    /// Parse preset name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "common" | "clf" => Some(Self::Common),
            "combined" | "ncsa" => Some(Self::Combined),
            "vcommon" => Some(Self::VCommon),
            "vcombined" => Some(Self::VCombined),
            "vhost_combined" | "vhost-combined" => Some(Self::VhostCombined),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Combined => "combined",
            Self::VCommon => "vcommon",
            Self::VCombined => "vcombined",
            Self::VhostCombined => "vhost_combined",
        }
    }

    pub fn log_format(self) -> &'static str {
        match self {
            Self::Common => r#"%h %l %u %t "%r" %>s %b"#,
            Self::Combined => r#"%h %l %u %t "%r" %>s %b "%{Referer}i" "%{User-agent}i""#,
            Self::VCommon => r#"%v %h %l %u %t "%r" %>s %b"#,
            Self::VCombined => {
                r#"%v %h %l %u %t "%r" %>s %b "%{Referer}i" "%{User-agent}i""#
            }
            Self::VhostCombined => {
                r#"%{Host}i %h %l %u %t "%r" %>s %b "%{Referer}i" "%{User-Agent}i" %D"#
            }
        }
    }

    /// Whether lines carry their own domain (`%v` or `%{Host}i`).
    pub fn has_domain(self) -> bool {
        matches!(self, Self::VCommon | Self::VCombined | Self::VhostCombined)
    }

    pub fn compile(self) -> Result<CompiledFormat, CompilationError> {
        CompiledFormat::compile(self.log_format())
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unknown log format preset: {s}"))
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
