//! Configuration file for the weblog CLI

use clap::ValueEnum;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "weblog.toml";

// Every field is optional; command-line flags override whatever is set here
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    // preset name (common, combined, ...) or a raw LogFormat string
    pub log_format: Option<String>,

    // domain for formats that don't log one
    pub domain: Option<String>,

    // analog dnscache file used to fill in hostnames
    pub dns_cache: Option<PathBuf>,

    // requests handed to the output per batch
    pub batch_size: Option<usize>,

    pub output: Option<OutputFormat>,
}

#[derive(Debug, Default, Deserialize, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    Ok(config)
}

// Explicit path must exist; the default file is only read when present
pub fn resolve_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    match path {
        Some(path) => load_config(path),
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => load_config(DEFAULT_CONFIG_FILE),
        None => Ok(Config::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config() {
        let toml_content = r#"
log_format = '%{Host}i %h %l %u %t "%r" %>s %b "%{Referer}i" "%{User-Agent}i" %D'
dns_cache = "/var/cache/analog/dnscache"
batch_size = 500
output = "text"
"#;
        let config: Config = toml::from_str(toml_content).unwrap();
        assert!(config.log_format.unwrap().starts_with("%{Host}i"));
        assert_eq!(config.domain, None);
        assert_eq!(config.dns_cache, Some(PathBuf::from("/var/cache/analog/dnscache")));
        assert_eq!(config.batch_size, Some(500));
        assert_eq!(config.output, Some(OutputFormat::Text));
    }

    #[test]
    fn test_empty_config_and_unknown_keys() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.log_format.is_none());
        assert!(config.output.is_none());

        assert!(toml::from_str::<Config>("formt = \"common\"").is_err());
    }
}
