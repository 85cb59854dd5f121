//! Configuration from a java-properties file.
//!
//! The core consumes `net.host` and `net.port`; everything else passes
//! through untyped to whoever asks.

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

pub const DEFAULT_PROPERTIES_FILE: &str = "aquarians.properties";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 12345;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Key/value pairs in java-properties format: one `key=value` (or
/// `key: value`) per line, `#` and `!` starting comments.
#[derive(Clone, Debug, Default)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::parse(&text))
    }

    pub fn parse(text: &str) -> Self {
        let mut entries = BTreeMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let (key, value) = match line.find(['=', ':']) {
                Some(at) => (&line[..at], &line[at + 1..]),
                None => (line, ""),
            };
            entries.insert(key.trim().to_string(), value.trim().to_string());
        }
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_file: Option<String>,
    /// Untouched pass-through for external collaborators.
    pub properties: Properties,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            log_file: None,
            properties: Properties::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_properties(Properties::load(path)?)
    }

    pub fn from_properties(properties: Properties) -> Result<Self, ConfigError> {
        let host = properties.get_or("net.host", DEFAULT_HOST).to_string();
        let port = match properties.get("net.port") {
            None => DEFAULT_PORT,
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "net.port".to_string(),
                value: raw.to_string(),
            })?,
        };
        let log_file = properties.get("log.file").map(str::to_string);

        Ok(Self {
            host,
            port,
            log_file,
            properties,
        })
    }
}
