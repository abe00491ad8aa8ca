//! Lookup configuration.
//!
//! Values come from an optional TOML file (path in `VAGDATA_CONFIG`) and
//! are then overridden by environment variables:
//!
//! | Variable | Field |
//! |---|---|
//! | `TRAFIKVERKET_API_KEY` | `api_key` |
//! | `TRAFIKVERKET_API_URL` | `api_url` |
//! | `VAGDATA_TIMEOUT_SECS` | `timeout_secs` |
//! | `VAGDATA_MAX_RETRIES` | `max_retries` |
//! | `VAGDATA_MAX_DISTANCE` | `max_distance_meters` |
//! | `VAGDATA_ATTRIBUTES` | `attribute_kinds` (comma-separated) |
//! | `VAGDATA_INCLUDE_RAW` | `include_raw_responses` |
//!
//! The API key has no default and must be supplied by one of the two.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use vagdata_road_models::AttributeKind;
use vagdata_trafikverket::resolver::DEFAULT_MAX_DISTANCE_METERS;
use vagdata_trafikverket::{ClientConfig, DEFAULT_API_URL, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT};

use crate::service::LookupOptions;

/// Environment variable naming the TOML config file.
pub const CONFIG_PATH_ENV: &str = "VAGDATA_CONFIG";

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`LookupConfig`].
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range or unparseable.
    #[error("Invalid configuration: {message}")]
    Invalid {
        /// What is wrong.
        message: String,
    },

    /// No API key was configured.
    #[error("No Trafikverket API key configured (set TRAFIKVERKET_API_KEY)")]
    MissingApiKey,
}

/// Settings for the lookup pipeline and its upstream client.
///
/// Only deserialized, never written back; `Debug` masks the API key.
#[derive(Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Trafikverket API endpoint.
    pub api_url: String,
    /// Trafikverket API key.
    pub api_key: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Retries for transient upstream failures.
    pub max_retries: u32,
    /// Snap search radius in meters.
    pub max_distance_meters: f64,
    /// Attribute kinds fetched for every click.
    pub attribute_kinds: Vec<AttributeKind>,
    /// Keep raw upstream payloads in results.
    pub include_raw_responses: bool,
}

impl std::fmt::Debug for LookupConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookupConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("max_distance_meters", &self.max_distance_meters)
            .field("attribute_kinds", &self.attribute_kinds)
            .field("include_raw_responses", &self.include_raw_responses)
            .finish()
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            max_retries: DEFAULT_MAX_RETRIES,
            max_distance_meters: DEFAULT_MAX_DISTANCE_METERS,
            attribute_kinds: AttributeKind::all().to_vec(),
            include_raw_responses: false,
        }
    }
}

impl LookupConfig {
    /// Loads the file named by `VAGDATA_CONFIG` (if set) and applies
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or an
    /// override or resulting value is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let base = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.is_empty() => {
                log::info!("Loading configuration from {path}");
                Self::from_file(Path::new(&path))?
            }
            _ => Self::default(),
        };
        let config = base.with_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a TOML config file. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parses TOML config text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is not valid.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::de::from_str(contents)?)
    }

    /// Applies overrides read through `lookup` (normally the process
    /// environment). Empty values are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a value cannot be parsed.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("TRAFIKVERKET_API_KEY") {
            self.api_key = Some(key.trim().to_string());
        }
        if let Some(url) = get("TRAFIKVERKET_API_URL") {
            self.api_url = url.trim().to_string();
        }
        if let Some(v) = get("VAGDATA_TIMEOUT_SECS") {
            self.timeout_secs = parse_value("VAGDATA_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("VAGDATA_MAX_RETRIES") {
            self.max_retries = parse_value("VAGDATA_MAX_RETRIES", &v)?;
        }
        if let Some(v) = get("VAGDATA_MAX_DISTANCE") {
            self.max_distance_meters = parse_value("VAGDATA_MAX_DISTANCE", &v)?;
        }
        if let Some(v) = get("VAGDATA_ATTRIBUTES") {
            self.attribute_kinds = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| parse_value::<AttributeKind>("VAGDATA_ATTRIBUTES", s))
                .collect::<Result<_, _>>()?;
        }
        if let Some(v) = get("VAGDATA_INCLUDE_RAW") {
            self.include_raw_responses = matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }

        Ok(self)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a non-positive radius or
    /// timeout, or an empty attribute list.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.max_distance_meters.is_finite() || self.max_distance_meters <= 0.0 {
            return Err(ConfigError::Invalid {
                message: format!(
                    "max_distance_meters must be positive, got {}",
                    self.max_distance_meters
                ),
            });
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                message: "timeout_secs must be at least 1".to_string(),
            });
        }
        if self.attribute_kinds.is_empty() {
            return Err(ConfigError::Invalid {
                message: "attribute_kinds must name at least one kind".to_string(),
            });
        }
        Ok(())
    }

    /// Upstream client settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingApiKey`] if no key is configured.
    pub fn client_config(&self) -> Result<ClientConfig, ConfigError> {
        let api_key = self
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        Ok(ClientConfig {
            endpoint: self.api_url.clone(),
            api_key,
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
        })
    }

    /// Pipeline settings.
    #[must_use]
    pub fn lookup_options(&self) -> LookupOptions {
        LookupOptions {
            max_distance_meters: self.max_distance_meters,
            kinds: self.attribute_kinds.clone(),
            include_raw_responses: self.include_raw_responses,
        }
    }
}

fn parse_value<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| ConfigError::Invalid {
        message: format!("{name}={value:?}: {e}"),
    })
}
