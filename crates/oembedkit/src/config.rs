//! File-based resolver configuration
//!
//! A JSON document describing resolver options and extra services:
//!
//! ```json
//! {
//!   "timeout": "5s",
//!   "maxRedirects": 3,
//!   "denyList": ["localhost/**", "127.0.0.1**"],
//!   "services": {
//!     "westworld": {
//!       "name": "Westworld",
//!       "matches": ["discoverwestworld.com/**"],
//!       "url": "https://discoverwestworld.com/oembed?url={{url}}",
//!       "prepend": true
//!     }
//!   }
//! }
//! ```

use crate::resolver::ResolverBuilder;
use crate::services::Service;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors loading a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// File is not valid configuration JSON
    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),

    /// A duration string could not be parsed
    #[error("Invalid duration \"{0}\": expected milliseconds or a value like 500ms, 10s, 2m, 1h")]
    Duration(String),
}

/// A duration given as milliseconds or as a human string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Millis(u64),
    Human(String),
}

impl DurationValue {
    /// Convert to a [`Duration`]
    pub fn to_duration(&self) -> Result<Duration, ConfigError> {
        match self {
            DurationValue::Millis(ms) => Ok(Duration::from_millis(*ms)),
            DurationValue::Human(s) => parse_duration(s),
        }
    }
}

/// Parse `"500ms"`, `"10s"`, `"2m"`, `"1h"`, `"1.5s"` or bare milliseconds
pub fn parse_duration(input: &str) -> Result<Duration, ConfigError> {
    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);

    let value: f64 = number
        .parse()
        .map_err(|_| ConfigError::Duration(input.to_string()))?;
    let millis_per_unit = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => 1.0,
        "s" | "sec" | "secs" | "second" | "seconds" => 1_000.0,
        "m" | "min" | "mins" | "minute" | "minutes" => 60_000.0,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3_600_000.0,
        _ => return Err(ConfigError::Duration(input.to_string())),
    };

    let millis = value * millis_per_unit;
    if !millis.is_finite() || millis < 0.0 {
        return Err(ConfigError::Duration(input.to_string()));
    }
    Ok(Duration::from_millis(millis.round() as u64))
}

/// Format a duration in its largest whole unit: `"850ms"`, `"2s"`, `"3m"`
pub fn format_duration(duration: Duration) -> String {
    let ms = duration.as_millis();
    const SECOND: u128 = 1_000;
    const MINUTE: u128 = 60 * SECOND;
    const HOUR: u128 = 60 * MINUTE;

    let rounded = |unit: u128| (ms + unit / 2) / unit;
    if ms >= HOUR {
        format!("{}h", rounded(HOUR))
    } else if ms >= MINUTE {
        format!("{}m", rounded(MINUTE))
    } else if ms >= SECOND {
        format!("{}s", rounded(SECOND))
    } else {
        format!("{ms}ms")
    }
}

/// A service defined in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub matches: Vec<String>,
    /// Endpoint template with a `{{url}}` placeholder
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub timeout: Option<DurationValue>,
    /// Consider this service before the built-in ones
    #[serde(default)]
    pub prepend: bool,
}

impl ServiceConfig {
    /// Convert to a [`Service`]; validation happens when the registry is built
    pub fn to_service(&self) -> Result<Service, ConfigError> {
        let mut service = Service::new(self.name.clone(), self.matches.clone());
        if let Some(url) = &self.url {
            service = service.url_template(url.clone());
        }
        if let Some(timeout) = &self.timeout {
            service = service.timeout(timeout.to_duration()?);
        }
        Ok(service)
    }
}

/// Resolver configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResolverConfig {
    pub timeout: Option<DurationValue>,
    pub max_redirects: Option<u32>,
    pub allow_list: Vec<String>,
    pub deny_list: Vec<String>,
    pub user_agent: Option<String>,
    pub headers: BTreeMap<String, String>,
    /// Leave the built-in provider table out
    pub no_default_services: bool,
    pub services: IndexMap<String, ServiceConfig>,
}

impl ResolverConfig {
    /// Parse configuration JSON
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read configuration JSON from a file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Apply the configuration to a fresh [`ResolverBuilder`]
    pub fn into_builder(self) -> Result<ResolverBuilder, ConfigError> {
        self.apply(ResolverBuilder::new())
    }

    /// Apply the configuration on top of an existing builder
    pub fn apply(self, mut builder: ResolverBuilder) -> Result<ResolverBuilder, ConfigError> {
        if let Some(timeout) = &self.timeout {
            builder = builder.timeout(timeout.to_duration()?);
        }
        if let Some(max_redirects) = self.max_redirects {
            builder = builder.max_redirects(max_redirects);
        }
        for pattern in self.allow_list {
            builder = builder.allow(pattern);
        }
        for pattern in self.deny_list {
            builder = builder.deny(pattern);
        }
        if let Some(user_agent) = self.user_agent {
            builder = builder.user_agent(user_agent);
        }
        for (name, value) in self.headers {
            builder = builder.header(name, value);
        }
        if self.no_default_services {
            builder = builder.without_default_services();
        }
        for (key, service) in self.services {
            let prepend = service.prepend;
            let service = service.to_service()?;
            builder = if prepend {
                builder.prepend_service(key, service)
            } else {
                builder.service(key, service)
            };
        }
        Ok(builder)
    }
}
