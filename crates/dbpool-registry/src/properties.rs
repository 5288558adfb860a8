//! Binding external configuration to per-data-source pool configs.
//!
//! Configuration arrives either as a nested map (file-based config via
//! serde) or as a flat `key=value` listing with dotted keys:
//!
//! ```text
//! datasources.default.url=postgres://db:5432/app
//! datasources.default.min-pool-size=2
//! datasources.events.url=mysql://db:3306/events
//! datasources.events.properties.ssl-mode=require
//! ```
//!
//! Keys outside the `datasources.` prefix are ignored; unrecognized keys
//! under a data source pass through to the backend's property map.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use dbpool::{ConfigError, PoolConfig};

/// Prefix all data-source configuration keys live under.
pub const PREFIX: &str = "datasources";

/// Per-name pool configurations, bound but not yet validated.
///
/// Validation stays at pool construction, the single boundary where every
/// configuration failure surfaces.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct DataSourceProperties {
    sources: BTreeMap<String, PoolConfig>,
}

impl DataSourceProperties {
    /// An empty property set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a data source configuration programmatically.
    pub fn insert(&mut self, name: impl Into<String>, config: PoolConfig) {
        self.sources.insert(name.into(), config);
    }

    /// Bind a flat `key=value` listing.
    ///
    /// Numeric and duration fields that fail to parse are rejected with
    /// [`ConfigError::InvalidValue`] naming the offending key. Timeouts are
    /// in milliseconds.
    pub fn from_flat<I, K, V>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut properties = Self::new();
        for (key, value) in entries {
            let key = key.as_ref();
            let value = value.as_ref();

            let Some(rest) = key.strip_prefix(PREFIX).and_then(|r| r.strip_prefix('.')) else {
                tracing::debug!(key, "ignoring key outside the datasources prefix");
                continue;
            };
            let Some((name, field)) = rest.split_once('.') else {
                tracing::debug!(key, "ignoring datasource key with no field");
                continue;
            };

            let config = properties.sources.entry(name.to_string()).or_default();
            apply_field(config, key, field, value)?;
        }
        Ok(properties)
    }

    /// Look up one data source's configuration.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PoolConfig> {
        self.sources.get(name)
    }

    /// Iterate configured data sources in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PoolConfig)> {
        self.sources.iter().map(|(name, config)| (name.as_str(), config))
    }

    /// Configured data source names, in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    /// Number of configured data sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether no data source is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

fn apply_field(
    config: &mut PoolConfig,
    key: &str,
    field: &str,
    value: &str,
) -> Result<(), ConfigError> {
    match field {
        "url" => config.url = value.to_string(),
        "username" => config.username = Some(value.to_string()),
        "password" => config.password = Some(value.to_string()),
        "min-pool-size" => config.min_pool_size = parse_number(key, value)?,
        "max-pool-size" => config.max_pool_size = parse_number(key, value)?,
        "connection-wait-timeout" => {
            config.connection_wait_timeout = parse_millis(key, value)?;
        }
        "idle-timeout" => config.idle_timeout = parse_millis(key, value)?,
        "shutdown-grace" => config.shutdown_grace = parse_millis(key, value)?,
        "validation-query" => config.validation_query = Some(value.to_string()),
        other => {
            // `properties.foo` and any unrecognized key pass through to
            // the backend untouched.
            let passthrough = other.strip_prefix("properties.").unwrap_or(other);
            config
                .properties
                .insert(passthrough.to_string(), value.to_string());
        }
    }
    Ok(())
}

fn parse_number(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_millis(key: &str, value: &str) -> Result<Duration, ConfigError> {
    let millis: u64 = value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })?;
    Ok(Duration::from_millis(millis))
}
