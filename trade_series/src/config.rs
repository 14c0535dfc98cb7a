//! Engine configuration: parsing, validation, and loading.
//!
//! The configuration is a small TOML document; every key is optional:
//!
//! ```toml
//! [cache]
//! granularity = "1m"
//!
//! [ledger]
//! partial_policy = "warn"   # ignore | warn | fail
//!
//! [query]
//! default_interval_limit = 10000
//! max_interval_limit = 10000
//! ```
//!
//! Entrypoints:
//! - Parse + validate from a TOML string: [`load_config_str`]
//! - Parse + validate from a file path: [`load_config_path`]
//! - Path taken from `TRADE_SERIES_CONFIG`, defaults if unset: [`load_config_from_env`]

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use shared_utils::env::{EnvError, get_env_var};
use toml::from_str;

use crate::granularity::{Granularity, GranularityUnit};

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "TRADE_SERIES_CONFIG";

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct EngineConfig {
    /// Sparse store settings.
    pub cache: CacheConfig,
    /// Ledger rebuild settings.
    pub ledger: LedgerConfig,
    /// Request defaults and ceilings.
    pub query: QueryConfig,
}

/// Sparse store settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct CacheConfig {
    /// Width of the buckets kept in the sparse store.
    ///
    /// Query granularities should be multiples of it.
    pub granularity: Granularity,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            granularity: Granularity::new(std::num::NonZeroU32::MIN, GranularityUnit::Minute),
        }
    }
}

/// What to do when a rebuild could not read every history unit.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialLedgerPolicy {
    /// Install the partial store silently.
    Ignore,
    /// Install the partial store and log a warning.
    #[default]
    Warn,
    /// Keep the previous store and fail the query.
    Fail,
}

/// Ledger rebuild settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct LedgerConfig {
    /// Handling of unreadable history units.
    pub partial_policy: PartialLedgerPolicy,
}

/// Request defaults and ceilings applied at the transport boundary.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct QueryConfig {
    /// Interval cap used when a request doesn't give one.
    pub default_interval_limit: usize,
    /// Interval caps above this are clamped.
    pub max_interval_limit: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_interval_limit: 10_000,
            max_interval_limit: 10_000,
        }
    }
}

impl QueryConfig {
    /// Resolve a requested cap against the defaults and the ceiling.
    pub fn interval_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_interval_limit)
            .min(self.max_interval_limit)
    }
}

/// Check cross-field constraints after deserialization.
///
/// Errors:
/// - a zero interval limit
/// - a default limit above the ceiling
pub fn validate_config(cfg: &EngineConfig) -> anyhow::Result<()> {
    if cfg.query.default_interval_limit == 0 || cfg.query.max_interval_limit == 0 {
        bail!("interval limits must be greater than zero");
    }
    if cfg.query.default_interval_limit > cfg.query.max_interval_limit {
        bail!(
            "default_interval_limit ({}) exceeds max_interval_limit ({})",
            cfg.query.default_interval_limit,
            cfg.query.max_interval_limit
        );
    }
    Ok(())
}

/// Parse and validate a config from a TOML string.
pub fn load_config_str(toml_str: &str) -> anyhow::Result<EngineConfig> {
    let cfg: EngineConfig = from_str(toml_str).context("failed to parse engine config TOML")?;
    validate_config(&cfg).context("invalid engine config")?;
    Ok(cfg)
}

/// Read a config TOML file from disk, parse, and validate it.
pub fn load_config_path(path: impl AsRef<std::path::Path>) -> anyhow::Result<EngineConfig> {
    let text = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("read config file {}", path.as_ref().display()))?;
    load_config_str(&text)
}

/// Load from the file named by [`CONFIG_ENV_VAR`], or defaults when unset.
pub fn load_config_from_env() -> anyhow::Result<EngineConfig> {
    match get_env_var(CONFIG_ENV_VAR) {
        Ok(path) => load_config_path(path),
        Err(EnvError::Missing(_)) => Ok(EngineConfig::default()),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn empty_document_gives_defaults() {
        let cfg = load_config_str("").unwrap();
        assert_eq!(cfg, EngineConfig::default());
        assert_eq!(cfg.cache.granularity.as_secs(), 60);
        assert_eq!(cfg.ledger.partial_policy, PartialLedgerPolicy::Warn);
    }

    #[test]
    fn parses_every_section() {
        let cfg = load_config_str(
            r#"
            [cache]
            granularity = "5m"
            [ledger]
            partial_policy = "fail"
            [query]
            default_interval_limit = 100
            max_interval_limit = 500
            "#,
        )
        .unwrap();
        assert_eq!(cfg.cache.granularity.as_secs(), 300);
        assert_eq!(cfg.ledger.partial_policy, PartialLedgerPolicy::Fail);
        assert_eq!(cfg.query.interval_limit(None), 100);
        assert_eq!(cfg.query.interval_limit(Some(9_999)), 500);
        assert_eq!(cfg.query.interval_limit(Some(7)), 7);
    }

    #[test]
    fn rejects_unknown_keys_and_bad_limits() {
        let err = load_config_str("[cache]\nwidth = 60").unwrap_err();
        assert!(format!("{err:#}").contains("width"));

        let err = load_config_str("[query]\ndefault_interval_limit = 20\nmax_interval_limit = 10")
            .unwrap_err();
        assert!(format!("{err:#}").contains("exceeds"));

        assert!(load_config_str("[query]\nmax_interval_limit = 0").is_err());
    }

    #[test]
    #[serial]
    fn env_var_points_at_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[ledger]\npartial_policy = \"ignore\"").unwrap();

        unsafe { std::env::set_var(CONFIG_ENV_VAR, file.path()) };
        let cfg = load_config_from_env().unwrap();
        assert_eq!(cfg.ledger.partial_policy, PartialLedgerPolicy::Ignore);

        unsafe { std::env::set_var(CONFIG_ENV_VAR, "  ") };
        assert_eq!(load_config_from_env().unwrap(), EngineConfig::default());

        unsafe { std::env::remove_var(CONFIG_ENV_VAR) };
        assert_eq!(load_config_from_env().unwrap(), EngineConfig::default());
    }
}
