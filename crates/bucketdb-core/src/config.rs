//! Engine configuration.
//!
//! Loaded once at wiring time (usually from a TOML table) and attached to
//! bucket builders. Values are validated before any bucket is built.

use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    serialize::DEFAULT_MAX_DECODE_BYTES,
};
use serde::Deserialize;
use thiserror::Error as ThisError;

/// Default upper bound for one serialized record. Also the largest value
/// accepted, since reads never decode more than this.
pub const DEFAULT_MAX_RECORD_BYTES: usize = DEFAULT_MAX_DECODE_BYTES;

/// Default upper bound for the references held by one index entry.
pub const DEFAULT_MAX_INDEX_REFS: usize = 65_535;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<ConfigError> for InternalError {
    fn from(err: ConfigError) -> Self {
        Self::new(ErrorClass::Configuration, ErrorOrigin::Config, err.to_string())
    }
}

///
/// IndexWriteMode
///
/// How index mutations are applied relative to the primary record write.
///
/// `Staged` plans every index mutation first and writes nothing unless all
/// indexes accept the change. `Eager` applies each index as soon as it has
/// been planned, so a failure in a later index leaves earlier indexes
/// already mutated while the primary record stays untouched.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum IndexWriteMode {
    #[default]
    Staged,
    Eager,
}

///
/// EngineConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub index_writes: IndexWriteMode,
    pub max_record_bytes: usize,
    pub max_index_refs: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            index_writes: IndexWriteMode::default(),
            max_record_bytes: DEFAULT_MAX_RECORD_BYTES,
            max_index_refs: DEFAULT_MAX_INDEX_REFS,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;

        Ok(config)
    }

    /// Check cross-field and range constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_record_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_record_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_record_bytes > DEFAULT_MAX_DECODE_BYTES {
            return Err(ConfigError::Invalid(format!(
                "max_record_bytes must not exceed {DEFAULT_MAX_DECODE_BYTES}, got {}",
                self.max_record_bytes
            )));
        }
        if self.max_index_refs == 0 {
            return Err(ConfigError::Invalid(
                "max_index_refs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    #[must_use]
    pub const fn with_index_writes(mut self, mode: IndexWriteMode) -> Self {
        self.index_writes = mode;
        self
    }

    #[must_use]
    pub const fn with_max_record_bytes(mut self, max: usize) -> Self {
        self.max_record_bytes = max;
        self
    }

    #[must_use]
    pub const fn with_max_index_refs(mut self, max: usize) -> Self {
        self.max_index_refs = max;
        self
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::{ConfigError, DEFAULT_MAX_RECORD_BYTES, EngineConfig, IndexWriteMode};

    #[test]
    fn empty_document_yields_defaults() {
        let config = EngineConfig::from_toml_str("").expect("empty config should parse");

        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.index_writes, IndexWriteMode::Staged);
        assert_eq!(config.max_record_bytes, DEFAULT_MAX_RECORD_BYTES);
    }

    #[test]
    fn eager_mode_parses() {
        let config = EngineConfig::from_toml_str(
            r#"
            index_writes = "eager"
            max_index_refs = 16
            "#,
        )
        .expect("config should parse");

        assert_eq!(config.index_writes, IndexWriteMode::Eager);
        assert_eq!(config.max_index_refs, 16);
    }

    #[test]
    fn zero_limits_are_rejected() {
        let err = EngineConfig::from_toml_str("max_record_bytes = 0")
            .expect_err("zero record limit should fail");

        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn record_limit_above_decode_limit_is_rejected() {
        let err = EngineConfig::default()
            .with_max_record_bytes(DEFAULT_MAX_RECORD_BYTES + 1)
            .validate()
            .expect_err("record limit above decode limit should fail");
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = EngineConfig::from_toml_str("max_record_bytes = 8388608")
            .expect_err("8 MiB record limit should fail");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = EngineConfig::from_toml_str("compaction = true")
            .expect_err("unknown field should fail");

        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
