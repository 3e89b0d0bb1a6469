//! # Configuration
//!
//! Engine settings with serde support and non-failing validation.
//!
//! Every section and field has a default, so an empty TOML document is a
//! valid configuration. [`EngineConfig::validate`] collects human-readable
//! problems instead of failing on the first one;
//! [`EngineConfig::validate_strict`] turns any problem into an error for
//! startup paths that must not proceed misconfigured.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::codec::DEFAULT_MAX_FRAME_LEN;
use crate::error::{ProtocolError, Result};

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub codec: CodecConfig,
    pub dispatch: DispatchConfig,
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ProtocolError::ConfigError(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&raw)
    }

    /// Parses configuration from a TOML document.
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| ProtocolError::ConfigError(e.to_string()))
    }

    /// Collects every problem with this configuration.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        self.codec.validate(&mut problems);
        self.dispatch.validate(&mut problems);
        self.logging.validate(&mut problems);
        problems
    }

    /// Fails with [`ProtocolError::ConfigError`] unless
    /// [`validate`](Self::validate) comes back clean.
    pub fn validate_strict(&self) -> Result<()> {
        let problems = self.validate();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(problems.join("; ")))
        }
    }
}

/// Framing and buffering limits for packet streams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Largest accepted frame body (id + payload), in bytes.
    pub max_frame_len: usize,
    /// Initial capacity of each stream's receive buffer.
    pub read_buffer_capacity: usize,
    /// Initial capacity of each stream's staging buffer.
    pub write_buffer_capacity: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            read_buffer_capacity: 8 * 1024,
            write_buffer_capacity: 8 * 1024,
        }
    }
}

impl CodecConfig {
    fn validate(&self, problems: &mut Vec<String>) {
        if self.max_frame_len == 0 {
            problems.push("codec.max_frame_len must be at least 1".into());
        }
        if self.max_frame_len > i32::MAX as usize {
            problems.push("codec.max_frame_len cannot exceed the i32 length prefix range".into());
        }
        if self.read_buffer_capacity == 0 {
            problems.push("codec.read_buffer_capacity must be nonzero".into());
        }
        if self.write_buffer_capacity == 0 {
            problems.push("codec.write_buffer_capacity must be nonzero".into());
        }
    }
}

/// Handler execution policy for event pipelines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Run large handler sets as concurrent tasks instead of a loop.
    pub parallel: bool,
    /// Handler count at which a phase switches to parallel execution.
    pub min_parallel_handlers: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            min_parallel_handlers: 4,
        }
    }
}

impl DispatchConfig {
    fn validate(&self, problems: &mut Vec<String>) {
        if self.min_parallel_handlers < 2 {
            problems.push("dispatch.min_parallel_handlers must be at least 2".into());
        }
    }
}

/// Log output settings consumed by [`crate::utils::logging::init`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridable by `RUST_LOG`. Accepts plain
    /// levels (`info`) or target filters (`gamewire=debug`).
    pub level: String,
    /// Include span targets in log lines.
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            include_target: true,
        }
    }
}

impl LoggingConfig {
    fn validate(&self, problems: &mut Vec<String>) {
        if self.level.trim().is_empty() {
            problems.push("logging.level must not be empty".into());
        }
    }
}
