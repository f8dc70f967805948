//! Object store configuration via `objects.toml`
//!
//! Settings shared by every record type built against one store. A default
//! file with comments can be written on first use; edit it and reload to
//! change behavior.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use strata_core::{Error, Result};
use strata_index::Tokenizer;
use strata_storage::ExecMode;

/// Config file name
pub const CONFIG_FILE_NAME: &str = "objects.toml";

fn default_id_batch_size() -> u64 {
    100
}

fn default_transactional_saves() -> bool {
    true
}

fn default_intersection_ttl_ms() -> u64 {
    60_000
}

fn default_fulltext_delimiter() -> String {
    " ".to_string()
}

/// Object store configuration loaded from `objects.toml`
///
/// # Example
///
/// ```toml
/// id_batch_size = 100
/// transactional_saves = true
/// intersection_ttl_ms = 60000
/// fulltext_delimiter = " "
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    /// Ids reserved per id-generator round trip.
    #[serde(default = "default_id_batch_size")]
    pub id_batch_size: u64,
    /// Wrap save, update and delete batches in a store transaction.
    #[serde(default = "default_transactional_saves")]
    pub transactional_saves: bool,
    /// Lifetime of full-text intersection keys, in milliseconds.
    #[serde(default = "default_intersection_ttl_ms")]
    pub intersection_ttl_ms: u64,
    /// Delimiter for full-text indexes without their own tokenizer.
    #[serde(default = "default_fulltext_delimiter")]
    pub fulltext_delimiter: String,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            id_batch_size: default_id_batch_size(),
            transactional_saves: default_transactional_saves(),
            intersection_ttl_ms: default_intersection_ttl_ms(),
            fulltext_delimiter: default_fulltext_delimiter(),
        }
    }
}

impl ObjectStoreConfig {
    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// `Error::Config` for a zero batch size, a zero TTL or an empty delimiter.
    pub fn validate(&self) -> Result<()> {
        if self.id_batch_size == 0 {
            return Err(Error::Config("id_batch_size must be at least 1".to_string()));
        }
        if self.intersection_ttl_ms == 0 {
            return Err(Error::Config(
                "intersection_ttl_ms must be at least 1".to_string(),
            ));
        }
        if self.fulltext_delimiter.is_empty() {
            return Err(Error::Config(
                "fulltext_delimiter must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Execution mode for record write batches.
    pub fn write_mode(&self) -> ExecMode {
        if self.transactional_saves {
            ExecMode::Transaction
        } else {
            ExecMode::Pipeline
        }
    }

    /// Intersection key lifetime as a `Duration`.
    pub fn intersection_ttl(&self) -> Duration {
        Duration::from_millis(self.intersection_ttl_ms)
    }

    /// Tokenizer for full-text indexes without their own.
    pub fn tokenizer(&self) -> Tokenizer {
        Tokenizer::new(self.fulltext_delimiter.as_str())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Strata object store configuration
#
# Ids reserved per id-generator round trip (default: 100).
# 1 gives gap-free ids at the cost of one round trip per id.
id_batch_size = 100

# Wrap save, update and delete batches in a store transaction (default: true).
transactional_saves = true

# Lifetime of full-text intersection keys in milliseconds (default: 60000).
intersection_ttl_ms = 60000

# Delimiter for full-text indexes without their own tokenizer (default: " ").
fulltext_delimiter = " "
"#
    }

    /// Parse and validate config from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ObjectStoreConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{} ({})", msg, path.display())),
            other => other,
        })
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::Config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::Config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
