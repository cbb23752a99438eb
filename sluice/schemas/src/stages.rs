//! Per-stage configuration for the ingest, load and transform pipelines.

use crate::csv::CsvOptions;
use crate::error::ConfigError;
use crate::serde_helpers::{default_extension, default_prefix};
use crate::warehouse::WriteMode;
use bon::Builder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Configuration of the ingest stage (local directory → object store).
///
/// # Examples
///
/// ```
/// use sluice_schemas::IngestConfig;
///
/// let config = IngestConfig::builder()
///     .source_dir("data/raw/olist".into())
///     .build();
///
/// assert_eq!(config.prefix, "raw/");
/// assert_eq!(config.object_key("orders.csv"), "raw/orders.csv");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[serde(rename_all = "snake_case")]
pub struct IngestConfig {
    /// Directory scanned (non recursively) for CSV files
    pub source_dir: PathBuf,

    /// Prefix prepended verbatim to every file name to form the object key
    #[serde(default = "default_prefix")]
    #[builder(default = default_prefix())]
    pub prefix: String,

    /// File extension to pick up, compared case-insensitively and without the dot
    #[serde(default = "default_extension")]
    #[builder(default = default_extension())]
    pub extension: String,
}

impl IngestConfig {
    /// Object key for a source file name
    pub fn object_key(&self, file_name: &str) -> String {
        format!("{}{}", self.prefix, file_name)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_extension(&self.extension)
    }
}

/// Configuration of the load stage (object store → warehouse tables).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[serde(rename_all = "snake_case")]
pub struct LoadConfig {
    /// Only keys starting with this prefix are loaded
    #[serde(default = "default_prefix")]
    #[builder(default = default_prefix())]
    pub prefix: String,

    /// Key extension to pick up, compared case-insensitively and without the dot
    #[serde(default = "default_extension")]
    #[builder(default = default_extension())]
    pub extension: String,

    /// Policy for existing destination tables
    #[serde(default)]
    #[builder(default)]
    pub write_mode: WriteMode,

    /// CSV parsing options
    #[serde(default)]
    #[builder(default)]
    pub csv: CsvOptions,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl LoadConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_extension(&self.extension)?;
        self.csv.validate()
    }
}

/// Layer of the warehouse a transform script builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    /// Normalized copies of the raw tables
    Silver,
    /// Validation views and checks over the silver layer
    DataQuality,
    /// Aggregated reporting tables
    Gold,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layer::Silver => write!(f, "silver"),
            Layer::DataQuality => write!(f, "data_quality"),
            Layer::Gold => write!(f, "gold"),
        }
    }
}

/// A named SQL script inside the transform directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TransformScript {
    pub layer: Layer,
    pub file_name: String,
}

impl TransformScript {
    pub fn new(layer: Layer, file_name: impl Into<String>) -> Self {
        Self {
            layer,
            file_name: file_name.into(),
        }
    }
}

fn default_scripts() -> Vec<TransformScript> {
    vec![
        TransformScript::new(Layer::Silver, "olist_silver.sql"),
        TransformScript::new(Layer::DataQuality, "olist_data_quality.sql"),
        TransformScript::new(Layer::Gold, "olist_gold.sql"),
    ]
}

/// Configuration of the transform stage.
///
/// Scripts run in the listed order, the default order is silver, data quality, gold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[serde(rename_all = "snake_case")]
pub struct TransformConfig {
    /// Directory holding the SQL scripts
    pub sql_dir: PathBuf,

    /// Scripts in execution order
    #[serde(default = "default_scripts")]
    #[builder(default = default_scripts())]
    pub scripts: Vec<TransformScript>,
}

impl TransformConfig {
    /// Paths of the configured scripts in execution order
    pub fn script_paths(&self) -> impl Iterator<Item = (Layer, PathBuf)> + '_ {
        self.scripts
            .iter()
            .map(|script| (script.layer, self.sql_dir.join(&script.file_name)))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scripts.is_empty() {
            return Err(ConfigError::NoScripts);
        }

        match self
            .scripts
            .iter()
            .find(|script| script.file_name.trim().is_empty())
        {
            Some(script) => Err(ConfigError::EmptyScriptName(script.layer.to_string())),
            None => Ok(()),
        }
    }
}

fn validate_extension(extension: &str) -> Result<(), ConfigError> {
    if extension.trim_start_matches('.').is_empty() {
        Err(ConfigError::EmptyExtension)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_key_is_plain_concatenation() {
        let config = IngestConfig::builder()
            .source_dir("data".into())
            .prefix("olist".to_string())
            .build();

        assert_eq!(config.object_key("orders.csv"), "olistorders.csv");
    }

    #[test]
    fn default_scripts_run_silver_quality_gold() {
        let config = TransformConfig::builder()
            .sql_dir("postgres_queries".into())
            .build();

        let paths = config.script_paths().collect::<Vec<_>>();
        assert_eq!(
            paths,
            vec![
                (
                    Layer::Silver,
                    PathBuf::from("postgres_queries/olist_silver.sql")
                ),
                (
                    Layer::DataQuality,
                    PathBuf::from("postgres_queries/olist_data_quality.sql")
                ),
                (Layer::Gold, PathBuf::from("postgres_queries/olist_gold.sql")),
            ]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn transform_validation() {
        let config = TransformConfig::builder()
            .sql_dir("sql".into())
            .scripts(vec![])
            .build();
        assert_eq!(config.validate(), Err(ConfigError::NoScripts));

        let config = TransformConfig::builder()
            .sql_dir("sql".into())
            .scripts(vec![TransformScript::new(Layer::Gold, " ")])
            .build();
        assert_eq!(
            config.validate(),
            Err(ConfigError::EmptyScriptName("gold".to_string()))
        );
    }

    #[test]
    fn load_config_defaults_from_json() {
        let config: LoadConfig = serde_json::from_str(r#"{"write_mode": "append"}"#).unwrap();
        assert_eq!(config.prefix, "raw/");
        assert_eq!(config.extension, "csv");
        assert_eq!(config.write_mode, WriteMode::Append);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_extension_is_rejected() {
        let config = IngestConfig::builder()
            .source_dir("data".into())
            .extension(".".to_string())
            .build();
        assert_eq!(config.validate(), Err(ConfigError::EmptyExtension));
    }
}
