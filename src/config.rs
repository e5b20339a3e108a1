use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::graph::{BuildOptions, EntityFilter, RelationTypes};
use crate::render::OutputFormat;
use crate::schema::RelationKind;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub modelgraph: ModelgraphConfig,
    pub schema: SchemaConfig,
    pub graph: GraphConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// General settings
#[derive(Debug, Clone, Deserialize)]
pub struct ModelgraphConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ModelgraphConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Where field metadata comes from
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaConfig {
    /// JSON or YAML schema dump
    pub path: PathBuf,
}

/// Traversal settings
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    pub root: String,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default)]
    pub blacklist: Vec<String>,
    #[serde(default)]
    pub whitelist: Vec<String>,
    #[serde(default = "default_relation_types")]
    pub relation_types: Vec<RelationKind>,
}

/// Rendering settings
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_format")]
    pub format: String,
    /// Output file; stdout when absent
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            path: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_depth() -> usize {
    1
}

fn default_relation_types() -> Vec<RelationKind> {
    RelationKind::ALL.to_vec()
}

fn default_format() -> String {
    "dot".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in MODELGRAPH_CONFIG environment variable
    /// 2. ./modelgraph.toml in current directory
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let config_path = std::env::var("MODELGRAPH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("modelgraph.toml"));

        Self::load_from(&config_path)
    }

    /// Load and validate a specific config file
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.graph.root.trim().is_empty() {
            anyhow::bail!("graph.root must name a model");
        }

        if !self.graph.blacklist.is_empty() && !self.graph.whitelist.is_empty() {
            anyhow::bail!("graph.blacklist and graph.whitelist can not be set simultaneously");
        }

        if !self.schema.path.is_file() {
            anyhow::bail!(
                "schema path does not exist or is not a file: {}",
                self.schema.path.display()
            );
        }

        self.output_format()?;

        Ok(())
    }

    /// Traversal options described by the `[graph]` section
    pub fn build_options(&self) -> Result<BuildOptions> {
        let filter = EntityFilter::from_lists(
            self.graph.blacklist.iter().cloned(),
            self.graph.whitelist.iter().cloned(),
        )?;
        let relation_types: RelationTypes = self.graph.relation_types.iter().copied().collect();
        Ok(BuildOptions::new(self.graph.max_depth)
            .with_filter(filter)
            .with_relation_types(relation_types))
    }

    pub fn output_format(&self) -> Result<OutputFormat> {
        Ok(self.output.format.parse::<OutputFormat>()?)
    }

    pub fn schema_path(&self) -> &Path {
        &self.schema.path
    }
}
