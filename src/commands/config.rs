use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::sql_engine::script::DEFAULT_MARKER;
use crate::sql_engine::{ExtractorOptions, Flavor};

pub const DEFAULT_CONFIG_FILE: &str = "lineage_project.yaml";

/// Project configuration read from lineage_project.yaml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineageConfig {
    /// Name of the project
    #[serde(default = "default_name")]
    pub name: String,

    /// sqlparser dialect used to tokenize every job
    #[serde(default = "default_dialect")]
    pub dialect: String,

    /// Keep three-segment `catalog.schema.table` names
    #[serde(default)]
    pub catalog_aware: bool,

    /// Directory scanned by `lineage` when no path is given
    #[serde(default = "default_sql_path")]
    pub sql_path: String,

    /// File extensions scanned for jobs
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Line marking the start of embedded SQL in job scripts
    #[serde(default = "default_script_marker")]
    pub script_marker: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Target table per job file stem, for jobs whose SQL names no target
    #[serde(default)]
    pub targets: HashMap<String, String>,
}

fn default_name() -> String {
    "lineage_project".to_string()
}

fn default_dialect() -> String {
    "generic".to_string()
}

fn default_sql_path() -> String {
    "jobs".to_string()
}

fn default_extensions() -> Vec<String> {
    vec!["sql".to_string(), "py".to_string()]
}

fn default_script_marker() -> String {
    DEFAULT_MARKER.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LineageConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            dialect: default_dialect(),
            catalog_aware: false,
            sql_path: default_sql_path(),
            extensions: default_extensions(),
            script_marker: default_script_marker(),
            log_level: default_log_level(),
            targets: HashMap::new(),
        }
    }
}

impl LineageConfig {
    pub fn extractor_options(&self) -> ExtractorOptions {
        let flavor = if self.catalog_aware {
            Flavor::CatalogAware
        } else {
            Flavor::Base
        };
        ExtractorOptions {
            flavor,
            dialect: self.dialect.clone(),
        }
    }

    /// Configured target override for a job file stem
    pub fn target_for(&self, stem: &str) -> Option<&str> {
        self.targets.get(stem).map(String::as_str)
    }

    /// Whether a file extension is scanned, ignoring case and a leading dot
    pub fn accepts_extension(&self, extension: &str) -> bool {
        self.extensions
            .iter()
            .any(|accepted| accepted.trim_start_matches('.').eq_ignore_ascii_case(extension))
    }
}

/// Reads the configuration file from the specified path or looks for
/// lineage_project.yaml in the current directory.
///
/// An explicit path must exist; a missing default file yields the default
/// configuration.
pub fn read_config(config_path: Option<&Path>) -> Result<LineageConfig> {
    let config_path: PathBuf = match config_path {
        Some(path) => {
            if !path.exists() {
                bail!("Configuration file not found at: {}", path.display());
            }
            path.to_path_buf()
        }
        None => {
            let current_dir = std::env::current_dir().context("Failed to read current directory")?;
            let path = current_dir.join(DEFAULT_CONFIG_FILE);
            if !path.exists() {
                log::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                return Ok(LineageConfig::default());
            }
            path
        }
    };

    let config_str = std::fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
    parse_config(&config_str)
        .with_context(|| format!("Failed to parse config file: {}", config_path.display()))
}

pub fn parse_config(config_str: &str) -> Result<LineageConfig> {
    let config: LineageConfig = serde_yaml::from_str(config_str)?;
    Ok(config)
}
