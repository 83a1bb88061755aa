//! Run configuration snapshot.
//!
//! A [`RunConfig`] is loaded once (or built in code) and handed to the run by
//! value. Nothing in this crate reads process-wide configuration behind the
//! caller's back; the values a run used are exactly the ones in its snapshot.

use crate::error::ForgeError;
use crate::manifest::PendingMetric;
use crate::schema::SchemaHashStore;
use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Deployment environment a run executes in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Dev,
    Test,
    Prod,
}

impl Environment {
    pub const ALL: [Self; 3] = [Self::Dev, Self::Test, Self::Prod];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Test => "test",
            Self::Prod => "prod",
        }
    }

    /// Infer the environment from an env file name such as `prod.sales.env`.
    ///
    /// The first dot-separated segment of the file name decides; anything that
    /// is not `dev`, `test` or `prod` falls back to [`Environment::Dev`].
    pub fn from_config_path(path: &Path) -> Self {
        path.file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.split_once('.'))
            .and_then(|(prefix, _)| prefix.parse().ok())
            .unwrap_or_default()
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|env| env.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| anyhow::anyhow!("Unknown environment '{s}' (expected dev, test or prod)"))
    }
}

/// Immutable settings for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Title recorded in the run manifest
    pub report_title: String,

    /// Explicit environment; inferred from `config_path` when absent
    pub environment: Option<Environment>,

    /// Path of the configuration the run was started with
    pub config_path: PathBuf,

    /// Working directory; schema hash archives live in `<working_dir>/archives`
    pub working_dir: PathBuf,

    /// File extension for dataset outputs
    pub output_extension: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            report_title: "Untitled report".to_owned(),
            environment: None,
            config_path: PathBuf::new(),
            working_dir: PathBuf::from("."),
            output_extension: crate::manifest::metric::DEFAULT_OUTPUT_EXTENSION.to_owned(),
        }
    }
}

impl RunConfig {
    /// Load a configuration snapshot from a JSON file.
    ///
    /// `config_path` defaults to the file that was loaded.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, is not valid JSON, or fails
    /// [`RunConfig::validate`].
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read run config from {}", path.display()))?;

        let mut config: Self =
            serde_json::from_str(&contents).context("Failed to parse run config JSON")?;

        if config.config_path.as_os_str().is_empty() {
            config.config_path = path.to_path_buf();
        }

        config
            .validate()
            .with_context(|| format!("Invalid run config {}", path.display()))?;

        Ok(config)
    }

    /// Check the values a run cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::Config`] for an empty report title or working
    /// directory, or an output extension that is empty or contains a path
    /// separator.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.report_title.trim().is_empty() {
            return Err(ForgeError::Config("report_title is empty".to_owned()));
        }
        if self.working_dir.as_os_str().is_empty() {
            return Err(ForgeError::Config("working_dir is empty".to_owned()));
        }

        let extension = self.output_extension.trim().trim_start_matches('.');
        if extension.is_empty() || extension.contains(['/', '\\']) {
            return Err(ForgeError::Config(format!(
                "output_extension '{}' is not a file extension",
                self.output_extension
            )));
        }
        Ok(())
    }

    /// Save configuration to disk
    ///
    /// # Errors
    ///
    /// Returns error if the parent directory or the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize run config")?;

        std::fs::write(path, json)
            .with_context(|| format!("Failed to write run config to {}", path.display()))?;

        Ok(())
    }

    /// Effective environment for the run.
    pub fn environment(&self) -> Environment {
        self.environment
            .unwrap_or_else(|| Environment::from_config_path(&self.config_path))
    }

    /// Hash store rooted at the configured working directory.
    pub fn hash_store(&self) -> SchemaHashStore {
        SchemaHashStore::new(&self.working_dir)
    }

    /// Start a dataset metric whose output file uses the configured extension.
    ///
    /// # Errors
    ///
    /// See [`PendingMetric::new`] and [`PendingMetric::with_output_extension`].
    pub fn pending_metric(
        &self,
        name: &str,
        row_count: u64,
        duration_ms: f64,
        output_dir: &Path,
    ) -> crate::error::Result<PendingMetric> {
        PendingMetric::new(name, row_count, duration_ms, output_dir)?
            .with_output_extension(&self.output_extension)
    }
}
