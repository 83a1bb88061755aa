//! Per-dataset metrics.
//!
//! A metric is built in two stages. [`PendingMetric`] holds what the query
//! layer knows (name, row count, duration, output location). Calling
//! [`PendingMetric::finalize`] rotates the schema hash store for the output
//! directory and yields a [`DatasetMetric`] carrying both the previous and the
//! current digest. The previous digest is read before the new one is written,
//! so the metric always captures the state it replaced.

use crate::error::{ForgeError, Result, ResultExt as _};
use crate::schema::{SchemaDigest, SchemaHashStore};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Extension used for dataset output files unless configured otherwise.
pub const DEFAULT_OUTPUT_EXTENSION: &str = "parquet";

/// Strip every character outside `[A-Za-z0-9.\s_-]`.
///
/// Case and whitespace are kept as-is, and applying it twice changes nothing.
///
/// ```
/// use reportforge::manifest::sanitize_name;
///
/// assert_eq!(sanitize_name("Sales Q1 (2024)"), "Sales Q1 2024");
/// assert_eq!(sanitize_name("a/b:c"), "abc");
/// ```
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|&c| {
            c.is_ascii_alphanumeric() || c.is_whitespace() || matches!(c, '.' | '_' | '-')
        })
        .collect()
}

/// How a dataset's schema compares with the previous run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaStatus {
    /// No digest was recorded before this run
    FirstRun,
    Unchanged,
    /// The digest differs from the previous run's
    Changed,
}

/// Metric for a dataset whose schema digest has not been recorded yet.
#[derive(Debug, Clone)]
pub struct PendingMetric {
    name: String,
    row_count: u64,
    duration_ms: f64,
    output_dir: PathBuf,
    output_path: PathBuf,
}

impl PendingMetric {
    /// Start a metric for one processed dataset.
    ///
    /// The output path is `output_dir/<sanitized name>.parquet`.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::MalformedInput`] if the duration is negative or not
    /// finite, or if nothing usable is left of the name after sanitizing.
    pub fn new(
        name: impl Into<String>,
        row_count: u64,
        duration_ms: f64,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let name = name.into();
        if !duration_ms.is_finite() || duration_ms < 0.0 {
            return Err(ForgeError::MalformedInput(format!(
                "dataset '{name}' has invalid duration {duration_ms} ms"
            )));
        }

        let output_dir = output_dir.into();
        let output_path = output_file(&name, &output_dir, DEFAULT_OUTPUT_EXTENSION)?;

        Ok(Self {
            name,
            row_count,
            duration_ms,
            output_dir,
            output_path,
        })
    }

    /// Use a different output file extension (without the leading dot).
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::MalformedInput`] for an empty extension.
    pub fn with_output_extension(mut self, extension: &str) -> Result<Self> {
        let extension = extension.trim().trim_start_matches('.');
        if extension.is_empty() {
            return Err(ForgeError::MalformedInput(
                "output extension is empty".to_owned(),
            ));
        }
        self.output_path = output_file(&self.name, &self.output_dir, extension)?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Record `current` in the hash store and complete the metric.
    ///
    /// # Errors
    ///
    /// Propagates store failures; the pending metric is consumed either way and
    /// nothing is attached to any manifest.
    pub fn finalize(self, store: &SchemaHashStore, current: SchemaDigest) -> Result<DatasetMetric> {
        let rotation = store
            .rotate(&self.output_dir, &current)
            .with_context(|| format!("dataset '{}'", self.name))?;

        let metric = DatasetMetric {
            name: self.name,
            row_count: self.row_count,
            duration_ms: self.duration_ms,
            output_path: self.output_path,
            previous_schema_digest: rotation.previous,
            current_schema_digest: current,
        };

        if metric.schema_status() == SchemaStatus::Changed {
            warn!(
                "Schema of '{}' changed: {} -> {}",
                metric.name,
                metric
                    .previous_schema_digest
                    .as_ref()
                    .map_or("", SchemaDigest::as_str),
                metric.current_schema_digest
            );
        }

        Ok(metric)
    }
}

fn output_file(name: &str, output_dir: &Path, extension: &str) -> Result<PathBuf> {
    let stem = sanitize_name(name);
    if stem.trim().trim_matches('.').is_empty() {
        return Err(ForgeError::MalformedInput(format!(
            "dataset name '{name}' has no filesystem-safe characters"
        )));
    }
    Ok(output_dir.join(format!("{stem}.{extension}")))
}

/// Completed record of one dataset in a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetric {
    name: String,
    row_count: u64,
    duration_ms: f64,
    output_path: PathBuf,
    previous_schema_digest: Option<SchemaDigest>,
    current_schema_digest: SchemaDigest,
}

impl DatasetMetric {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn previous_schema_digest(&self) -> Option<&SchemaDigest> {
        self.previous_schema_digest.as_ref()
    }

    pub fn current_schema_digest(&self) -> &SchemaDigest {
        &self.current_schema_digest
    }

    pub fn schema_status(&self) -> SchemaStatus {
        match &self.previous_schema_digest {
            None => SchemaStatus::FirstRun,
            Some(previous) if *previous == self.current_schema_digest => SchemaStatus::Unchanged,
            Some(_) => SchemaStatus::Changed,
        }
    }

    /// True when a previous digest exists and differs from the current one.
    pub fn schema_changed(&self) -> bool {
        self.schema_status() == SchemaStatus::Changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::digest_text;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Sales Q1 (2024)"), "Sales Q1 2024");
        assert_eq!(sanitize_name("orders_v2-final.bak"), "orders_v2-final.bak");
        assert_eq!(sanitize_name("über*report?"), "berreport");
    }

    #[test]
    fn test_sanitize_idempotent() {
        for name in ["Sales Q1 (2024)", "a/b\\c", "  spaced  out ", "ümlaut", "", "x|y"] {
            let once = sanitize_name(name);
            assert_eq!(sanitize_name(&once), once, "not idempotent for {name:?}");
        }
    }

    #[test]
    fn test_output_path_derivation() {
        let pending = PendingMetric::new("Sales Q1 (2024)", 10, 5.0, "/out/sales").unwrap();
        assert_eq!(
            pending.output_path(),
            Path::new("/out/sales/Sales Q1 2024.parquet")
        );

        let csv = pending.with_output_extension(".csv").unwrap();
        assert_eq!(csv.output_path(), Path::new("/out/sales/Sales Q1 2024.csv"));
    }

    #[test]
    fn test_pending_rejects_bad_input() {
        assert!(PendingMetric::new("sales", 1, -1.0, "/out").is_err());
        assert!(PendingMetric::new("sales", 1, f64::NAN, "/out").is_err());
        assert!(PendingMetric::new("(/)", 1, 1.0, "/out").is_err());
    }

    #[test]
    fn test_finalize_first_then_unchanged_then_changed() {
        let temp = TempDir::new().unwrap();
        let store = SchemaHashStore::new(temp.path());
        let output_dir = temp.path().join("sales");
        let (v1, v2) = (digest_text("v1"), digest_text("v2"));

        let first = PendingMetric::new("Sales", 3, 1.5, &output_dir)
            .unwrap()
            .finalize(&store, v1.clone())
            .unwrap();
        assert_eq!(first.schema_status(), SchemaStatus::FirstRun);
        assert!(first.previous_schema_digest().is_none());

        let second = PendingMetric::new("Sales", 3, 1.5, &output_dir)
            .unwrap()
            .finalize(&store, v1.clone())
            .unwrap();
        assert_eq!(second.schema_status(), SchemaStatus::Unchanged);
        assert_eq!(second.previous_schema_digest(), Some(&v1));
        assert!(!second.schema_changed());

        let third = PendingMetric::new("Sales", 3, 1.5, &output_dir)
            .unwrap()
            .finalize(&store, v2.clone())
            .unwrap();
        assert!(third.schema_changed());
        assert_eq!(third.previous_schema_digest(), Some(&v1));
        assert_eq!(third.current_schema_digest(), &v2);
    }
}
