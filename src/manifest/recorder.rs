//! Recording one processed dataset into a manifest.
//!
//! For each dataset the steps are: fingerprint the columns, rotate the hash
//! store for the dataset's output directory, attach the finished metric. A
//! failure in any step is reported as a manifest warning and returned to the
//! caller; other datasets and the run's `success` flag are left alone.

use crate::error::{ForgeError, Result};
use crate::manifest::metric::{DatasetMetric, PendingMetric, SchemaStatus};
use crate::manifest::run::RunManifest;
use crate::manifest::shared::SharedManifest;
use crate::schema::{ColumnDescriptor, SchemaHashStore, fingerprint};
use tracing::info;

fn complete(
    store: &SchemaHashStore,
    pending: PendingMetric,
    columns: &[ColumnDescriptor],
) -> Result<DatasetMetric> {
    let digest = fingerprint(pending.name(), columns)?;
    if digest.is_empty() {
        return Err(ForgeError::MalformedInput(format!(
            "dataset '{}' has no columns to fingerprint",
            pending.name()
        )));
    }
    pending.finalize(store, digest)
}

/// Where recorded datasets and warnings go.
trait ManifestSink {
    fn push_dataset(&mut self, metric: DatasetMetric);
    fn push_warning(&mut self, message: String);
}

impl ManifestSink for RunManifest {
    fn push_dataset(&mut self, metric: DatasetMetric) {
        self.add_dataset(metric);
    }

    fn push_warning(&mut self, message: String) {
        self.add_warning(message);
    }
}

impl ManifestSink for &SharedManifest {
    fn push_dataset(&mut self, metric: DatasetMetric) {
        self.add_dataset(metric);
    }

    fn push_warning(&mut self, message: String) {
        self.add_warning(message);
    }
}

fn record_into(
    sink: &mut impl ManifestSink,
    store: &SchemaHashStore,
    pending: PendingMetric,
    columns: &[ColumnDescriptor],
) -> Result<SchemaStatus> {
    let name = pending.name().to_owned();

    match complete(store, pending, columns) {
        Ok(metric) => {
            let status = metric.schema_status();
            if status == SchemaStatus::Changed {
                sink.push_warning(format!("Schema changed for '{name}'"));
            }
            info!("Recorded dataset '{name}' ({status:?}, {} rows)", metric.row_count());
            sink.push_dataset(metric);
            Ok(status)
        }
        Err(e) => {
            sink.push_warning(format!("Dataset '{name}' not recorded: {e}"));
            Err(e)
        }
    }
}

/// Fingerprint, rotate and append one dataset.
///
/// # Returns
///
/// The schema status of the recorded dataset.
///
/// # Errors
///
/// Returns the first failing step's error after adding a warning of the form
/// `Dataset '<name>' not recorded: <error>` to `manifest`.
pub fn record_dataset(
    manifest: &mut RunManifest,
    store: &SchemaHashStore,
    pending: PendingMetric,
    columns: &[ColumnDescriptor],
) -> Result<SchemaStatus> {
    record_into(manifest, store, pending, columns)
}

/// Same as [`record_dataset`] for a manifest shared between threads.
///
/// Hashing and file I/O happen outside the lock; only the appends take it.
///
/// # Errors
///
/// See [`record_dataset`].
pub fn record_dataset_shared(
    manifest: &SharedManifest,
    store: &SchemaHashStore,
    pending: PendingMetric,
    columns: &[ColumnDescriptor],
) -> Result<SchemaStatus> {
    let mut sink = manifest;
    record_into(&mut sink, store, pending, columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use tempfile::TempDir;

    fn columns(dataset: &str, amount_type: &str) -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::new(dataset, "id", "Int64", false),
            ColumnDescriptor::new(dataset, "amount", amount_type, true),
        ]
    }

    #[test]
    fn test_record_dataset_detects_change() {
        let temp = TempDir::new().unwrap();
        let store = SchemaHashStore::new(temp.path());
        let dir = temp.path().join("sales");

        let mut run1 = RunManifest::new("Weekly", Environment::Dev, "");
        let pending = PendingMetric::new("Sales", 10, 3.0, &dir).unwrap();
        let status = record_dataset(&mut run1, &store, pending, &columns("Sales", "Decimal"));
        assert_eq!(status.unwrap(), SchemaStatus::FirstRun);
        assert!(run1.warnings().is_empty());

        let mut run2 = RunManifest::new("Weekly", Environment::Dev, "");
        let pending = PendingMetric::new("Sales", 12, 3.0, &dir).unwrap();
        let status = record_dataset(&mut run2, &store, pending, &columns("Sales", "Double"));
        assert_eq!(status.unwrap(), SchemaStatus::Changed);
        assert_eq!(run2.warnings(), ["Schema changed for 'Sales'"]);
        assert!(run2.success());
    }

    #[test]
    fn test_failure_isolated_to_dataset() {
        let temp = TempDir::new().unwrap();
        let store = SchemaHashStore::new(temp.path());
        let mut manifest = RunManifest::new("Weekly", Environment::Dev, "");

        let ok = PendingMetric::new("Orders", 1, 1.0, temp.path().join("orders")).unwrap();
        record_dataset(&mut manifest, &store, ok, &columns("Orders", "Decimal")).unwrap();

        let broken = PendingMetric::new("Sales", 1, 1.0, temp.path().join("sales")).unwrap();
        let bad_columns = vec![ColumnDescriptor::new("Sales", "", "Int64", false)];
        let err = record_dataset(&mut manifest, &store, broken, &bad_columns).unwrap_err();

        assert!(matches!(err, ForgeError::MalformedInput(_)));
        assert_eq!(manifest.datasets().len(), 1);
        assert_eq!(manifest.warnings().len(), 1);
        assert!(manifest.warnings()[0].starts_with("Dataset 'Sales' not recorded"));
        assert!(manifest.success());
        assert!(
            !SchemaHashStore::hash_path(&temp.path().join("sales")).exists(),
            "nothing written for the rejected dataset"
        );
    }

    #[test]
    fn test_empty_schema_not_recorded() {
        let temp = TempDir::new().unwrap();
        let store = SchemaHashStore::new(temp.path());
        let mut manifest = RunManifest::new("Weekly", Environment::Dev, "");

        let pending = PendingMetric::new("Empty", 0, 0.0, temp.path().join("empty")).unwrap();
        assert!(record_dataset(&mut manifest, &store, pending, &[]).is_err());
        assert!(manifest.datasets().is_empty());
    }

    #[test]
    fn test_record_dataset_shared() {
        let temp = TempDir::new().unwrap();
        let store = SchemaHashStore::new(temp.path());
        let shared = SharedManifest::new(RunManifest::new("Weekly", Environment::Dev, ""));

        let pending = PendingMetric::new("Sales", 5, 2.0, temp.path().join("sales")).unwrap();
        let status =
            record_dataset_shared(&shared, &store, pending, &columns("Sales", "Decimal")).unwrap();

        assert_eq!(status, SchemaStatus::FirstRun);
        assert_eq!(shared.read(|m| m.datasets().len()), 1);
    }
}
