//! Persistence of closed manifests as JSON documents.

use crate::error::{ForgeError, Result, ResultExt as _};
use crate::manifest::run::ClosedManifest;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name of the manifest inside a run's output directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Write `manifest` to `dir/manifest.json`, creating `dir` if needed.
///
/// # Returns
///
/// Path to the saved JSON file.
///
/// # Errors
///
/// Returns [`ForgeError::Storage`] if the directory or file cannot
/// be written.
pub fn save_manifest(manifest: &ClosedManifest, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create manifest directory {}", dir.display()))?;

    let path = dir.join(MANIFEST_FILE);
    let json = serde_json::to_string_pretty(manifest).context("Failed to serialize manifest")?;

    fs::write(&path, json)
        .with_context(|| format!("Failed to write manifest {}", path.display()))?;

    info!("Saved manifest for run {} to {}", manifest.run_id(), path.display());
    Ok(path)
}

/// Load a manifest previously written by [`save_manifest`].
///
/// # Errors
///
/// Returns [`ForgeError::NotFound`] if there is no file at `path`, and a
/// storage or serialization error if it cannot be read or does not parse.
pub fn load_manifest(path: &Path) -> Result<ClosedManifest> {
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ForgeError::NotFound(format!("manifest {}", path.display())));
        }
        Err(e) => {
            return Err(e)
                .with_context(|| format!("Failed to read manifest file: {}", path.display()));
        }
    };

    serde_json::from_str(&json).context("Failed to deserialize manifest")
}

impl ClosedManifest {
    /// Convenience for [`save_manifest`].
    ///
    /// # Errors
    ///
    /// See [`save_manifest`].
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        save_manifest(self, dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use crate::manifest::metric::PendingMetric;
    use crate::manifest::run::RunManifest;
    use crate::schema::{SchemaHashStore, digest_text};
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load_manifest() -> Result<()> {
        let temp_dir = tempdir()?;
        let store = SchemaHashStore::new(temp_dir.path());

        let mut manifest = RunManifest::new("Weekly Sales", Environment::Prod, "prod.env");
        let metric = PendingMetric::new("Sales", 42, 120.0, temp_dir.path().join("sales"))?
            .finalize(&store, digest_text("sales schema"))?;
        manifest.add_dataset(metric);
        manifest.add_warning("Column 'X' missing");
        let closed = manifest.finalize();

        let path = closed.save(&temp_dir.path().join("run"))?;
        assert!(path.ends_with(MANIFEST_FILE));

        let loaded = load_manifest(&path)?;
        assert_eq!(loaded, closed);
        assert_eq!(loaded.datasets()[0].row_count(), 42);
        Ok(())
    }

    #[test]
    fn test_load_manifest_invalid_json() -> Result<()> {
        let temp_dir = tempdir()?;
        let path = temp_dir.path().join(MANIFEST_FILE);
        fs::write(&path, "{ not json")?;

        assert!(load_manifest(&path).is_err());
        Ok(())
    }

    #[test]
    fn test_load_manifest_missing_file() -> Result<()> {
        let temp_dir = tempdir()?;
        let err = load_manifest(&temp_dir.path().join(MANIFEST_FILE)).unwrap_err();

        assert!(matches!(err, ForgeError::NotFound(_)));
        assert!(err.is_not_found());
        Ok(())
    }
}
