//! Thread-safe handle to an open manifest.
//!
//! Datasets can be fingerprinted and written on worker threads as long as each
//! owns its output directory. Their results still go through one manifest, so
//! appends are serialized by a mutex here.

use crate::error::{ForgeError, Result};
use crate::manifest::metric::DatasetMetric;
use crate::manifest::run::{ClosedManifest, RunManifest};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Cloneable, mutex-guarded [`RunManifest`].
#[derive(Debug, Clone)]
pub struct SharedManifest {
    inner: Arc<Mutex<RunManifest>>,
}

impl SharedManifest {
    pub fn new(manifest: RunManifest) -> Self {
        Self {
            inner: Arc::new(Mutex::new(manifest)),
        }
    }

    // A panic on another thread mid-append cannot leave the Vec half-written,
    // so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, RunManifest> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_dataset(&self, metric: DatasetMetric) {
        self.lock().add_dataset(metric);
    }

    pub fn add_warning(&self, message: impl Into<String>) {
        self.lock().add_warning(message);
    }

    pub fn mark_failed(&self) {
        self.lock().mark_failed();
    }

    /// Run `f` with read access to the manifest.
    pub fn read<T>(&self, f: impl FnOnce(&RunManifest) -> T) -> T {
        f(&self.lock())
    }

    /// Close the manifest. Every other handle must have been dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::Other`] if clones of this handle are still alive.
    pub fn finalize(self) -> Result<ClosedManifest> {
        let inner = Arc::try_unwrap(self.inner).map_err(|inner| {
            ForgeError::Other(format!(
                "manifest still shared by {} other handle(s)",
                Arc::strong_count(&inner) - 1
            ))
        })?;

        let manifest = inner.into_inner().unwrap_or_else(PoisonError::into_inner);
        Ok(manifest.finalize())
    }
}

impl From<RunManifest> for SharedManifest {
    fn from(manifest: RunManifest) -> Self {
        Self::new(manifest)
    }
}
