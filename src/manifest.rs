//! Run manifests: the audit record of one pipeline execution.
//!
//! A [`RunManifest`] is opened at run start, collects one [`DatasetMetric`] per
//! processed dataset plus free-text warnings, and is closed by
//! [`RunManifest::finalize`]. The closed form is what gets written to disk.
//!
//! ## Usage
//!
//! ```no_run
//! use reportforge::config::{Environment, RunConfig};
//! use reportforge::manifest::{PendingMetric, RunManifest, record_dataset};
//! use reportforge::schema::ColumnDescriptor;
//! use std::path::Path;
//!
//! # fn example() -> reportforge::error::Result<()> {
//! let config = RunConfig::default();
//! let store = config.hash_store();
//! let mut manifest = RunManifest::from_config(config);
//!
//! let columns = vec![ColumnDescriptor::new("Sales", "amount", "Decimal", false)];
//! let pending = PendingMetric::new("Sales", 1_204, 830.5, "out/sales")?;
//! if let Err(e) = record_dataset(&mut manifest, &store, pending, &columns) {
//!     eprintln!("sales skipped: {e}");
//! }
//!
//! let closed = manifest.finalize();
//! closed.save(Path::new("out"))?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Submodules
//!
//! - [`metric`]: per-dataset metrics and output name sanitizing
//! - [`run`]: the manifest itself and the run timer
//! - [`shared`]: mutex-guarded handle for multi-threaded producers
//! - [`recorder`]: fingerprint + rotate + append in one call
//! - [`storage`]: JSON persistence

pub mod metric;
pub mod recorder;
pub mod run;
pub mod shared;
pub mod storage;

pub use metric::{DatasetMetric, PendingMetric, SchemaStatus, sanitize_name};
pub use recorder::{record_dataset, record_dataset_shared};
pub use run::{ClosedManifest, RunManifest, RunTime, format_duration};
pub use shared::SharedManifest;
pub use storage::{MANIFEST_FILE, load_manifest, save_manifest};
