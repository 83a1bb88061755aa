//! # reportforge - schema fingerprints and run manifests for report pipelines
//!
//! A report pipeline materializes query results as columnar files. This crate
//! gives each dataset's schema a stable content-derived identity, keeps that
//! identity next to the output with an archive of every superseded value, and
//! records each run in an append-only manifest.
//!
//! ## Quick Start
//!
//! ```no_run
//! use reportforge::config::RunConfig;
//! use reportforge::manifest::{PendingMetric, RunManifest, record_dataset};
//! use reportforge::schema::ColumnDescriptor;
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = RunConfig::load(Path::new("run.json"))?;
//! let store = config.hash_store();
//! let mut manifest = RunManifest::from_config(config);
//!
//! let columns = vec![
//!     ColumnDescriptor::new("Sales", "region", "String", true),
//!     ColumnDescriptor::new("Sales", "amount", "Decimal", false),
//! ];
//! let pending = PendingMetric::new("Sales", 1_250, 84.0, Path::new("out/sales"))?;
//! record_dataset(&mut manifest, &store, pending, &columns)?;
//!
//! let closed = manifest.finalize();
//! closed.save(Path::new("out"))?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`schema`]: fingerprints and the per-location hash store
//! - [`manifest`]: dataset metrics and the run manifest
//! - [`dictionary`]: consolidated schema listing and its verification
//! - [`config`]: run configuration snapshot
//! - [`error`]: error type shared by all modules
//! - [`logging`]: `tracing` subscriber setup

pub mod config;
pub mod dictionary;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod schema;
