//! Schema fingerprinting and the per-location digest history.
//!
//! A dataset's schema is its ordered list of columns (name, type label,
//! nullability). This module turns that list into a stable SHA-256 digest and
//! keeps one "current" digest file per dataset output directory, displacing the
//! previous one into a timestamped archive before every overwrite.
//!
//! ## Lifecycle of one dataset
//!
//! ```text
//! columns ──fingerprint──> digest
//!                            │
//!  read_current(dir) ──> previous digest (None on first run)
//!  archive(dir)      ──> archives/<dir>_<yyyy-MM-dd_HH-mm>.txt
//!  write_current(..) ──> <dir>/schema_hash.txt = digest
//! ```
//!
//! [`SchemaHashStore::rotate`] performs the three store steps in that order;
//! `write_current` only accepts the token returned by `archive`, so the
//! archive-then-write ordering cannot be skipped.
//!
//! ## Submodules
//!
//! - [`fingerprint`]: column descriptors, canonical text and digests
//! - [`store`]: hash file persistence and archival

pub mod fingerprint;
pub mod store;

pub use fingerprint::{ColumnDescriptor, SchemaDigest, digest_text, fingerprint};
pub use store::{Archived, ArchivedDigest, Rotation, SchemaHashStore};
