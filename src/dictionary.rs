//! Data dictionary: every dataset schema of a run in one auditable listing.
//!
//! The listing is a pipe-delimited text file with a header row and one row per
//! column. Rows use the same canonical line format as schema fingerprints, and
//! a digest of the whole listing is written next to it.
//!
//! ```text
//! DatasetName|ColumnName|DataType|IsNullable
//! Sales|region|String|True
//! Sales|amount|Decimal|False
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use reportforge::dictionary::{verify_dictionary, write_schema};
//! use reportforge::schema::ColumnDescriptor;
//! use std::path::Path;
//!
//! # fn example() -> reportforge::error::Result<()> {
//! let entries = vec![ColumnDescriptor::new("Sales", "amount", "Decimal", false)];
//! let out = Path::new("out/run-42");
//! write_schema(&entries, out)?;
//!
//! let check = verify_dictionary(out)?;
//! assert!(check.passed);
//! # Ok(())
//! # }
//! ```

pub mod verifier;
pub mod writer;

pub use verifier::{DictionaryVerification, verify_dictionary};
pub use writer::{
    DictionaryArtifacts, LISTING_DIGEST_FILE, LISTING_FILE, LISTING_HEADER, render_listing,
    write_schema,
};
