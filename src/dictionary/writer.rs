//! Consolidated schema listing for a run.

use crate::error::{ForgeError, Result, ResultExt as _};
use crate::schema::fingerprint::{ColumnDescriptor, FIELD_DELIMITER, SchemaDigest, digest_text};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name of the pipe-delimited listing.
pub const LISTING_FILE: &str = "data_dictionary.csv";

/// File name of the listing digest, sibling to [`LISTING_FILE`].
pub const LISTING_DIGEST_FILE: &str = "data_dictionary_hash.txt";

/// Header fields, in the order every row is written.
pub const LISTING_HEADER: [&str; 4] = ["DatasetName", "ColumnName", "DataType", "IsNullable"];

/// Files written by [`write_schema`].
#[derive(Debug, Clone)]
pub struct DictionaryArtifacts {
    pub listing_path: PathBuf,
    pub digest_path: PathBuf,
    pub digest: SchemaDigest,
    pub entry_count: usize,
}

/// Compose the full listing text: header row, then one row per entry.
///
/// # Errors
///
/// Returns [`ForgeError::MalformedInput`] if any entry fails validation.
pub fn render_listing(entries: &[ColumnDescriptor]) -> Result<String> {
    let mut text = LISTING_HEADER.join(&FIELD_DELIMITER.to_string());
    text.push('\n');

    for entry in entries {
        entry.validate()?;
        text.push_str(&entry.canonical_line());
        text.push('\n');
    }

    Ok(text)
}

/// Write the listing and its digest into `output_dir`.
///
/// The listing is composed in memory first; any previous listing is removed,
/// then the listing is written, then the digest. A crash between the last two
/// writes leaves a listing without a matching digest, which
/// [`crate::dictionary::verify_dictionary`] reports.
///
/// # Errors
///
/// - [`ForgeError::DirectoryNotFound`] if `output_dir` does not exist
/// - [`ForgeError::MalformedInput`] if an entry is incomplete
/// - [`ForgeError::Storage`] if a file cannot be removed or written
pub fn write_schema(entries: &[ColumnDescriptor], output_dir: &Path) -> Result<DictionaryArtifacts> {
    if !output_dir.is_dir() {
        return Err(ForgeError::DirectoryNotFound(output_dir.to_path_buf()));
    }

    let listing = render_listing(entries)?;
    let digest = digest_text(&listing);

    let listing_path = output_dir.join(LISTING_FILE);
    let digest_path = output_dir.join(LISTING_DIGEST_FILE);

    if listing_path.exists() {
        fs::remove_file(&listing_path)
            .with_context(|| format!("Failed to remove old listing {}", listing_path.display()))?;
    }

    fs::write(&listing_path, &listing)
        .with_context(|| format!("Failed to write listing {}", listing_path.display()))?;
    fs::write(&digest_path, digest.as_str())
        .with_context(|| format!("Failed to write listing digest {}", digest_path.display()))?;

    info!(
        "Wrote data dictionary with {} entries to {} ({digest})",
        entries.len(),
        listing_path.display()
    );

    Ok(DictionaryArtifacts {
        listing_path,
        digest_path,
        digest,
        entry_count: entries.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::fingerprint;
    use tempfile::TempDir;

    fn entries() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::new("Sales", "region", "String", true),
            ColumnDescriptor::new("Sales", "amount", "Decimal", false),
            ColumnDescriptor::new("Orders", "id", "Int64", false),
        ]
    }

    #[test]
    fn test_render_listing() {
        let text = render_listing(&entries()).unwrap();
        assert_eq!(
            text,
            "DatasetName|ColumnName|DataType|IsNullable\n\
             Sales|region|String|True\n\
             Sales|amount|Decimal|False\n\
             Orders|id|Int64|False\n"
        );
    }

    #[test]
    fn test_rows_match_dataset_fingerprint() {
        // Dropping the header and the other dataset's rows reproduces the Sales digest.
        let text = render_listing(&entries()).unwrap();
        let sales_rows: String = text
            .lines()
            .skip(1)
            .filter(|line| line.starts_with("Sales|"))
            .map(|line| format!("{line}\n"))
            .collect();

        let sales: Vec<_> = entries().into_iter().take(2).collect();
        assert_eq!(digest_text(&sales_rows), fingerprint("Sales", &sales).unwrap());
    }

    #[test]
    fn test_write_schema() {
        let temp = TempDir::new().unwrap();
        let artifacts = write_schema(&entries(), temp.path()).unwrap();

        let listing = fs::read_to_string(&artifacts.listing_path).unwrap();
        let digest = fs::read_to_string(&artifacts.digest_path).unwrap();
        assert_eq!(digest, artifacts.digest.as_str());
        assert_eq!(digest_text(&listing), artifacts.digest);
        assert_eq!(artifacts.entry_count, 3);
    }

    #[test]
    fn test_write_schema_replaces_previous_listing() {
        let temp = TempDir::new().unwrap();
        write_schema(&entries(), temp.path()).unwrap();

        let fewer = vec![ColumnDescriptor::new("Orders", "id", "Int64", false)];
        let artifacts = write_schema(&fewer, temp.path()).unwrap();

        let listing = fs::read_to_string(&artifacts.listing_path).unwrap();
        assert_eq!(listing.lines().count(), 2);
        assert!(!listing.contains("Sales"));
    }

    #[test]
    fn test_write_schema_requires_directory() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("not-created");

        let err = write_schema(&entries(), &missing).unwrap_err();
        assert!(matches!(err, ForgeError::DirectoryNotFound(_)));
        assert!(!missing.exists(), "directory is not auto-created");
    }

    #[test]
    fn test_malformed_entry_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let bad = vec![ColumnDescriptor::new("Sales", "amount", "", false)];

        assert!(write_schema(&bad, temp.path()).is_err());
        assert!(!temp.path().join(LISTING_FILE).exists());
        assert!(!temp.path().join(LISTING_DIGEST_FILE).exists());
    }
}
