//! Verification of a written listing against its digest file.
//!
//! The digest file is never trusted on its own: the listing is re-read and
//! re-hashed, and the two values are compared.

use crate::dictionary::writer::{LISTING_DIGEST_FILE, LISTING_FILE};
use crate::error::{ForgeError, Result, ResultExt as _};
use crate::schema::fingerprint::{HASH_ALGORITHM, digest_text};
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Result of a dictionary verification.
#[derive(Debug, Clone, Serialize)]
pub struct DictionaryVerification {
    /// Whether the listing matches its recorded digest
    pub passed: bool,

    /// Human-readable message describing the result
    pub message: String,

    /// Path to the listing that was checked
    pub listing_path: String,

    /// Digest recorded next to the listing (if present)
    pub expected_digest: Option<String>,

    /// Digest recomputed from the listing (if present)
    pub actual_digest: Option<String>,
}

impl DictionaryVerification {
    fn pass(listing_path: String, digest: String) -> Self {
        Self {
            passed: true,
            message: "Data dictionary verified successfully".to_owned(),
            listing_path,
            expected_digest: Some(digest.clone()),
            actual_digest: Some(digest),
        }
    }

    fn fail(
        listing_path: String,
        expected: Option<String>,
        actual: Option<String>,
        reason: String,
    ) -> Self {
        Self {
            passed: false,
            message: reason,
            listing_path,
            expected_digest: expected,
            actual_digest: actual,
        }
    }

    /// Format the result for terminal display.
    pub fn format_cli(&self) -> String {
        if self.passed {
            let digest = self.actual_digest.as_deref().unwrap_or_default();
            format!(
                "✓ PASS: {}\n  \
                Listing: {}\n  \
                Digest: {}… ({HASH_ALGORITHM})",
                self.message,
                self.listing_path,
                digest.get(..16).unwrap_or(digest),
            )
        } else {
            let mut output = format!(
                "✗ FAIL: {}\n  \
                Listing: {}\n  ",
                self.message, self.listing_path
            );

            if let Some(expected) = &self.expected_digest {
                output.push_str(&format!("Expected: {expected}\n  "));
            }
            if let Some(actual) = &self.actual_digest {
                output.push_str(&format!("Actual:   {actual}\n  "));
            }

            output.push_str("Listing and digest are out of step; rewrite the dictionary");
            output
        }
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

/// Recompute the listing digest in `output_dir` and compare it with the
/// recorded one.
///
/// Missing files are reported as a failed verification, not as an error.
///
/// # Errors
///
/// Returns [`ForgeError::DirectoryNotFound`] if `output_dir` is missing and
/// [`ForgeError::Storage`] if an existing file cannot be read.
pub fn verify_dictionary(output_dir: &Path) -> Result<DictionaryVerification> {
    if !output_dir.is_dir() {
        return Err(ForgeError::DirectoryNotFound(output_dir.to_path_buf()));
    }

    let listing_path = output_dir.join(LISTING_FILE);
    let shown_path = listing_path.display().to_string();

    let listing = read_optional(&listing_path)?;
    let expected = read_optional(&output_dir.join(LISTING_DIGEST_FILE))?
        .map(|digest| digest.trim().to_ascii_uppercase());

    let Some(listing) = listing else {
        return Ok(DictionaryVerification::fail(
            shown_path,
            expected,
            None,
            format!("Listing not found: {LISTING_FILE}"),
        ));
    };

    let actual = digest_text(&listing).as_str().to_owned();

    match expected {
        None => Ok(DictionaryVerification::fail(
            shown_path,
            None,
            Some(actual),
            format!("Digest file not found: {LISTING_DIGEST_FILE}"),
        )),
        Some(expected) if expected == actual => Ok(DictionaryVerification::pass(shown_path, actual)),
        Some(expected) => Ok(DictionaryVerification::fail(
            shown_path,
            Some(expected),
            Some(actual),
            "Digest mismatch detected".to_owned(),
        )),
    }
}
