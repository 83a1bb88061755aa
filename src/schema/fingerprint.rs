//! Column descriptors, canonical schema text and SHA-256 digests.
//!
//! The canonical form of a schema is one line per column, in the dataset's
//! native column order:
//!
//! ```text
//! Sales|region|String|True
//! Sales|amount|Decimal|False
//! ```
//!
//! Every line ends with `\n`. The digest is SHA-256 over the UTF-8 bytes of that
//! text, rendered as uppercase hex. The same line format is used for the rows of
//! the data dictionary listing, so a dataset digest can be reproduced from the
//! listing by hand.

use crate::error::{ForgeError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt;

/// Field separator for canonical schema lines and the dictionary listing.
pub const FIELD_DELIMITER: char = '|';

/// Hash algorithm identifier recorded next to digests.
pub const HASH_ALGORITHM: &str = "SHA-256";

/// Length of a rendered digest (32 bytes as hex).
pub const DIGEST_HEX_LEN: usize = 64;

/// One column of a dataset's schema.
///
/// All text fields are trimmed on construction. Validation happens when the
/// descriptor is serialized, see [`ColumnDescriptor::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawColumnDescriptor")]
pub struct ColumnDescriptor {
    dataset_name: String,
    column_name: String,
    data_type: String,
    is_nullable: bool,
}

#[derive(Deserialize)]
struct RawColumnDescriptor {
    dataset_name: String,
    column_name: String,
    data_type: String,
    is_nullable: bool,
}

impl From<RawColumnDescriptor> for ColumnDescriptor {
    fn from(raw: RawColumnDescriptor) -> Self {
        Self::new(
            &raw.dataset_name,
            &raw.column_name,
            &raw.data_type,
            raw.is_nullable,
        )
    }
}

impl ColumnDescriptor {
    pub fn new(dataset_name: &str, column_name: &str, data_type: &str, is_nullable: bool) -> Self {
        Self {
            dataset_name: dataset_name.trim().to_owned(),
            column_name: column_name.trim().to_owned(),
            data_type: data_type.trim().to_owned(),
            is_nullable,
        }
    }

    pub fn dataset_name(&self) -> &str {
        &self.dataset_name
    }

    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    pub fn data_type(&self) -> &str {
        &self.data_type
    }

    pub fn is_nullable(&self) -> bool {
        self.is_nullable
    }

    /// Reject descriptors that would make the canonical text ambiguous.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::MalformedInput`] if a text field is empty or
    /// contains the field delimiter or a line break.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("dataset name", &self.dataset_name),
            ("column name", &self.column_name),
            ("data type", &self.data_type),
        ] {
            if value.is_empty() {
                return Err(ForgeError::MalformedInput(format!(
                    "{field} is empty (dataset '{}', column '{}')",
                    self.dataset_name, self.column_name
                )));
            }
            if value.contains([FIELD_DELIMITER, '\n', '\r']) {
                return Err(ForgeError::MalformedInput(format!(
                    "{field} '{value}' contains a delimiter or line break"
                )));
            }
        }
        Ok(())
    }

    /// Canonical line for this column, without the trailing newline.
    pub fn canonical_line(&self) -> String {
        format!(
            "{}{d}{}{d}{}{d}{}",
            self.dataset_name,
            self.column_name,
            self.data_type,
            nullable_label(self.is_nullable),
            d = FIELD_DELIMITER
        )
    }
}

pub(crate) fn nullable_label(is_nullable: bool) -> &'static str {
    if is_nullable { "True" } else { "False" }
}

/// Uppercase hex SHA-256 digest of a schema or listing.
///
/// The empty digest is a sentinel for "nothing to hash"; check
/// [`SchemaDigest::is_empty`] before treating a digest as a real identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaDigest(String);

impl SchemaDigest {
    /// The sentinel returned for empty input.
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Parse a digest read back from disk. Surrounding whitespace is ignored and
    /// lowercase hex is normalised to uppercase.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::MalformedInput`] if the text is not 64 hex characters.
    pub fn from_hex(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.len() != DIGEST_HEX_LEN || !text.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ForgeError::MalformedInput(format!(
                "'{text}' is not a {HASH_ALGORITHM} hex digest"
            )));
        }
        Ok(Self(text.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SchemaDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Digest arbitrary canonical text. Empty text yields the empty sentinel.
pub fn digest_text(text: &str) -> SchemaDigest {
    if text.is_empty() {
        return SchemaDigest::empty();
    }

    let hash = Sha256::digest(text.as_bytes());
    SchemaDigest(format!("{hash:X}"))
}

/// Canonical text for one dataset's columns, in the given order.
///
/// # Errors
///
/// Returns [`ForgeError::MalformedInput`] if any column fails validation or
/// belongs to a different dataset.
pub fn canonical_schema(dataset_name: &str, columns: &[ColumnDescriptor]) -> Result<String> {
    let dataset_name = dataset_name.trim();
    let mut text = String::new();

    for column in columns {
        column.validate()?;
        if column.dataset_name != dataset_name {
            return Err(ForgeError::MalformedInput(format!(
                "column '{}' belongs to dataset '{}', expected '{dataset_name}'",
                column.column_name, column.dataset_name
            )));
        }
        text.push_str(&column.canonical_line());
        text.push('\n');
    }

    Ok(text)
}

/// Compute the schema digest of a dataset.
///
/// Pure: the same ordered columns always produce the same digest. No columns
/// produce [`SchemaDigest::empty`].
///
/// # Errors
///
/// Returns [`ForgeError::MalformedInput`] when a column is incomplete; nothing is
/// hashed in that case.
///
/// # Example
///
/// ```
/// use reportforge::schema::{ColumnDescriptor, fingerprint};
///
/// let columns = vec![
///     ColumnDescriptor::new("orders", "id", "Int64", false),
///     ColumnDescriptor::new("orders", "note", "String", true),
/// ];
/// let digest = fingerprint("orders", &columns)?;
/// assert_eq!(digest.as_str().len(), 64);
/// # Ok::<(), reportforge::error::ForgeError>(())
/// ```
pub fn fingerprint(dataset_name: &str, columns: &[ColumnDescriptor]) -> Result<SchemaDigest> {
    let text = canonical_schema(dataset_name, columns)?;
    Ok(digest_text(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sales_columns() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::new("Sales", "region", "String", true),
            ColumnDescriptor::new("Sales", "amount", "Decimal", false),
            ColumnDescriptor::new("Sales", "sold_at", "DateTime", false),
        ]
    }

    #[test]
    fn test_digest_text_known_value() {
        let digest = digest_text("hello world");
        assert_eq!(
            digest.as_str(),
            "B94D27B9934D3E08A52E52D7DA7DABFAC484EFE37A5380EE9088F7ACE2EFCDE9"
        );
    }

    #[test]
    fn test_empty_input_yields_sentinel() {
        assert!(digest_text("").is_empty());
        assert!(fingerprint("Sales", &[]).unwrap().is_empty());
    }

    #[test]
    fn test_canonical_schema_layout() {
        let text = canonical_schema("Sales", &sales_columns()).unwrap();
        assert_eq!(
            text,
            "Sales|region|String|True\nSales|amount|Decimal|False\nSales|sold_at|DateTime|False\n"
        );
    }

    #[test]
    fn test_fields_are_trimmed() {
        let padded = vec![ColumnDescriptor::new("  Sales ", " region\t", " String ", true)];
        let plain = vec![ColumnDescriptor::new("Sales", "region", "String", true)];
        assert_eq!(
            fingerprint("Sales", &padded).unwrap(),
            fingerprint("Sales", &plain).unwrap()
        );
    }

    #[test]
    fn test_deterministic_fingerprint() {
        let first = fingerprint("Sales", &sales_columns()).unwrap();
        let second = fingerprint("Sales", &sales_columns()).unwrap();
        assert_eq!(first, second, "Fingerprint should be deterministic");
        assert_eq!(first.as_str().len(), DIGEST_HEX_LEN);
        assert!(first.as_str().chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_every_field_change_changes_digest() {
        let base = fingerprint("Sales", &sales_columns()).unwrap();

        let mut renamed = sales_columns();
        renamed[0] = ColumnDescriptor::new("Sales", "area", "String", true);

        let mut retyped = sales_columns();
        retyped[1] = ColumnDescriptor::new("Sales", "amount", "Double", false);

        let mut nullability = sales_columns();
        nullability[1] = ColumnDescriptor::new("Sales", "amount", "Decimal", true);

        let mut reordered = sales_columns();
        reordered.swap(0, 2);

        let mut shorter = sales_columns();
        shorter.pop();

        for variant in [renamed, retyped, nullability, reordered, shorter] {
            assert_ne!(base, fingerprint("Sales", &variant).unwrap());
        }
    }

    #[test]
    fn test_malformed_columns_rejected() {
        let missing_type = vec![ColumnDescriptor::new("Sales", "region", "  ", true)];
        assert!(matches!(
            fingerprint("Sales", &missing_type),
            Err(ForgeError::MalformedInput(_))
        ));

        let piped = vec![ColumnDescriptor::new("Sales", "a|b", "String", true)];
        assert!(matches!(
            fingerprint("Sales", &piped),
            Err(ForgeError::MalformedInput(_))
        ));

        let wrong_dataset = vec![ColumnDescriptor::new("Orders", "id", "Int64", false)];
        assert!(matches!(
            fingerprint("Sales", &wrong_dataset),
            Err(ForgeError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_from_hex_normalises_case() {
        let lower = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9\n";
        let digest = SchemaDigest::from_hex(lower).unwrap();
        assert_eq!(digest, digest_text("hello world"));

        assert!(SchemaDigest::from_hex("not-a-digest").is_err());
        assert!(SchemaDigest::from_hex("").is_err());
    }

    #[test]
    fn test_descriptor_deserialize_trims() {
        let json = r#"{"dataset_name":" Sales ","column_name":"id ","data_type":"Int64","is_nullable":false}"#;
        let column: ColumnDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(column.dataset_name(), "Sales");
        assert_eq!(column.column_name(), "id");
    }
}
