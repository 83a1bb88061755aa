//! Error types for the fingerprinting and manifest subsystem.
//!
//! Failures fall into a small taxonomy that callers branch on:
//!
//! - [`ForgeError::NotFound`] / [`ForgeError::DirectoryNotFound`]: something the
//!   operation needs is absent. A missing previous schema hash is *not* reported
//!   this way; the store answers `None` instead, because that is the normal state
//!   of a dataset's first run.
//! - [`ForgeError::Storage`]: the filesystem refused a write, rename or directory
//!   creation. Scoped to one dataset; the caller decides whether to warn and move
//!   on or abort the run.
//! - [`ForgeError::MalformedInput`]: input rejected before hashing, so a partial
//!   schema never produces a plausible-looking digest.
//!
//! ```
//! use reportforge::error::ForgeError;
//!
//! fn describe(err: &ForgeError) -> &'static str {
//!     match err {
//!         ForgeError::Storage(_) | ForgeError::Io(_) => "storage",
//!         ForgeError::MalformedInput(_) => "bad input",
//!         _ => "other",
//!     }
//! }
//! # assert_eq!(describe(&ForgeError::MalformedInput("x".to_owned())), "bad input");
//! ```
//!
//! The [`ResultExt`] trait adds `.context()` like the `anyhow` version, but keeps
//! the category: an I/O error with context becomes a `Storage` error rather than
//! a generic string.

use std::fmt;
use std::path::PathBuf;

/// Main error type for reportforge operations.
#[derive(Debug)]
pub enum ForgeError {
    /// Raw I/O errors that have not been given context yet
    Io(std::io::Error),

    /// A required file or record does not exist
    NotFound(String),

    /// A directory that must already exist is missing
    DirectoryNotFound(PathBuf),

    /// Write, rename, remove or directory creation failed
    Storage(String),

    /// Input rejected before hashing or recording
    MalformedInput(String),

    /// JSON encoding or decoding failed
    Serialization(String),

    /// Configuration errors
    Config(String),

    /// Generic error with context
    Other(String),
}

impl ForgeError {
    /// Whether this error means "the thing is not there" rather than "it broke".
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) | Self::DirectoryNotFound(_) => true,
            Self::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    fn prefixed(self, prefix: &str) -> Self {
        match self {
            Self::Io(e) => Self::Storage(format!("{prefix}: {e}")),
            Self::NotFound(msg) => Self::NotFound(format!("{prefix}: {msg}")),
            Self::Storage(msg) => Self::Storage(format!("{prefix}: {msg}")),
            Self::MalformedInput(msg) => Self::MalformedInput(format!("{prefix}: {msg}")),
            Self::Serialization(msg) => Self::Serialization(format!("{prefix}: {msg}")),
            Self::Config(msg) => Self::Config(format!("{prefix}: {msg}")),
            Self::Other(msg) => Self::Other(format!("{prefix}: {msg}")),
            // The path already says everything useful.
            Self::DirectoryNotFound(path) => Self::DirectoryNotFound(path),
        }
    }
}

impl fmt::Display for ForgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::NotFound(msg) => write!(f, "Not found: {msg}"),
            Self::DirectoryNotFound(path) => {
                write!(f, "'{}' directory does not exist", path.display())
            }
            Self::Storage(msg) => write!(f, "Storage error: {msg}"),
            Self::MalformedInput(msg) => write!(f, "Malformed input: {msg}"),
            Self::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ForgeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ForgeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for ForgeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for ForgeError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

/// Result type alias for reportforge operations.
pub type Result<T> = std::result::Result<T, ForgeError>;

/// Extension trait to add context to results without losing the error category.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> Result<T>;

    /// Add context using a closure (lazy evaluation).
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<ForgeError>,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().prefixed(&msg.into()))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().prefixed(&f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ForgeError::MalformedInput("column name is empty".to_owned());
        assert_eq!(err.to_string(), "Malformed input: column name is empty");

        let err = ForgeError::DirectoryNotFound(PathBuf::from("/out/run"));
        assert_eq!(err.to_string(), "'/out/run' directory does not exist");
    }

    #[test]
    fn test_io_context_becomes_storage() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));

        let err = result.context("Failed to create archive directory").unwrap_err();
        assert!(matches!(err, ForgeError::Storage(_)));
        assert!(err.to_string().contains("Failed to create archive directory"));
    }

    #[test]
    fn test_context_keeps_category() {
        let result: Result<()> = Err(ForgeError::MalformedInput("empty type".to_owned()));
        let err = result.with_context(|| "orders".to_owned()).unwrap_err();
        assert!(matches!(err, ForgeError::MalformedInput(ref m) if m == "orders: empty type"));
    }

    #[test]
    fn test_is_not_found() {
        let io = ForgeError::Io(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(io.is_not_found());
        assert!(ForgeError::DirectoryNotFound(PathBuf::new()).is_not_found());
        assert!(!ForgeError::Storage("disk full".to_owned()).is_not_found());
    }
}
