//! Persistence of the current schema digest per output directory.
//!
//! Each dataset output directory holds at most one live hash file
//! ([`SCHEMA_HASH_FILE`]). Before it is replaced, its content is copied into the
//! store's archive directory under a name carrying the file's last-modified
//! minute, then the original is removed. Archives are created with
//! `create_new`, so an existing archive is never overwritten; same-minute
//! collisions get a numeric suffix.
//!
//! Operations are scoped to a single output directory. Different directories
//! can rotate concurrently; one directory must not be rotated by two callers at
//! once.

use crate::error::{ForgeError, Result, ResultExt as _};
use crate::schema::fingerprint::SchemaDigest;
use chrono::{DateTime, Utc};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// File name of the live digest inside a dataset output directory.
pub const SCHEMA_HASH_FILE: &str = "schema_hash.txt";

/// Staging name for [`SCHEMA_HASH_FILE`] while it is being replaced.
const STAGING_HASH_FILE: &str = "schema_hash.txt.tmp";

/// Archive subdirectory of the working directory.
pub const ARCHIVES_DIR: &str = "archives";

/// Minute-precision timestamp embedded in archive names (`yyyy-MM-dd_HH-mm`).
pub const ARCHIVE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M";

/// Proof that [`SchemaHashStore::archive`] completed for an output directory.
///
/// [`SchemaHashStore::write_current`] consumes this token, which makes
/// write-before-archive unrepresentable.
#[derive(Debug)]
#[must_use = "pass the token to SchemaHashStore::write_current"]
pub struct Archived {
    output_dir: PathBuf,
    archive_path: Option<PathBuf>,
}

impl Archived {
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Where the previous hash file went, or `None` if there was nothing to archive.
    pub fn archive_path(&self) -> Option<&Path> {
        self.archive_path.as_deref()
    }
}

/// Outcome of a full read-archive-write cycle.
#[derive(Debug, Clone)]
pub struct Rotation {
    /// Digest that was current before this rotation
    pub previous: Option<SchemaDigest>,

    /// Archive file holding the previous digest
    pub archived_to: Option<PathBuf>,

    /// Path of the freshly written hash file
    pub current_path: PathBuf,
}

/// An archived digest, as listed by [`SchemaHashStore::list_archives`].
#[derive(Debug, Clone)]
pub struct ArchivedDigest {
    pub path: PathBuf,
    pub digest: SchemaDigest,

    /// Last-modified instant of the hash file when it was archived
    pub archived_at: DateTime<Utc>,
}

/// Digest store rooted at a working directory.
#[derive(Debug, Clone)]
pub struct SchemaHashStore {
    archive_dir: PathBuf,
}

impl SchemaHashStore {
    /// Store whose archives live in `<working_dir>/archives`.
    ///
    /// Nothing is created on disk until the first archive is written.
    pub fn new(working_dir: &Path) -> Self {
        Self {
            archive_dir: working_dir.join(ARCHIVES_DIR),
        }
    }

    pub fn with_archive_dir(archive_dir: PathBuf) -> Self {
        Self { archive_dir }
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    /// Path of the live hash file for an output directory.
    pub fn hash_path(output_dir: &Path) -> PathBuf {
        output_dir.join(SCHEMA_HASH_FILE)
    }

    /// Read the digest currently recorded for `output_dir`.
    ///
    /// A missing file or missing directory is the first-run state and yields
    /// `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::Storage`] if the file exists but cannot be read and
    /// [`ForgeError::MalformedInput`] if it does not hold a hex digest.
    pub fn read_current(&self, output_dir: &Path) -> Result<Option<SchemaDigest>> {
        let hash_path = Self::hash_path(output_dir);

        let content = match fs::read_to_string(&hash_path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No previous schema hash at {}", hash_path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read {}", hash_path.display()));
            }
        };

        if content.trim().is_empty() {
            warn!("Schema hash file {} is empty", hash_path.display());
            return Ok(None);
        }

        SchemaDigest::from_hex(&content)
            .with_context(|| format!("Corrupt schema hash file {}", hash_path.display()))
            .map(Some)
    }

    /// Move the live hash file of `output_dir` into the archive directory.
    ///
    /// The archive copy is written first; the original is removed only after
    /// that succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::Storage`] if the archive directory cannot be created
    /// or written, or if the original cannot be removed afterwards. In the first
    /// two cases the live hash file is untouched.
    pub fn archive(&self, output_dir: &Path) -> Result<Archived> {
        let hash_path = Self::hash_path(output_dir);

        let metadata = match fs::metadata(&hash_path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(Archived {
                    output_dir: output_dir.to_path_buf(),
                    archive_path: None,
                });
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to stat {}", hash_path.display()));
            }
        };

        let content = fs::read_to_string(&hash_path)
            .with_context(|| format!("Failed to read {}", hash_path.display()))?;
        let modified = metadata
            .modified()
            .with_context(|| format!("No modification time for {}", hash_path.display()))?;

        fs::create_dir_all(&self.archive_dir).with_context(|| {
            format!(
                "Failed to create archive directory {}",
                self.archive_dir.display()
            )
        })?;

        let archive_path = self.write_archive(output_dir, modified, content.trim())?;

        fs::remove_file(&hash_path).with_context(|| {
            format!(
                "Archived to {} but failed to remove {}",
                archive_path.display(),
                hash_path.display()
            )
        })?;

        info!(
            "Archived schema hash {} -> {}",
            hash_path.display(),
            archive_path.display()
        );

        Ok(Archived {
            output_dir: output_dir.to_path_buf(),
            archive_path: Some(archive_path),
        })
    }

    fn write_archive(&self, output_dir: &Path, modified: SystemTime, content: &str) -> Result<PathBuf> {
        let stamp = DateTime::<Utc>::from(modified).format(ARCHIVE_TIMESTAMP_FORMAT);
        let base = format!("{}_{stamp}", archive_label(output_dir));

        let mut attempt = 0u32;
        loop {
            let name = if attempt == 0 {
                format!("{base}.txt")
            } else {
                format!("{base}_{attempt}.txt")
            };
            let path = self.archive_dir.join(name);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    write_or_discard(&mut file, &path, content)?;
                    // Keep the archived instant on the copy so listings can sort by it.
                    if let Err(e) = file.set_modified(modified) {
                        debug!("Could not carry mtime onto {}: {e}", path.display());
                    }
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("Failed to create archive {}", path.display()));
                }
            }
        }
    }

    /// Write `digest` as the live hash of the archived output directory.
    ///
    /// Creates the output directory if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::MalformedInput`] for the empty digest sentinel and
    /// [`ForgeError::Storage`] if the file cannot be written.
    pub fn write_current(&self, archived: Archived, digest: &SchemaDigest) -> Result<PathBuf> {
        if digest.is_empty() {
            return Err(ForgeError::MalformedInput(
                "refusing to record an empty schema digest".to_owned(),
            ));
        }

        let Archived { output_dir, .. } = archived;
        fs::create_dir_all(&output_dir)
            .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

        // The old file is already archived; a torn write must never read back as "no digest".
        let hash_path = Self::hash_path(&output_dir);
        let staging_path = output_dir.join(STAGING_HASH_FILE);
        fs::write(&staging_path, digest.as_str().trim())
            .with_context(|| format!("Failed to write {}", staging_path.display()))?;

        if let Err(e) = fs::rename(&staging_path, &hash_path) {
            remove_leftover(&staging_path);
            return Err(e).with_context(|| format!("Failed to replace {}", hash_path.display()));
        }

        debug!("Wrote schema hash {digest} to {}", hash_path.display());
        Ok(hash_path)
    }

    /// Read the previous digest, archive it, and record `digest` as current.
    ///
    /// # Errors
    ///
    /// Fails before touching disk if `digest` is empty or the existing hash file
    /// is corrupt; otherwise propagates the first failing step.
    pub fn rotate(&self, output_dir: &Path, digest: &SchemaDigest) -> Result<Rotation> {
        if digest.is_empty() {
            return Err(ForgeError::MalformedInput(format!(
                "empty schema digest for {}",
                output_dir.display()
            )));
        }

        let previous = self.read_current(output_dir)?;
        let archived = self.archive(output_dir)?;
        let archived_to = archived.archive_path().map(Path::to_path_buf);
        let current_path = self.write_current(archived, digest)?;

        Ok(Rotation {
            previous,
            archived_to,
            current_path,
        })
    }

    /// All archived digests, newest first.
    ///
    /// Files that do not hold a digest are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::Storage`] if the archive directory cannot be listed.
    pub fn list_archives(&self) -> Result<Vec<ArchivedDigest>> {
        if !self.archive_dir.exists() {
            return Ok(Vec::new());
        }

        let mut archives = Vec::new();

        for entry in fs::read_dir(&self.archive_dir)
            .with_context(|| format!("Failed to read {}", self.archive_dir.display()))?
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("txt") {
                continue;
            }

            let digest = match fs::read_to_string(&path)
                .map_err(ForgeError::from)
                .and_then(|content| SchemaDigest::from_hex(&content))
            {
                Ok(digest) => digest,
                Err(e) => {
                    warn!("Skipping archive {}: {e}", path.display());
                    continue;
                }
            };

            let archived_at = entry
                .metadata()
                .and_then(|m| m.modified())
                .map(DateTime::<Utc>::from)
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

            archives.push(ArchivedDigest {
                path,
                digest,
                archived_at,
            });
        }

        archives.sort_by(|a, b| {
            b.archived_at
                .cmp(&a.archived_at)
                .then_with(|| b.path.cmp(&a.path))
        });

        Ok(archives)
    }
}

/// Write `content` into a freshly created file, removing the file again if the
/// write fails so no empty or partial archive is left behind.
fn write_or_discard(mut file: impl Write, path: &Path, content: &str) -> Result<()> {
    if let Err(e) = file
        .write_all(content.as_bytes())
        .and_then(|()| file.flush())
    {
        remove_leftover(path);
        return Err(e).with_context(|| format!("Failed to write archive {}", path.display()));
    }
    Ok(())
}

fn remove_leftover(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!("Could not remove incomplete file {}: {e}", path.display());
    }
}

/// Filesystem-safe label for an output directory, used as the archive name prefix.
fn archive_label(output_dir: &Path) -> String {
    let label: String = output_dir
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();

    if label.trim_matches('_').is_empty() {
        "dataset".to_owned()
    } else {
        label
    }
}
