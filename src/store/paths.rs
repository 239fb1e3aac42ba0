//! Image path canonicalization and media file handling.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::config::Settings;
use crate::error::{StoreError, StoreResult};

/// Files owned by one store instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    /// Relational file
    pub database: PathBuf,

    /// Index snapshot, co-located with the database
    pub index: PathBuf,

    /// Root that canonical image paths are relative to
    pub media_root: PathBuf,
}

impl StorePaths {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            database: settings.database_path(),
            index: settings.index_path(),
            media_root: settings.media_path(),
        }
    }

    /// Default file names inside `data_dir`, media under `media_root`.
    pub fn in_dir(data_dir: impl AsRef<Path>, media_root: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            database: data_dir.join("vectors.db"),
            index: data_dir.join("vectors.vec"),
            media_root: media_root.as_ref().to_path_buf(),
        }
    }

    /// Where the file for a canonical image path lives.
    pub fn media_file(&self, canonical: &str) -> PathBuf {
        self.media_root.join(canonical)
    }
}

/// Canonical storage form of an image path.
///
/// Leading slashes and one leading `src/` segment are stripped and
/// backslashes become forward slashes. Paths that end up empty or that climb
/// out of the media root are rejected.
pub fn canonicalize_image_path(raw: &str) -> StoreResult<String> {
    let normalized = raw.trim().replace('\\', "/");
    let trimmed = normalized.trim_start_matches('/');
    let canonical = trimmed.strip_prefix("src/").unwrap_or(trimmed);

    if canonical.is_empty() {
        return Err(StoreError::InvalidPath {
            path: raw.to_string(),
            reason: "path is empty after canonicalization",
        });
    }

    let escapes = Path::new(canonical)
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)));
    if escapes {
        return Err(StoreError::InvalidPath {
            path: raw.to_string(),
            reason: "path must stay inside the media root",
        });
    }

    Ok(canonical.to_string())
}

/// Delete a media file, treating a missing file as already removed.
///
/// Returns whether a file was deleted. Failures are logged, never raised.
pub fn remove_media_file(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Removed media file");
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to remove media file");
            false
        }
    }
}

/// Delete a file if it exists. Used by reset.
pub(crate) fn remove_if_exists(path: &Path) -> StoreResult<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
