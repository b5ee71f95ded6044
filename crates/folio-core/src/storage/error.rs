//! Local cache errors
//!
//! A failing cache write is the only thing that can fail a save, so these
//! carry the path involved and, where the user can do something about it,
//! a hint.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create cache directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Permission denied on cache entry '{path}'")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No space left to write cache entry '{path}'")]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reading an entry or listing the cache directory failed
    #[error("Failed to read '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write '{path}': {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A mirrored document or the sync time does not parse
    #[error("Invalid cached value for '{key}': {details}")]
    InvalidFormat { key: String, details: String },

    #[error("Invalid cache key '{0}': only ASCII letters, digits, '_' and '-' are allowed")]
    InvalidKey(String),

    /// The temp file was written but could not replace the entry
    #[error("Could not move '{from}' into place at '{to}': {source}")]
    AtomicWriteFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    /// Classify a failure while writing or removing the entry at `path`
    pub fn writing(error: io::Error, path: PathBuf) -> Self {
        if error.kind() == io::ErrorKind::PermissionDenied {
            StorageError::PermissionDenied {
                path,
                source: error,
            }
        } else if out_of_space(&error) {
            StorageError::DiskFull {
                path,
                source: error,
            }
        } else {
            StorageError::WriteError {
                path,
                source: error,
            }
        }
    }

    /// What the user can do about it, when anything
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::DiskFull { .. } => Some("Free up disk space and save again."),
            StorageError::PermissionDenied { .. } | StorageError::CreateDirectory { .. } => {
                Some("Check that you can write to the cache directory (see `folio status`).")
            }
            StorageError::InvalidFormat { .. } => {
                Some("Save the document again to overwrite the damaged cache entry.")
            }
            _ => None,
        }
    }
}

// ENOSPC on Linux and macOS; the message check covers the rest
fn out_of_space(error: &io::Error) -> bool {
    if cfg!(unix) && error.raw_os_error() == Some(28) {
        return true;
    }
    let msg = error.to_string().to_lowercase();
    msg.contains("no space left") || msg.contains("disk full") || msg.contains("quota exceeded")
}

/// Result type for cache operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> PathBuf {
        PathBuf::from("/cache/portfolioSkills")
    }

    #[test]
    fn test_denied_write_suggests_checking_cache_dir() {
        let err = StorageError::writing(
            io::Error::new(io::ErrorKind::PermissionDenied, "access denied"),
            entry(),
        );
        assert!(matches!(err, StorageError::PermissionDenied { .. }));
        assert!(err.to_string().contains("portfolioSkills"));
        assert!(err.recovery_suggestion().unwrap().contains("cache directory"));
    }

    #[test]
    fn test_full_disk_is_recognised() {
        #[cfg(unix)]
        {
            let by_code = StorageError::writing(io::Error::from_raw_os_error(28), entry());
            assert!(matches!(by_code, StorageError::DiskFull { .. }));
        }

        let by_message = StorageError::writing(
            io::Error::new(io::ErrorKind::Other, "No space left on device"),
            entry(),
        );
        assert!(matches!(by_message, StorageError::DiskFull { .. }));
    }

    #[test]
    fn test_other_write_failures_have_no_hint() {
        let err = StorageError::writing(io::Error::new(io::ErrorKind::Other, "bad fd"), entry());
        assert!(matches!(err, StorageError::WriteError { .. }));
        assert!(err.recovery_suggestion().is_none());
    }

    #[test]
    fn test_damaged_entry_hint() {
        let err = StorageError::InvalidFormat {
            key: "portfolioAbout".to_string(),
            details: "expected value at line 1".to_string(),
        };
        assert!(err.to_string().contains("portfolioAbout"));
        assert!(err.recovery_suggestion().unwrap().contains("Save the document again"));
    }
}
