//! Local key/value cache
//!
//! The cache is the mirror every save lands in and every load checks first.
//! It also keeps backend credentials, provisioned resource identifiers and
//! the last sync timestamp between sessions.
//!
//! On disk each key is one file in the cache directory, named after the key
//! with no extension, holding the raw value (JSON for documents, plain text
//! for everything else). Writes go through a temp file and a rename so an
//! entry is never left half-written.
//!
//! Files:
//! - `portfolioProjects`, `portfolioSkills`, ... - mirrored documents (JSON)
//! - `github_token`, `jsonbin_master_key` - backend credentials
//! - `portfolioCloudBinId`, `portfolioGistId` - provisioned remote identifiers
//! - `lastSyncTime` - RFC 3339 timestamp of the last remote sync

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::{StorageError, StorageResult};
use crate::document::{ContentDocument, DocumentType};

/// Key holding the timestamp of the last successful remote sync
pub const LAST_SYNC_KEY: &str = "lastSyncTime";

enum Medium {
    Disk(PathBuf),
    Memory(BTreeMap<String, String>),
}

/// Durable local mirror for documents and backend state
pub struct LocalCache {
    medium: Medium,
}

impl LocalCache {
    /// Open a cache rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StorageError::CreateDirectory {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            medium: Medium::Disk(dir),
        })
    }

    /// Create a cache that lives only as long as this value
    pub fn in_memory() -> Self {
        Self {
            medium: Medium::Memory(BTreeMap::new()),
        }
    }

    /// Directory backing this cache, if it is on disk
    pub fn location(&self) -> Option<&Path> {
        match &self.medium {
            Medium::Disk(dir) => Some(dir),
            Medium::Memory(_) => None,
        }
    }

    /// Read a raw value
    pub fn get(&self, key: &str) -> StorageResult<Option<String>> {
        validate_key(key)?;
        match &self.medium {
            Medium::Memory(entries) => Ok(entries.get(key).cloned()),
            Medium::Disk(dir) => {
                let path = dir.join(key);
                match fs::read_to_string(&path) {
                    Ok(content) => Ok(Some(content)),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                    Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                        Err(StorageError::PermissionDenied { path, source: e })
                    }
                    Err(source) => Err(StorageError::ReadError { path, source }),
                }
            }
        }
    }

    /// Write a raw value, replacing any previous one
    pub fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        validate_key(key)?;
        match &mut self.medium {
            Medium::Memory(entries) => {
                entries.insert(key.to_string(), value.to_string());
                Ok(())
            }
            Medium::Disk(dir) => atomic_write(&dir.join(key), value.as_bytes()),
        }
    }

    /// Remove a value. Returns whether it existed.
    pub fn remove(&mut self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        match &mut self.medium {
            Medium::Memory(entries) => Ok(entries.remove(key).is_some()),
            Medium::Disk(dir) => {
                let path = dir.join(key);
                match fs::remove_file(&path) {
                    Ok(()) => Ok(true),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
                    Err(e) => Err(StorageError::writing(e, path)),
                }
            }
        }
    }

    /// All keys currently present, sorted
    pub fn keys(&self) -> StorageResult<Vec<String>> {
        match &self.medium {
            Medium::Memory(entries) => Ok(entries.keys().cloned().collect()),
            Medium::Disk(dir) => {
                let mut keys = Vec::new();
                let entries = fs::read_dir(dir).map_err(|source| StorageError::ReadError {
                    path: dir.clone(),
                    source,
                })?;
                for entry in entries {
                    let entry = entry.map_err(|source| StorageError::ReadError {
                        path: dir.clone(),
                        source,
                    })?;
                    let is_file = entry
                        .file_type()
                        .map_err(|source| StorageError::ReadError {
                            path: entry.path(),
                            source,
                        })?
                        .is_file();
                    if !is_file {
                        continue;
                    }
                    if let Some(name) = entry.file_name().to_str() {
                        if validate_key(name).is_ok() {
                            keys.push(name.to_string());
                        }
                    }
                }
                keys.sort();
                Ok(keys)
            }
        }
    }

    /// Read and deserialize a JSON value
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        let Some(raw) = self.get(key)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StorageError::InvalidFormat {
                key: key.to_string(),
                details: e.to_string(),
            })
    }

    /// Serialize and write a JSON value
    pub fn set_json<T: Serialize>(&mut self, key: &str, value: &T) -> StorageResult<()> {
        let raw = serde_json::to_string(value).map_err(|e| StorageError::InvalidFormat {
            key: key.to_string(),
            details: e.to_string(),
        })?;
        self.set(key, &raw)
    }

    /// Read the mirrored copy of a document
    pub fn get_document(&self, doc_type: DocumentType) -> StorageResult<Option<ContentDocument>> {
        self.get_json(&doc_type.cache_key())
    }

    /// Mirror a document
    pub fn put_document(
        &mut self,
        doc_type: DocumentType,
        document: &ContentDocument,
    ) -> StorageResult<()> {
        self.set_json(&doc_type.cache_key(), document)
    }

    /// When the cache last synced with a durable remote
    pub fn last_sync(&self) -> StorageResult<Option<DateTime<Utc>>> {
        let Some(raw) = self.get(LAST_SYNC_KEY)? else {
            return Ok(None);
        };
        DateTime::parse_from_rfc3339(raw.trim())
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|e| StorageError::InvalidFormat {
                key: LAST_SYNC_KEY.to_string(),
                details: e.to_string(),
            })
    }

    /// Record a remote sync at `at`
    pub fn record_sync(&mut self, at: DateTime<Utc>) -> StorageResult<()> {
        self.set(LAST_SYNC_KEY, &at.to_rfc3339())
    }
}

fn validate_key(key: &str) -> StorageResult<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let temp_path = path.with_extension("tmp");

    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::writing(e, temp_path.clone()))?;
    file.write_all(data)
        .map_err(|e| StorageError::writing(e, temp_path.clone()))?;
    file.sync_all()
        .map_err(|e| StorageError::writing(e, temp_path.clone()))?;

    fs::rename(&temp_path, path).map_err(|source| StorageError::AtomicWriteFailed {
        from: temp_path,
        to: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_set_and_get_on_disk() {
        let temp_dir = TempDir::new().unwrap();
        let mut cache = LocalCache::open(temp_dir.path()).unwrap();

        assert!(cache.get("github_token").unwrap().is_none());
        cache.set("github_token", "ghp_abc").unwrap();
        assert_eq!(cache.get("github_token").unwrap().as_deref(), Some("ghp_abc"));
        assert!(temp_dir.path().join("github_token").exists());
    }

    #[test]
    fn test_entries_are_raw_files_named_after_keys() {
        let temp_dir = TempDir::new().unwrap();
        let mut cache = LocalCache::open(temp_dir.path()).unwrap();
        cache.set("portfolioCloudBinId", "bin-42").unwrap();
        cache
            .put_document(DocumentType::Skills, &json!([{"id": 1}]))
            .unwrap();

        let dir = temp_dir.path();
        assert_eq!(
            fs::read_to_string(dir.join("portfolioCloudBinId")).unwrap(),
            "bin-42"
        );
        assert_eq!(
            fs::read_to_string(dir.join("portfolioSkills")).unwrap(),
            r#"[{"id":1}]"#
        );
        assert!(!dir.join("portfolioSkills.json").exists());

        // Leftover temp files are not keys
        fs::write(dir.join("portfolioAbout.tmp"), "{").unwrap();
        assert_eq!(
            cache.keys().unwrap(),
            vec!["portfolioCloudBinId".to_string(), "portfolioSkills".to_string()]
        );
    }

    #[test]
    fn test_values_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let mut cache = LocalCache::open(temp_dir.path()).unwrap();
            cache
                .put_document(DocumentType::Skills, &json!([{"id": 1, "name": "Go"}]))
                .unwrap();
        }

        let cache = LocalCache::open(temp_dir.path()).unwrap();
        let doc = cache.get_document(DocumentType::Skills).unwrap().unwrap();
        assert_eq!(doc, json!([{"id": 1, "name": "Go"}]));
    }

    #[test]
    fn test_documents_use_portfolio_keys() {
        let temp_dir = TempDir::new().unwrap();
        let mut cache = LocalCache::open(temp_dir.path()).unwrap();
        cache
            .put_document(DocumentType::About, &json!({"name": "Ada"}))
            .unwrap();

        assert!(temp_dir.path().join("portfolioAbout").exists());
        assert_eq!(cache.keys().unwrap(), vec!["portfolioAbout".to_string()]);
    }

    #[test]
    fn test_malformed_document_is_invalid_format() {
        let temp_dir = TempDir::new().unwrap();
        let mut cache = LocalCache::open(temp_dir.path()).unwrap();
        cache.set("portfolioProjects", "{not json").unwrap();

        let err = cache.get_document(DocumentType::Projects).unwrap_err();
        assert!(matches!(err, StorageError::InvalidFormat { .. }));
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let mut cache = LocalCache::in_memory();
        assert!(matches!(
            cache.set("../escape", "x"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(cache.get(""), Err(StorageError::InvalidKey(_))));
    }

    #[test]
    fn test_remove() {
        let temp_dir = TempDir::new().unwrap();
        let mut cache = LocalCache::open(temp_dir.path()).unwrap();
        cache.set("portfolioCloudBinId", "bin-1").unwrap();

        assert!(cache.remove("portfolioCloudBinId").unwrap());
        assert!(!cache.remove("portfolioCloudBinId").unwrap());
        assert!(cache.get("portfolioCloudBinId").unwrap().is_none());
    }

    #[test]
    fn test_last_sync_round_trip() {
        let mut cache = LocalCache::in_memory();
        assert!(cache.last_sync().unwrap().is_none());

        let now = Utc::now();
        cache.record_sync(now).unwrap();
        let stored = cache.last_sync().unwrap().unwrap();
        assert_eq!(stored.timestamp(), now.timestamp());
    }

    #[test]
    fn test_in_memory_has_no_location() {
        let cache = LocalCache::in_memory();
        assert!(cache.location().is_none());
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let nested_path = temp_dir.path().join("a").join("b").join("entry");

        atomic_write(&nested_path, b"test data").unwrap();

        assert!(nested_path.exists());
        assert_eq!(fs::read_to_string(&nested_path).unwrap(), "test data");
        assert!(!nested_path.with_extension("tmp").exists());
    }
}
