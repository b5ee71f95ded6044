//! Content store
//!
//! The `ContentStore` saves and loads the portfolio's content documents
//! through a [`FallbackChain`] of remote backends, with the [`LocalCache`]
//! as an always-written mirror:
//!
//! - **save** tries every writable remote in write order, then writes the
//!   mirror. One remote failing never fails the save.
//! - **load** answers from the mirror when it can, otherwise from the first
//!   remote (in read order) that has the document, otherwise from the
//!   built-in default. It never fails.
//!
//! - **check_for_updates** asks the remotes when their content last changed
//!   and pulls everything only when that is newer than the last sync.
//!
//! Every backend attempt is bounded by the configured attempt timeout.
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = ContentStore::from_config(&config)?;
//!
//! let report = store.save(DocumentType::Skills, &skills).await?;
//! if report.outcome() == SaveOutcome::LocalOnly {
//!     // only on this machine for now
//! }
//!
//! let about = store.load(DocumentType::About).await;
//! ```

mod chain;
mod report;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::backend::{
    Durability, FunctionsBackend, GistBackend, GitHubBackend, JsonBinBackend, PagesBackend,
    SimulatedBackend,
};
use crate::config::Config;
use crate::document::{ContentDocument, DocumentType};
use crate::storage::{LocalCache, StorageError, StorageResult};

pub use chain::{BackendEntry, EntryState, FallbackChain};
pub use report::{AttemptRecord, AttemptStatus, LoadSource, SaveOutcome, SaveReport, SkipReason};

use chain::bounded;

/// Why a credential could not be stored
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("No backend named '{0}' is configured")]
    UnknownBackend(String),

    #[error("Backend '{0}' does not take a credential")]
    NotAccepted(String),

    #[error("Credential for '{0}' is empty")]
    Empty(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Snapshot of one backend entry
#[derive(Debug, Clone, Serialize)]
pub struct EntryStatus {
    pub name: String,
    pub durability: Durability,
    pub writable: bool,
    pub available: bool,
    pub state: EntryState,
}

/// Snapshot of the whole store
#[derive(Debug, Clone, Serialize)]
pub struct StoreStatus {
    pub entries: Vec<EntryStatus>,
    pub read_order: Vec<String>,
    pub write_order: Vec<String>,
    pub cache_location: Option<PathBuf>,
    pub last_sync: Option<DateTime<Utc>>,
}

/// What [`ContentStore::check_for_updates`] found
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateCheck {
    /// No backend can tell when its content last changed; nothing was pulled
    Unknown,
    /// Nothing changed remotely since the last sync
    UpToDate {
        remote: DateTime<Utc>,
        last_sync: DateTime<Utc>,
    },
    /// Remote content was newer (or there was no sync yet) and was pulled
    Refreshed {
        remote: DateTime<Utc>,
        documents: Vec<(DocumentType, Option<String>)>,
    },
}

struct Fetched {
    document: ContentDocument,
    backend: String,
    durability: Durability,
}

/// Saves and loads content documents across the fallback chain
pub struct ContentStore {
    cache: LocalCache,
    chain: FallbackChain,
    attempt_timeout: Duration,
}

impl ContentStore {
    /// Create a store over `cache` and `chain`
    ///
    /// Backends that declare a credential key and have no credential yet
    /// receive the one remembered in the cache.
    pub fn new(cache: LocalCache, chain: FallbackChain, attempt_timeout: Duration) -> Self {
        let mut store = Self {
            cache,
            chain,
            attempt_timeout,
        };
        store.restore_credentials();
        store
    }

    /// Build the store described by `config`
    ///
    /// Remotes are registered as github, gist, jsonbin, functions, pages,
    /// then the simulated stand-ins, which is also the default read and
    /// write order. A simulated name that is already taken is ignored.
    pub fn from_config(config: &Config) -> Result<Self> {
        let timeout = config.attempt_timeout();
        let cache_dir = config.cache_dir();
        let cache = LocalCache::open(&cache_dir)
            .with_context(|| format!("Failed to open cache at {:?}", cache_dir))?;

        let mut chain = FallbackChain::new();
        if let Some(github) = &config.github {
            chain.push(Box::new(GitHubBackend::new(github, timeout)?));
        }
        if let Some(gist) = &config.gist {
            let token = config.github.as_ref().and_then(|github| github.token.clone());
            chain.push(Box::new(GistBackend::new(gist, token, timeout)?));
        }
        if let Some(jsonbin) = &config.jsonbin {
            chain.push(Box::new(JsonBinBackend::new(jsonbin, timeout)?));
        }
        if let Some(functions) = &config.functions {
            chain.push(Box::new(FunctionsBackend::new(functions, timeout)?));
        }
        if let Some(pages) = &config.pages {
            chain.push(Box::new(PagesBackend::new(pages, timeout)?));
        }
        for name in &config.simulated {
            chain.push(Box::new(SimulatedBackend::new(name.clone())));
        }
        chain.set_read_order(config.read_order.clone());
        chain.set_write_order(config.write_order.clone());

        debug!(backends = chain.len(), "Content store assembled");
        Ok(Self::new(cache, chain, timeout))
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    pub fn chain(&self) -> &FallbackChain {
        &self.chain
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    /// Save a document to every writable remote, then to the local mirror
    ///
    /// Remote failures are recorded in the report, not returned. The only
    /// error is failing to write the mirror itself.
    pub async fn save(
        &mut self,
        doc_type: DocumentType,
        document: &ContentDocument,
    ) -> StorageResult<SaveReport> {
        let limit = self.attempt_timeout;
        let mut attempts = Vec::new();

        for index in self.chain.write_indices() {
            let entry = self.chain.entry_mut(index);
            let backend = entry.name().to_string();
            let durability = entry.backend().durability();

            let status = if !entry.backend().is_writable() {
                AttemptStatus::Skipped(SkipReason::ReadOnly)
            } else if !entry.prepare(&mut self.cache, limit).await {
                AttemptStatus::Skipped(SkipReason::Unavailable)
            } else {
                debug!(backend = %backend, doc_type = %doc_type, "Saving to backend");
                match bounded(limit, entry.backend_mut().attempt_put(doc_type, document)).await {
                    Ok(()) => AttemptStatus::Accepted,
                    Err(e) => {
                        warn!(backend = %backend, doc_type = %doc_type, error = %e, "Save failed");
                        entry.note_failure(&mut self.cache, &e);
                        AttemptStatus::Failed(e)
                    }
                }
            };

            attempts.push(AttemptRecord {
                backend,
                durability,
                status,
            });
        }

        self.cache.put_document(doc_type, document)?;

        let report = SaveReport {
            doc_type,
            attempts,
            saved_at: Utc::now(),
        };
        match report.outcome() {
            SaveOutcome::Durable => {
                info!(
                    doc_type = %doc_type,
                    backends = ?report.durable_backends(),
                    "Saved"
                );
                if let Err(e) = self.cache.record_sync(report.saved_at) {
                    warn!(error = %e, "Could not record sync time");
                }
            }
            SaveOutcome::LocalOnly => {
                warn!(doc_type = %doc_type, "No durable backend accepted the save, kept locally only");
            }
        }
        Ok(report)
    }

    /// Load a document; falls back to the built-in default, never fails
    pub async fn load(&mut self, doc_type: DocumentType) -> ContentDocument {
        self.load_with_source(doc_type).await.0
    }

    /// Load a document and report where it came from
    pub async fn load_with_source(&mut self, doc_type: DocumentType) -> (ContentDocument, LoadSource) {
        match self.cache.get_document(doc_type) {
            Ok(Some(document)) => return (document, LoadSource::Cache),
            Ok(None) => {}
            Err(e) => warn!(doc_type = %doc_type, error = %e, "Ignoring unreadable cached copy"),
        }

        if let Some(fetched) = self.fetch_remote(doc_type).await {
            if let Err(e) = self.cache.put_document(doc_type, &fetched.document) {
                warn!(doc_type = %doc_type, error = %e, "Could not mirror loaded document");
            }
            return (fetched.document, LoadSource::Remote(fetched.backend));
        }

        debug!(doc_type = %doc_type, "Using built-in default");
        (doc_type.default_document(), LoadSource::Default)
    }

    /// Re-fetch a document from the remotes, bypassing the mirror
    ///
    /// On a hit the mirror is overwritten. Returns the name of the backend
    /// that answered, or `None` when no remote has the document.
    pub async fn refresh(&mut self, doc_type: DocumentType) -> StorageResult<Option<String>> {
        let Some(fetched) = self.fetch_remote(doc_type).await else {
            debug!(doc_type = %doc_type, "No remote has this document, mirror untouched");
            return Ok(None);
        };

        self.cache.put_document(doc_type, &fetched.document)?;
        if fetched.durability == Durability::Durable {
            self.cache.record_sync(Utc::now())?;
        }
        info!(doc_type = %doc_type, backend = %fetched.backend, "Refreshed from remote");
        Ok(Some(fetched.backend))
    }

    /// [`refresh`](Self::refresh) every document type
    pub async fn refresh_all(&mut self) -> StorageResult<Vec<(DocumentType, Option<String>)>> {
        let mut results = Vec::with_capacity(DocumentType::ALL.len());
        for doc_type in DocumentType::ALL {
            results.push((doc_type, self.refresh(doc_type).await?));
        }
        Ok(results)
    }

    /// Pull everything when a remote changed since the last sync
    ///
    /// Every backend in read order that can tell when its content last
    /// changed is asked; the newest answer wins. Without any answer nothing
    /// is pulled.
    pub async fn check_for_updates(&mut self) -> StorageResult<UpdateCheck> {
        let Some(remote) = self.latest_remote_change().await else {
            debug!("No backend reports when its content changed");
            return Ok(UpdateCheck::Unknown);
        };

        let last_sync = self.cache.last_sync().unwrap_or_else(|e| {
            warn!(error = %e, "Ignoring unreadable sync time");
            None
        });
        if let Some(last_sync) = last_sync {
            if remote <= last_sync {
                debug!(remote = %remote, last_sync = %last_sync, "Local copies are up to date");
                return Ok(UpdateCheck::UpToDate { remote, last_sync });
            }
        }

        info!(remote = %remote, last_sync = ?last_sync, "Remote content changed, refreshing");
        let documents = self.refresh_all().await?;
        Ok(UpdateCheck::Refreshed { remote, documents })
    }

    /// Remember a credential for `backend` and hand it over
    ///
    /// Every entry sharing the same credential key (github and gist both use
    /// the GitHub token) receives it. An entry that was unavailable gets
    /// another chance on its next use.
    pub fn set_credential(&mut self, backend: &str, value: &str) -> Result<(), CredentialError> {
        let value = value.trim();
        let index = self
            .chain
            .position(backend)
            .ok_or_else(|| CredentialError::UnknownBackend(backend.to_string()))?;
        let entry = self.chain.entry_mut(index);
        let Some(key) = entry.backend().credential_key().map(str::to_string) else {
            return Err(CredentialError::NotAccepted(backend.to_string()));
        };
        if value.is_empty() {
            return Err(CredentialError::Empty(backend.to_string()));
        }

        self.cache.set(&key, value)?;
        for entry in self.chain.entries_mut() {
            if entry.backend().credential_key() == Some(key.as_str()) {
                entry.backend_mut().set_credential(value.to_string());
                entry.reset();
            }
        }
        info!(backend, key = %key, "Credential stored");
        Ok(())
    }

    /// Per-entry snapshot plus the last sync time
    pub fn status(&self) -> StoreStatus {
        let entries = self
            .chain
            .entries()
            .iter()
            .map(|entry| {
                let backend = entry.backend();
                EntryStatus {
                    name: entry.name().to_string(),
                    durability: backend.durability(),
                    writable: backend.is_writable(),
                    available: backend.is_available(),
                    state: entry.state(),
                }
            })
            .collect();

        let last_sync = self.cache.last_sync().unwrap_or_else(|e| {
            warn!(error = %e, "Ignoring unreadable sync time");
            None
        });

        StoreStatus {
            entries,
            read_order: owned(self.chain.read_names()),
            write_order: owned(self.chain.write_names()),
            cache_location: self.cache.location().map(Path::to_path_buf),
            last_sync,
        }
    }

    /// First remote, in read order, that has the document
    async fn fetch_remote(&mut self, doc_type: DocumentType) -> Option<Fetched> {
        let limit = self.attempt_timeout;
        for index in self.chain.read_indices() {
            let entry = self.chain.entry_mut(index);
            if !entry.prepare(&mut self.cache, limit).await {
                continue;
            }
            let backend = entry.name().to_string();
            let durability = entry.backend().durability();

            debug!(backend = %backend, doc_type = %doc_type, "Loading from backend");
            match bounded(limit, entry.backend_mut().attempt_get(doc_type)).await {
                Ok(Some(Value::Null)) => {
                    debug!(backend = %backend, doc_type = %doc_type, "Backend returned null, treating as absent")
                }
                Ok(Some(document)) => {
                    return Some(Fetched {
                        document,
                        backend,
                        durability,
                    })
                }
                Ok(None) => debug!(backend = %backend, doc_type = %doc_type, "Not found"),
                Err(e) => {
                    warn!(backend = %backend, doc_type = %doc_type, error = %e, "Load failed");
                    entry.note_failure(&mut self.cache, &e);
                }
            }
        }
        None
    }

    /// Newest change time reported by any backend in read order
    async fn latest_remote_change(&mut self) -> Option<DateTime<Utc>> {
        let limit = self.attempt_timeout;
        let mut latest: Option<DateTime<Utc>> = None;
        for index in self.chain.read_indices() {
            let entry = self.chain.entry_mut(index);
            if !entry.prepare(&mut self.cache, limit).await {
                continue;
            }
            let backend = entry.name().to_string();
            match bounded(limit, entry.backend_mut().last_modified()).await {
                Ok(Some(changed)) => {
                    debug!(backend = %backend, changed = %changed, "Backend reports last change");
                    latest = latest.max(Some(changed));
                }
                Ok(None) => {}
                Err(e) => warn!(backend = %backend, error = %e, "Could not check for updates"),
            }
        }
        latest
    }

    fn restore_credentials(&mut self) {
        for entry in self.chain.entries_mut() {
            let backend = entry.backend_mut();
            if backend.is_available() {
                continue;
            }
            let Some(key) = backend.credential_key().map(str::to_string) else {
                continue;
            };
            match self.cache.get(&key) {
                Ok(Some(value)) if !value.trim().is_empty() => {
                    debug!(backend = backend.name(), "Using stored credential");
                    backend.set_credential(value.trim().to_string());
                }
                Ok(_) => {}
                Err(e) => warn!(backend = backend.name(), error = %e, "Could not read stored credential"),
            }
        }
    }
}

fn owned(names: Vec<&str>) -> Vec<String> {
    names.into_iter().map(str::to_string).collect()
}
