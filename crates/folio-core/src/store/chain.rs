//! Ordered backend entries and their provisioning state
//!
//! Each registered backend is wrapped in a [`BackendEntry`] that tracks
//! whether it is ready to be used:
//!
//! ```text
//! Unconfigured ──► Provisioning ──► Ready
//!      │                │
//!      └────────────────┴──► Unavailable
//! ```
//!
//! Entries without a resource go straight from `Unconfigured` to `Ready`.
//! An `Unavailable` entry is skipped for the rest of the session unless a
//! new credential resets it. A `Ready` entry whose resource turns out to be
//! gone remotely drops back to `Unconfigured` and is provisioned again.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::backend::{Backend, BackendError, BackendResult};
use crate::storage::LocalCache;

/// Run one backend attempt, giving up after `limit`
pub(crate) async fn bounded<T>(
    limit: Duration,
    attempt: impl Future<Output = BackendResult<T>>,
) -> BackendResult<T> {
    match tokio::time::timeout(limit, attempt).await {
        Ok(result) => result,
        Err(_) => Err(BackendError::timed_out(limit)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryState {
    Unconfigured,
    Provisioning,
    Ready,
    Unavailable,
}

/// A backend plus its readiness
pub struct BackendEntry {
    backend: Box<dyn Backend>,
    state: EntryState,
}

impl BackendEntry {
    pub fn new(backend: Box<dyn Backend>) -> Self {
        Self {
            backend,
            state: EntryState::Unconfigured,
        }
    }

    pub fn name(&self) -> &str {
        self.backend.name()
    }

    pub fn state(&self) -> EntryState {
        self.state
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub(crate) fn backend_mut(&mut self) -> &mut dyn Backend {
        self.backend.as_mut()
    }

    /// Make the entry usable, provisioning its resource on first use
    ///
    /// A resource identifier found in the cache is reused; otherwise the
    /// resource is created once and its identifier persisted. Returns `false`
    /// when the entry has to be skipped.
    pub(crate) async fn prepare(&mut self, cache: &mut LocalCache, limit: Duration) -> bool {
        match self.state {
            EntryState::Ready => return true,
            EntryState::Unavailable | EntryState::Provisioning => return false,
            EntryState::Unconfigured => {}
        }

        if !self.backend.is_available() {
            debug!(backend = self.name(), "Credential missing, marking unavailable");
            self.state = EntryState::Unavailable;
            return false;
        }

        let Some(key) = self.backend.resource_key().map(str::to_string) else {
            self.state = EntryState::Ready;
            return true;
        };

        match cache.get(&key) {
            Ok(Some(id)) if !id.trim().is_empty() => {
                debug!(backend = self.name(), "Reusing stored resource identifier");
                self.backend.restore_resource(id.trim().to_string());
                self.state = EntryState::Ready;
                return true;
            }
            Ok(_) => {}
            Err(e) => warn!(
                backend = self.name(),
                error = %e,
                "Could not read resource identifier, provisioning a new one"
            ),
        }

        self.state = EntryState::Provisioning;
        let provisioned = bounded(limit, self.backend.provision()).await;
        match provisioned {
            Ok(id) => {
                info!(backend = self.name(), id = %id, "Provisioned remote resource");
                if let Err(e) = cache.set(&key, &id) {
                    warn!(
                        backend = self.name(),
                        error = %e,
                        "Could not persist resource identifier"
                    );
                }
                self.backend.restore_resource(id);
                self.state = EntryState::Ready;
                true
            }
            Err(e) => {
                warn!(
                    backend = self.name(),
                    error = %e,
                    "Provisioning failed, skipping backend for this session"
                );
                self.state = EntryState::Unavailable;
                false
            }
        }
    }

    /// Forget a provisioned resource the remote answered 404 for
    ///
    /// The stored identifier is removed so the next use provisions a fresh
    /// resource instead of failing against the deleted one forever.
    pub(crate) fn note_failure(&mut self, cache: &mut LocalCache, error: &BackendError) {
        if !matches!(error, BackendError::Rejected { status: 404, .. }) {
            return;
        }
        let Some(key) = self.backend.resource_key().map(str::to_string) else {
            return;
        };
        warn!(
            backend = self.name(),
            key = %key,
            "Remote resource no longer exists, dropping its identifier; a new one is created on next use"
        );
        if let Err(e) = cache.remove(&key) {
            warn!(backend = self.name(), key = %key, error = %e, "Could not remove stale identifier");
        }
        self.state = EntryState::Unconfigured;
    }

    /// Give an unavailable entry another chance after its credential changed
    pub(crate) fn reset(&mut self) {
        if self.state == EntryState::Unavailable {
            self.state = EntryState::Unconfigured;
        }
    }
}

/// Backends in registration order, plus the orders they are read and written in
#[derive(Default)]
pub struct FallbackChain {
    entries: Vec<BackendEntry>,
    read_order: Vec<String>,
    write_order: Vec<String>,
}

impl FallbackChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend
    ///
    /// Names identify entries in orders and credentials, so a backend whose
    /// name is already taken is dropped. Returns whether it was added.
    pub fn push(&mut self, backend: Box<dyn Backend>) -> bool {
        if self.position(backend.name()).is_some() {
            warn!(backend = backend.name(), "Ignoring second backend with the same name");
            return false;
        }
        self.entries.push(BackendEntry::new(backend));
        true
    }

    /// Builder form of [`push`](Self::push)
    pub fn with(mut self, backend: impl Backend + 'static) -> Self {
        self.push(Box::new(backend));
        self
    }

    /// Names to consult on load, in order. Empty means registration order.
    ///
    /// Only the named backends are read from. Unknown names are ignored.
    pub fn set_read_order(&mut self, names: Vec<String>) {
        self.warn_unknown(&names, "read_order");
        self.read_order = names;
    }

    /// Names to write on save, in order. Empty means registration order.
    pub fn set_write_order(&mut self, names: Vec<String>) {
        self.warn_unknown(&names, "write_order");
        self.write_order = names;
    }

    pub fn entries(&self) -> &[BackendEntry] {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [BackendEntry] {
        &mut self.entries
    }

    pub(crate) fn entry_mut(&mut self, index: usize) -> &mut BackendEntry {
        &mut self.entries[index]
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name() == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn read_indices(&self) -> Vec<usize> {
        self.resolve(&self.read_order)
    }

    pub(crate) fn write_indices(&self) -> Vec<usize> {
        self.resolve(&self.write_order)
    }

    pub fn read_names(&self) -> Vec<&str> {
        self.names(self.read_indices())
    }

    pub fn write_names(&self) -> Vec<&str> {
        self.names(self.write_indices())
    }

    fn names(&self, indices: Vec<usize>) -> Vec<&str> {
        indices.into_iter().map(|i| self.entries[i].name()).collect()
    }

    fn resolve(&self, order: &[String]) -> Vec<usize> {
        if order.is_empty() {
            return (0..self.entries.len()).collect();
        }
        let mut indices = Vec::with_capacity(order.len());
        for name in order {
            if let Some(index) = self.position(name) {
                if !indices.contains(&index) {
                    indices.push(index);
                }
            }
        }
        indices
    }

    fn warn_unknown(&self, names: &[String], setting: &str) {
        for name in names {
            if self.position(name).is_none() {
                warn!(backend = %name, setting, "Ignoring unknown backend name");
            }
        }
    }
}
