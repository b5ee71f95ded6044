//! Storage backends
//!
//! Every remote medium a document can be persisted to sits behind the same
//! [`Backend`] trait. The store only ever talks to backends through it, so
//! adding a medium means adding an adapter here, nothing else.
//!
//! ## Adapters
//!
//! - [`GitHubBackend`]: contents API of a repository (versioned files)
//! - [`GistBackend`]: one private gist holding every document (lazily created)
//! - [`JsonBinBackend`]: JSON-bin document store (lazily created bin)
//! - [`PagesBackend`]: published site, read-only
//! - [`FunctionsBackend`]: serverless save/load endpoints
//! - [`SimulatedBackend`]: in-memory stand-in, never durable

mod error;
mod functions;
mod gist;
mod github;
mod http;
mod jsonbin;
mod pages;
mod simulated;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::document::{ContentDocument, DocumentType};

pub use error::{BackendError, BackendResult};
pub use functions::FunctionsBackend;
pub use gist::GistBackend;
pub use github::GitHubBackend;
pub use jsonbin::JsonBinBackend;
pub use pages::PagesBackend;
pub use simulated::SimulatedBackend;

/// Whether a backend actually keeps data beyond the current process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Durability {
    /// Writes survive the process (remote service)
    Durable,
    /// Writes are kept in memory only; acceptance is not a real save
    Simulated,
}

/// A storage medium that can hold content documents
///
/// Attempts report failures as values; the store decides what a failure
/// means for the overall call. Implementations must not block: the store
/// bounds every attempt with a timeout but a well-behaved adapter also sets
/// its own.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Stable name used in configuration and reports
    fn name(&self) -> &str;

    fn durability(&self) -> Durability {
        Durability::Durable
    }

    /// Read-only backends are skipped when saving
    fn is_writable(&self) -> bool {
        true
    }

    /// Whether the backend has what it needs to be tried (e.g. a credential)
    fn is_available(&self) -> bool;

    /// Cache key under which this backend's credential is remembered
    fn credential_key(&self) -> Option<&str> {
        None
    }

    /// Supply a credential (token, API key)
    fn set_credential(&mut self, _value: String) {}

    /// Cache key under which a provisioned resource identifier is remembered
    ///
    /// Backends returning `Some` are provisioned once before first use.
    fn resource_key(&self) -> Option<&str> {
        None
    }

    /// Adopt a resource identifier created earlier
    fn restore_resource(&mut self, _id: String) {}

    /// Create the remote resource and return its identifier
    async fn provision(&mut self) -> BackendResult<String> {
        Err(BackendError::Rejected {
            status: 501,
            message: format!("{} does not provision resources", self.name()),
        })
    }

    /// When the backend's content last changed, if it can tell
    async fn last_modified(&mut self) -> BackendResult<Option<DateTime<Utc>>> {
        Ok(None)
    }

    /// Fetch a document; `Ok(None)` when the backend has none
    async fn attempt_get(
        &mut self,
        doc_type: DocumentType,
    ) -> BackendResult<Option<ContentDocument>>;

    /// Store a document, replacing what the backend held
    async fn attempt_put(
        &mut self,
        doc_type: DocumentType,
        document: &ContentDocument,
    ) -> BackendResult<()>;
}
