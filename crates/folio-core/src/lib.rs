//! Folio Core Library
//!
//! Persistence for a portfolio site's content documents (projects, skills,
//! about, settings) across several redundant storage backends, with a local
//! cache that always holds the last saved copy.
//!
//! # Architecture
//!
//! - **LocalCache**: per-key files on disk, the mirror every save lands in
//! - **Backends**: GitHub contents API, a private gist, JSON-bin, serverless
//!   functions, the published site (read-only) and in-memory stand-ins
//! - **ContentStore**: ordered fallback reads, best-effort fan-out writes
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let mut store = config.build_store()?;
//!
//! let report = store.save(DocumentType::Skills, &skills).await?;
//! println!("{:?}", report.outcome());
//!
//! let settings = store.load(DocumentType::Settings).await;
//! ```
//!
//! # Modules
//!
//! - `store`: Content store and fallback chain (main entry point)
//! - `backend`: Backend trait and adapters
//! - `document`: Document types and built-in defaults
//! - `storage`: Local cache
//! - `config`: Application configuration

pub mod backend;
pub mod config;
pub mod document;
pub mod storage;
pub mod store;

#[cfg(test)]
mod testing;

pub use backend::{Backend, BackendError, BackendResult, Durability};
pub use config::Config;
pub use document::{ContentDocument, DocumentType, UnknownDocumentType};
pub use storage::{LocalCache, StorageError, StorageResult};
pub use store::{
    AttemptRecord, AttemptStatus, ContentStore, CredentialError, EntryState, FallbackChain,
    LoadSource, SaveOutcome, SaveReport, StoreStatus, UpdateCheck,
};
