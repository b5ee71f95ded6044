//! Test doubles shared by the unit tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use chrono::{DateTime, Utc};

use crate::backend::{Backend, BackendError, BackendResult, Durability};
use crate::document::{ContentDocument, DocumentType};

/// Serve `router` on an ephemeral local port and return its base URL
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// A base URL nothing is listening on
pub async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Call counters observable after the fake is moved into a store
#[derive(Debug, Default)]
pub struct Calls {
    pub gets: AtomicUsize,
    pub puts: AtomicUsize,
    pub provisions: AtomicUsize,
}

impl Calls {
    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn provisions(&self) -> usize {
        self.provisions.load(Ordering::SeqCst)
    }
}

/// How a fake backend behaves
#[derive(Debug, Clone)]
pub enum Mode {
    /// Serve and store documents in memory
    Working,
    /// Fail every attempt with this error
    Failing(BackendError),
    /// Never answer (exercises the store's timeout)
    Hanging,
}

/// In-memory backend with switchable behavior
pub struct FakeBackend {
    name: String,
    mode: Mode,
    available: bool,
    writable: bool,
    durability: Durability,
    resource_key: Option<String>,
    resource: Option<String>,
    provision_result: BackendResult<String>,
    changed_at: Option<DateTime<Utc>>,
    pub documents: Arc<Mutex<HashMap<DocumentType, ContentDocument>>>,
    pub calls: Arc<Calls>,
}

impl FakeBackend {
    pub fn working(name: &str) -> Self {
        Self {
            name: name.to_string(),
            mode: Mode::Working,
            available: true,
            writable: true,
            durability: Durability::Durable,
            resource_key: None,
            resource: None,
            provision_result: Ok(format!("{}-resource", name)),
            changed_at: None,
            documents: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Calls::default()),
        }
    }

    pub fn failing(name: &str, error: BackendError) -> Self {
        Self {
            mode: Mode::Failing(error),
            ..Self::working(name)
        }
    }

    pub fn hanging(name: &str) -> Self {
        Self {
            mode: Mode::Hanging,
            ..Self::working(name)
        }
    }

    pub fn with_document(self, doc_type: DocumentType, document: ContentDocument) -> Self {
        self.documents.lock().unwrap().insert(doc_type, document);
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    pub fn simulated(mut self) -> Self {
        self.durability = Durability::Simulated;
        self
    }

    pub fn provisioned_at(mut self, key: &str) -> Self {
        self.resource_key = Some(key.to_string());
        self
    }

    pub fn provision_fails(mut self, error: BackendError) -> Self {
        self.provision_result = Err(error);
        self
    }

    pub fn changed_at(mut self, at: DateTime<Utc>) -> Self {
        self.changed_at = Some(at);
        self
    }

    async fn behave(&self) -> BackendResult<()> {
        match &self.mode {
            Mode::Working => Ok(()),
            Mode::Failing(error) => Err(error.clone()),
            Mode::Hanging => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
        }
    }

    fn check_resource(&self) -> BackendResult<()> {
        if self.resource_key.is_some() && self.resource.is_none() {
            return Err(BackendError::CredentialMissing("resource".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for FakeBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn durability(&self) -> Durability {
        self.durability
    }

    fn is_writable(&self) -> bool {
        self.writable
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn credential_key(&self) -> Option<&str> {
        Some("fake_token")
    }

    fn set_credential(&mut self, _value: String) {
        self.available = true;
    }

    fn resource_key(&self) -> Option<&str> {
        self.resource_key.as_deref()
    }

    fn restore_resource(&mut self, id: String) {
        self.resource = Some(id);
    }

    async fn provision(&mut self) -> BackendResult<String> {
        self.calls.provisions.fetch_add(1, Ordering::SeqCst);
        self.provision_result.clone()
    }

    async fn last_modified(&mut self) -> BackendResult<Option<DateTime<Utc>>> {
        self.behave().await?;
        Ok(self.changed_at)
    }

    async fn attempt_get(
        &mut self,
        doc_type: DocumentType,
    ) -> BackendResult<Option<ContentDocument>> {
        self.calls.gets.fetch_add(1, Ordering::SeqCst);
        self.behave().await?;
        self.check_resource()?;
        Ok(self.documents.lock().unwrap().get(&doc_type).cloned())
    }

    async fn attempt_put(
        &mut self,
        doc_type: DocumentType,
        document: &ContentDocument,
    ) -> BackendResult<()> {
        self.calls.puts.fetch_add(1, Ordering::SeqCst);
        self.behave().await?;
        self.check_resource()?;
        self.documents
            .lock()
            .unwrap()
            .insert(doc_type, document.clone());
        Ok(())
    }
}
