//! In-memory stand-in backend
//!
//! Stands in for services that are named in configuration but not actually
//! wired up (Firebase, Supabase). It keeps documents for the life of the
//! process only and reports itself as [`Durability::Simulated`], so a save
//! it accepts is never counted as a durable remote save.

use std::collections::HashMap;

use async_trait::async_trait;

use super::error::BackendResult;
use super::{Backend, Durability};
use crate::document::{ContentDocument, DocumentType};

pub struct SimulatedBackend {
    name: String,
    documents: HashMap<DocumentType, ContentDocument>,
}

impl SimulatedBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            documents: HashMap::new(),
        }
    }
}

#[async_trait]
impl Backend for SimulatedBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn durability(&self) -> Durability {
        Durability::Simulated
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn attempt_get(
        &mut self,
        doc_type: DocumentType,
    ) -> BackendResult<Option<ContentDocument>> {
        Ok(self.documents.get(&doc_type).cloned())
    }

    async fn attempt_put(
        &mut self,
        doc_type: DocumentType,
        document: &ContentDocument,
    ) -> BackendResult<()> {
        self.documents.insert(doc_type, document.clone());
        Ok(())
    }
}
