//! Published site backend (read-only)
//!
//! Reads the `content/<type>/<type>.json` files straight from the deployed
//! site. Whatever was last committed and published is what it serves, so it
//! is useful as a read fallback but can never be written to.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use super::error::{BackendError, BackendResult};
use super::http::{build_client, join_url, rejection};
use super::Backend;
use crate::config::PagesConfig;
use crate::document::{ContentDocument, DocumentType};

pub struct PagesBackend {
    client: Client,
    site_url: String,
}

impl PagesBackend {
    pub fn new(config: &PagesConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            site_url: config.site_url.clone(),
        })
    }
}

#[async_trait]
impl Backend for PagesBackend {
    fn name(&self) -> &str {
        "pages"
    }

    fn is_writable(&self) -> bool {
        false
    }

    fn is_available(&self) -> bool {
        !self.site_url.is_empty()
    }

    async fn attempt_get(
        &mut self,
        doc_type: DocumentType,
    ) -> BackendResult<Option<ContentDocument>> {
        let url = join_url(&self.site_url, &doc_type.content_path());
        let response = self.client.get(url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            _ => Err(rejection(response).await),
        }
    }

    async fn attempt_put(
        &mut self,
        _doc_type: DocumentType,
        _document: &ContentDocument,
    ) -> BackendResult<()> {
        Err(BackendError::Rejected {
            status: 405,
            message: "published site is read-only".to_string(),
        })
    }
}
