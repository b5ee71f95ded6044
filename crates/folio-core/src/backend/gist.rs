//! GitHub Gist backend
//!
//! All documents live as `<type>.json` files in one private gist owned by
//! the token's user. The gist is created on first use and its identifier is
//! kept in the local cache.
//!
//! ## Protocol
//!
//! - Create: `POST {api}/gists` with `{description, public: false, files}` → `{id}`
//! - Read: `GET {api}/gists/{id}` → `{files: {"<type>.json": {content}}}`
//! - Write: `PATCH {api}/gists/{id}` with only the changed file

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::error::{BackendError, BackendResult};
use super::github::GITHUB_TOKEN_KEY;
use super::http::{build_client, join_url, rejection};
use super::Backend;
use crate::config::GistConfig;
use crate::document::{is_empty_document, ContentDocument, DocumentType};

/// Cache key for the provisioned gist identifier
pub const GIST_ID_KEY: &str = "portfolioGistId";

const GITHUB_JSON: &str = "application/vnd.github+json";

#[derive(Debug, Deserialize)]
struct Gist {
    id: String,
    #[serde(default)]
    files: HashMap<String, GistFile>,
}

#[derive(Debug, Deserialize)]
struct GistFile {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    truncated: bool,
    #[serde(default)]
    raw_url: Option<String>,
}

/// Remote document store in a private GitHub gist
pub struct GistBackend {
    client: Client,
    api_url: String,
    description: String,
    token: Option<String>,
    gist_id: Option<String>,
}

impl GistBackend {
    pub fn new(config: &GistConfig, token: Option<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            api_url: config.api_url.clone(),
            description: config.description.clone(),
            token,
            gist_id: None,
        })
    }

    /// Identifier of the gist in use, once provisioned or restored
    pub fn gist_id(&self) -> Option<&str> {
        self.gist_id.as_deref()
    }

    fn authorization(&self) -> BackendResult<String> {
        self.token
            .as_deref()
            .map(|token| format!("token {}", token))
            .ok_or_else(|| BackendError::CredentialMissing(GITHUB_TOKEN_KEY.to_string()))
    }

    fn gist_url(&self) -> BackendResult<String> {
        self.gist_id
            .as_deref()
            .map(|id| join_url(&self.api_url, &format!("gists/{}", id)))
            .ok_or_else(|| BackendError::CredentialMissing(GIST_ID_KEY.to_string()))
    }

    /// Text of a file, following `raw_url` when GitHub truncated it
    async fn file_text(&self, file: GistFile) -> BackendResult<Option<String>> {
        if !file.truncated {
            return Ok(file.content);
        }
        let Some(raw_url) = file.raw_url else {
            return Ok(file.content);
        };
        let response = self
            .client
            .get(raw_url)
            .header(AUTHORIZATION, self.authorization()?)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        Ok(Some(response.text().await?))
    }
}

fn file_name(doc_type: DocumentType) -> String {
    format!("{}.json", doc_type)
}

fn file_entry(document: &ContentDocument) -> BackendResult<Value> {
    Ok(json!({ "content": serde_json::to_string_pretty(document)? }))
}

/// Files a new gist starts with. GitHub refuses empty files, so every
/// document gets an empty placeholder that reads back as absent.
fn initial_files() -> BackendResult<Value> {
    let mut files = Map::new();
    for doc_type in DocumentType::ALL {
        let placeholder = match doc_type.default_document() {
            Value::Array(_) => json!([]),
            _ => json!({}),
        };
        files.insert(file_name(doc_type), file_entry(&placeholder)?);
    }
    Ok(Value::Object(files))
}

#[async_trait]
impl Backend for GistBackend {
    fn name(&self) -> &str {
        "gist"
    }

    fn is_available(&self) -> bool {
        self.token.is_some()
    }

    fn credential_key(&self) -> Option<&str> {
        Some(GITHUB_TOKEN_KEY)
    }

    fn set_credential(&mut self, value: String) {
        self.token = Some(value);
    }

    fn resource_key(&self) -> Option<&str> {
        Some(GIST_ID_KEY)
    }

    fn restore_resource(&mut self, id: String) {
        self.gist_id = Some(id);
    }

    async fn provision(&mut self) -> BackendResult<String> {
        let body = json!({
            "description": self.description,
            "public": false,
            "files": initial_files()?,
        });
        let response = self
            .client
            .post(join_url(&self.api_url, "gists"))
            .header(AUTHORIZATION, self.authorization()?)
            .header(ACCEPT, GITHUB_JSON)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        let gist: Gist = response.json().await?;
        info!(gist_id = %gist.id, "Created gist for portfolio content");
        self.gist_id = Some(gist.id.clone());
        Ok(gist.id)
    }

    async fn attempt_get(
        &mut self,
        doc_type: DocumentType,
    ) -> BackendResult<Option<ContentDocument>> {
        let response = self
            .client
            .get(self.gist_url()?)
            .header(AUTHORIZATION, self.authorization()?)
            .header(ACCEPT, GITHUB_JSON)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        let mut gist: Gist = response.json().await?;
        let Some(file) = gist.files.remove(&file_name(doc_type)) else {
            debug!(document = %doc_type, "Gist has no file for document");
            return Ok(None);
        };
        let Some(text) = self.file_text(file).await? else {
            return Ok(None);
        };

        let document: Value = serde_json::from_str(&text)?;
        if is_empty_document(&document) {
            return Ok(None);
        }
        debug!(document = %doc_type, "Read document from gist");
        Ok(Some(document))
    }

    async fn attempt_put(
        &mut self,
        doc_type: DocumentType,
        document: &ContentDocument,
    ) -> BackendResult<()> {
        let mut files = Map::new();
        files.insert(file_name(doc_type), file_entry(document)?);

        let response = self
            .client
            .patch(self.gist_url()?)
            .header(AUTHORIZATION, self.authorization()?)
            .header(ACCEPT, GITHUB_JSON)
            .json(&json!({ "files": files }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        debug!(document = %doc_type, "Wrote document to gist");
        Ok(())
    }
}
