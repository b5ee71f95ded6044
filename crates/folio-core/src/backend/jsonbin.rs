//! JSON-bin document store backend
//!
//! All four documents live in one bin record:
//! `{projects, skills, about, settings, lastUpdated}`. The bin is created on
//! first use and its identifier is kept in the local cache, so every later
//! session writes to the same bin.
//!
//! ## Protocol
//!
//! - Create: `POST {endpoint}` → `{metadata: {id}}`
//! - Read: `GET {endpoint}/{id}/latest` → `{record}`
//! - Write: `PUT {endpoint}/{id}` with the whole record

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::error::{BackendError, BackendResult};
use super::http::{build_client, join_url, rejection};
use super::Backend;
use crate::config::JsonBinConfig;
use crate::document::{is_empty_document, ContentDocument, DocumentType};

/// Cache key for the master key
pub const JSONBIN_MASTER_KEY: &str = "jsonbin_master_key";

/// Cache key for the provisioned bin identifier
pub const JSONBIN_BIN_ID_KEY: &str = "portfolioCloudBinId";

const MASTER_KEY_HEADER: &str = "X-Master-Key";
const LAST_UPDATED: &str = "lastUpdated";

/// Remote document store on JSON-bin
pub struct JsonBinBackend {
    client: Client,
    endpoint: String,
    master_key: Option<String>,
    bin_id: Option<String>,
}

impl JsonBinBackend {
    pub fn new(config: &JsonBinConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoint: config.endpoint.clone(),
            master_key: config.master_key.clone(),
            bin_id: None,
        })
    }

    /// Identifier of the bin in use, once provisioned or restored
    pub fn bin_id(&self) -> Option<&str> {
        self.bin_id.as_deref()
    }

    fn master_key(&self) -> BackendResult<&str> {
        self.master_key
            .as_deref()
            .ok_or_else(|| BackendError::CredentialMissing(JSONBIN_MASTER_KEY.to_string()))
    }

    fn bin_url(&self) -> BackendResult<String> {
        self.bin_id
            .as_deref()
            .map(|id| join_url(&self.endpoint, id))
            .ok_or_else(|| BackendError::CredentialMissing(JSONBIN_BIN_ID_KEY.to_string()))
    }

    async fn fetch_record(&self) -> BackendResult<Value> {
        let url = format!("{}/latest", self.bin_url()?);
        let response = self
            .client
            .get(url)
            .header(MASTER_KEY_HEADER, self.master_key()?)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        let mut body: Value = response.json().await?;
        match body.get_mut("record") {
            Some(record) => Ok(record.take()),
            None => Err(BackendError::Serialization(
                "bin response has no record".to_string(),
            )),
        }
    }
}

/// Record a new bin starts with: empty placeholders for every document
fn initial_record() -> Value {
    let mut record = Map::new();
    for doc_type in DocumentType::ALL {
        let placeholder = match doc_type.default_document() {
            Value::Array(_) => json!([]),
            _ => json!({}),
        };
        record.insert(doc_type.as_str().to_string(), placeholder);
    }
    record.insert(LAST_UPDATED.to_string(), json!(Utc::now().to_rfc3339()));
    Value::Object(record)
}

#[async_trait]
impl Backend for JsonBinBackend {
    fn name(&self) -> &str {
        "jsonbin"
    }

    fn is_available(&self) -> bool {
        self.master_key.is_some()
    }

    fn credential_key(&self) -> Option<&str> {
        Some(JSONBIN_MASTER_KEY)
    }

    fn set_credential(&mut self, value: String) {
        self.master_key = Some(value);
    }

    fn resource_key(&self) -> Option<&str> {
        Some(JSONBIN_BIN_ID_KEY)
    }

    fn restore_resource(&mut self, id: String) {
        self.bin_id = Some(id);
    }

    async fn provision(&mut self) -> BackendResult<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(MASTER_KEY_HEADER, self.master_key()?)
            .header("X-Bin-Private", "false")
            .header("X-Bin-Name", "portfolio-data")
            .json(&initial_record())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        let body: Value = response.json().await?;
        let id = body
            .pointer("/metadata/id")
            .or_else(|| body.get("id"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                BackendError::Serialization("create response has no bin id".to_string())
            })?
            .to_string();

        info!(bin_id = %id, "Created JSON-bin for portfolio content");
        self.bin_id = Some(id.clone());
        Ok(id)
    }

    async fn attempt_get(
        &mut self,
        doc_type: DocumentType,
    ) -> BackendResult<Option<ContentDocument>> {
        let record = self.fetch_record().await?;
        let document = record
            .get(doc_type.as_str())
            .filter(|value| !is_empty_document(value))
            .cloned();
        debug!(document = %doc_type, found = document.is_some(), "Read JSON-bin record");
        Ok(document)
    }

    async fn attempt_put(
        &mut self,
        doc_type: DocumentType,
        document: &ContentDocument,
    ) -> BackendResult<()> {
        let mut record = match self.fetch_record().await? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        record.insert(doc_type.as_str().to_string(), document.clone());
        record.insert(LAST_UPDATED.to_string(), json!(Utc::now().to_rfc3339()));

        let response = self
            .client
            .put(self.bin_url()?)
            .header(MASTER_KEY_HEADER, self.master_key()?)
            .json(&Value::Object(record))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        debug!(document = %doc_type, "Wrote JSON-bin record");
        Ok(())
    }
}
