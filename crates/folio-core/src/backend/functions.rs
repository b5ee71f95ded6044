//! Serverless functions backend
//!
//! Talks to a pair of functions deployed next to the site:
//! - `POST {base}/save-data` with `{type, data, timestamp}`
//! - `GET {base}/load-data?type=<type>` returning the document, 404 if none

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::Serialize;

use super::error::BackendResult;
use super::http::{build_client, join_url, rejection};
use super::Backend;
use crate::config::FunctionsConfig;
use crate::document::{ContentDocument, DocumentType};

#[derive(Debug, Serialize)]
struct SaveRequest<'a> {
    #[serde(rename = "type")]
    doc_type: DocumentType,
    data: &'a ContentDocument,
    timestamp: String,
}

pub struct FunctionsBackend {
    client: Client,
    base_url: String,
}

impl FunctionsBackend {
    pub fn new(config: &FunctionsConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl Backend for FunctionsBackend {
    fn name(&self) -> &str {
        "functions"
    }

    fn is_available(&self) -> bool {
        !self.base_url.is_empty()
    }

    async fn attempt_get(
        &mut self,
        doc_type: DocumentType,
    ) -> BackendResult<Option<ContentDocument>> {
        let response = self
            .client
            .get(join_url(&self.base_url, "load-data"))
            .query(&[("type", doc_type.as_str())])
            .send()
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::NO_CONTENT => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            _ => Err(rejection(response).await),
        }
    }

    async fn attempt_put(
        &mut self,
        doc_type: DocumentType,
        document: &ContentDocument,
    ) -> BackendResult<()> {
        let body = SaveRequest {
            doc_type,
            data: document,
            timestamp: Utc::now().to_rfc3339(),
        };
        let response = self
            .client
            .post(join_url(&self.base_url, "save-data"))
            .json(&body)
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(rejection(response).await)
        }
    }
}
