//! GitHub contents API backend
//!
//! Each document is a JSON file at `content/<type>/<type>.json` in a
//! repository branch. Updating a file requires the blob sha of the version
//! being replaced, so the backend remembers the last sha it saw per document
//! and falls back to reading the file when it has none.
//!
//! ## Protocol
//!
//! - Read: `GET /repos/{repo}/contents/{path}?ref={branch}` → `{sha, content}`
//!   with base64 content (GitHub wraps it in newlines). 404 means absent.
//! - Write: `PUT` to the same path with `{message, content, sha, branch}`;
//!   `sha` is left out when creating the file.
//! - Last change: `GET /repos/{repo}/commits/{branch}` → `{commit: {committer:
//!   {date}}}`, used to decide whether a pull is worth doing.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{BackendError, BackendResult};
use super::http::{build_client, join_url, rejection};
use super::Backend;
use crate::config::GitHubConfig;
use crate::document::{ContentDocument, DocumentType};

/// Cache key for the access token
pub const GITHUB_TOKEN_KEY: &str = "github_token";

const GITHUB_JSON: &str = "application/vnd.github+json";

/// File metadata returned by the contents API
#[derive(Debug, Deserialize)]
struct ContentsFile {
    sha: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Serialize)]
struct PutRequest<'a> {
    message: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
    branch: &'a str,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    content: Option<PutContent>,
}

#[derive(Debug, Deserialize)]
struct PutContent {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct BranchCommit {
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    committer: Option<Signature>,
    author: Option<Signature>,
}

#[derive(Debug, Deserialize)]
struct Signature {
    date: DateTime<Utc>,
}

/// Versioned file store on GitHub
pub struct GitHubBackend {
    client: Client,
    api_url: String,
    repo: String,
    branch: String,
    token: Option<String>,
    /// Last known blob sha per document
    shas: HashMap<DocumentType, String>,
}

impl GitHubBackend {
    pub fn new(config: &GitHubConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            api_url: config.api_url.clone(),
            repo: config.repo.clone(),
            branch: config.branch.clone(),
            token: config.token.clone(),
            shas: HashMap::new(),
        })
    }

    /// Repository as `owner/name`
    pub fn repo(&self) -> &str {
        &self.repo
    }

    fn contents_url(&self, doc_type: DocumentType) -> String {
        join_url(
            &self.api_url,
            &format!("repos/{}/contents/{}", self.repo, doc_type.content_path()),
        )
    }

    /// Time of the newest commit on the configured branch
    ///
    /// Public repositories answer without a token, so one is only sent when
    /// known. `None` when the branch does not exist.
    pub async fn last_commit_time(&self) -> BackendResult<Option<DateTime<Utc>>> {
        let url = join_url(
            &self.api_url,
            &format!("repos/{}/commits/{}", self.repo, self.branch),
        );
        let mut request = self.client.get(url).header(ACCEPT, GITHUB_JSON);
        if let Ok(auth) = self.authorization() {
            request = request.header(AUTHORIZATION, auth);
        }
        let response = request.send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let head: BranchCommit = response.json().await?;
                let signature = head.commit.committer.or(head.commit.author);
                Ok(signature.map(|s| s.date))
            }
            _ => Err(rejection(response).await),
        }
    }

    fn authorization(&self) -> BackendResult<String> {
        self.token
            .as_deref()
            .map(|token| format!("token {}", token))
            .ok_or_else(|| BackendError::CredentialMissing(GITHUB_TOKEN_KEY.to_string()))
    }

    /// Fetch file metadata and content, remembering its sha
    async fn fetch_file(&mut self, doc_type: DocumentType) -> BackendResult<Option<ContentsFile>> {
        let auth = self.authorization()?;
        let response = self
            .client
            .get(self.contents_url(doc_type))
            .query(&[("ref", self.branch.as_str())])
            .header(AUTHORIZATION, auth)
            .header(ACCEPT, GITHUB_JSON)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                self.shas.remove(&doc_type);
                Ok(None)
            }
            status if status.is_success() => {
                let file: ContentsFile = response.json().await?;
                self.shas.insert(doc_type, file.sha.clone());
                Ok(Some(file))
            }
            _ => Err(rejection(response).await),
        }
    }
}

/// Decode the newline-wrapped base64 body GitHub returns
fn decode_content(encoded: &str) -> BackendResult<ContentDocument> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD.decode(compact)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn encode_content(document: &ContentDocument) -> BackendResult<String> {
    let pretty = serde_json::to_string_pretty(document)?;
    Ok(STANDARD.encode(pretty))
}

#[async_trait]
impl Backend for GitHubBackend {
    fn name(&self) -> &str {
        "github"
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

    async fn last_modified(&mut self) -> BackendResult<Option<DateTime<Utc>>> {
        let changed = self.last_commit_time().await?;
        debug!(repo = %self.repo, branch = %self.branch, changed = ?changed, "Checked latest commit");
        Ok(changed)
    }

    async fn attempt_get(
        &mut self,
        doc_type: DocumentType,
    ) -> BackendResult<Option<ContentDocument>> {
        match self.fetch_file(doc_type).await? {
            Some(file) => {
                debug!(document = %doc_type, repo = %self.repo, "Read document from GitHub");
                decode_content(&file.content).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn attempt_put(
        &mut self,
        doc_type: DocumentType,
        document: &ContentDocument,
    ) -> BackendResult<()> {
        let auth = self.authorization()?;
        let known = self.shas.get(&doc_type).cloned();
        let sha = match known {
            Some(sha) => Some(sha),
            None => self.fetch_file(doc_type).await?.map(|file| file.sha),
        };

        let body = PutRequest {
            message: format!(
                "Update {} from admin panel - {}",
                doc_type,
                Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
            ),
            content: encode_content(document)?,
            sha,
            branch: &self.branch,
        };

        let response = self
            .client
            .put(self.contents_url(doc_type))
            .header(AUTHORIZATION, auth)
            .header(ACCEPT, GITHUB_JSON)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            // A stale sha is rejected with 409/422; forget it so the next
            // attempt reads the current one
            self.shas.remove(&doc_type);
            return Err(rejection(response).await);
        }

        let result: PutResponse = response.json().await?;
        if let Some(content) = result.content {
            self.shas.insert(doc_type, content.sha);
        }
        debug!(document = %doc_type, repo = %self.repo, "Wrote document to GitHub");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{serve, unreachable_url};
    use axum::extract::{Path, Query, State};
    use axum::http::{HeaderMap, StatusCode as HttpStatus};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    const TOKEN: &str = "secret";

    #[derive(Default)]
    struct FakeRepo {
        /// path -> (sha, base64 content)
        files: HashMap<String, (String, String)>,
        next_sha: u32,
        refs: Vec<String>,
        put_bodies: Vec<Value>,
        /// branch -> commit date
        heads: HashMap<String, String>,
    }

    type Shared = Arc<Mutex<FakeRepo>>;

    fn authorized(headers: &HeaderMap) -> bool {
        let expected = format!("token {}", TOKEN);
        headers.get("authorization").and_then(|v| v.to_str().ok()) == Some(expected.as_str())
    }

    fn wrap_base64(content: &str) -> String {
        content
            .as_bytes()
            .chunks(60)
            .map(|chunk| std::str::from_utf8(chunk).unwrap())
            .collect::<Vec<_>>()
            .join("\n")
    }

    async fn get_file(
        State(repo): State<Shared>,
        Path((_owner, _name, path)): Path<(String, String, String)>,
        Query(query): Query<HashMap<String, String>>,
        headers: HeaderMap,
    ) -> (HttpStatus, Json<Value>) {
        if !authorized(&headers) {
            return (
                HttpStatus::UNAUTHORIZED,
                Json(json!({"message": "Bad credentials"})),
            );
        }
        let mut repo = repo.lock().unwrap();
        repo.refs.push(query.get("ref").cloned().unwrap_or_default());
        match repo.files.get(path.trim_start_matches('/')) {
            Some((sha, content)) => (
                HttpStatus::OK,
                Json(json!({"sha": sha, "content": wrap_base64(content), "encoding": "base64"})),
            ),
            None => (HttpStatus::NOT_FOUND, Json(json!({"message": "Not Found"}))),
        }
    }

    async fn put_file(
        State(repo): State<Shared>,
        Path((_owner, _name, path)): Path<(String, String, String)>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (HttpStatus, Json<Value>) {
        if !authorized(&headers) {
            return (
                HttpStatus::UNAUTHORIZED,
                Json(json!({"message": "Bad credentials"})),
            );
        }
        let mut repo = repo.lock().unwrap();
        let path = path.trim_start_matches('/').to_string();
        repo.put_bodies.push(body.clone());

        let given_sha = body.get("sha").and_then(Value::as_str).map(str::to_string);
        let current_sha = repo.files.get(&path).map(|(sha, _)| sha.clone());
        if given_sha != current_sha {
            return (
                HttpStatus::CONFLICT,
                Json(json!({"message": format!("{} does not match", path)})),
            );
        }

        repo.next_sha += 1;
        let sha = format!("sha{}", repo.next_sha);
        let content = body["content"].as_str().unwrap_or_default().to_string();
        let created = current_sha.is_none();
        repo.files.insert(path, (sha.clone(), content));
        let status = if created {
            HttpStatus::CREATED
        } else {
            HttpStatus::OK
        };
        (status, Json(json!({"content": {"sha": sha}})))
    }

    async fn branch_head(
        State(repo): State<Shared>,
        Path((_owner, _name, branch)): Path<(String, String, String)>,
    ) -> (HttpStatus, Json<Value>) {
        match repo.lock().unwrap().heads.get(&branch) {
            Some(date) => (
                HttpStatus::OK,
                Json(json!({
                    "sha": "abc123",
                    "commit": {
                        "author": {"name": "someone", "date": "2020-01-01T00:00:00Z"},
                        "committer": {"name": "GitHub", "date": date}
                    }
                })),
            ),
            None => (
                HttpStatus::NOT_FOUND,
                Json(json!({"message": "No commit found for SHA: main"})),
            ),
        }
    }

    async fn fake_github() -> (String, Shared) {
        let shared = Shared::default();
        let router = Router::new()
            .route(
                "/repos/:owner/:name/contents/*path",
                get(get_file).put(put_file),
            )
            .route("/repos/:owner/:name/commits/:branch", get(branch_head))
            .with_state(shared.clone());
        (serve(router).await, shared)
    }

    fn backend(api_url: &str, token: Option<&str>) -> GitHubBackend {
        let config = GitHubConfig {
            repo: "someone/site".to_string(),
            branch: "main".to_string(),
            api_url: api_url.to_string(),
            token: token.map(str::to_string),
        };
        GitHubBackend::new(&config, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_missing_file_is_absent() {
        let (url, repo) = fake_github().await;
        let mut github = backend(&url, Some(TOKEN));

        let doc = github.attempt_get(DocumentType::Projects).await.unwrap();
        assert!(doc.is_none());
        assert_eq!(repo.lock().unwrap().refs, vec!["main".to_string()]);
    }

    #[tokio::test]
    async fn test_create_then_read_from_fresh_backend() {
        let (url, repo) = fake_github().await;
        let skills = json!([{"id": 1, "name": "Go", "level": 80}]);

        let mut writer = backend(&url, Some(TOKEN));
        writer
            .attempt_put(DocumentType::Skills, &skills)
            .await
            .unwrap();

        {
            let repo = repo.lock().unwrap();
            assert!(repo.files.contains_key("content/skills/skills.json"));
            let body = &repo.put_bodies[0];
            assert!(body.get("sha").is_none());
            assert_eq!(body["branch"], "main");
            assert!(body["message"]
                .as_str()
                .unwrap()
                .starts_with("Update skills from admin panel - "));
        }

        let mut reader = backend(&url, Some(TOKEN));
        let loaded = reader.attempt_get(DocumentType::Skills).await.unwrap();
        assert_eq!(loaded, Some(skills));
    }

    #[tokio::test]
    async fn test_update_sends_current_sha() {
        let (url, repo) = fake_github().await;
        let mut github = backend(&url, Some(TOKEN));

        github
            .attempt_put(DocumentType::About, &json!({"name": "A"}))
            .await
            .unwrap();
        github
            .attempt_put(DocumentType::About, &json!({"name": "B"}))
            .await
            .unwrap();

        let repo = repo.lock().unwrap();
        assert_eq!(repo.put_bodies[1]["sha"], "sha1");
        assert_eq!(repo.files["content/about/about.json"].0, "sha2");
    }

    #[tokio::test]
    async fn test_update_of_existing_file_reads_sha_first() {
        let (url, _repo) = fake_github().await;

        backend(&url, Some(TOKEN))
            .attempt_put(DocumentType::Settings, &json!({"siteTitle": "One"}))
            .await
            .unwrap();

        // A second device knows no sha yet
        let mut other = backend(&url, Some(TOKEN));
        other
            .attempt_put(DocumentType::Settings, &json!({"siteTitle": "Two"}))
            .await
            .unwrap();

        let loaded = other.attempt_get(DocumentType::Settings).await.unwrap();
        assert_eq!(loaded, Some(json!({"siteTitle": "Two"})));
    }

    #[tokio::test]
    async fn test_stale_sha_rejected_then_recovers() {
        let (url, _repo) = fake_github().await;
        let mut first = backend(&url, Some(TOKEN));
        let mut second = backend(&url, Some(TOKEN));

        first
            .attempt_put(DocumentType::Projects, &json!([1]))
            .await
            .unwrap();
        second
            .attempt_put(DocumentType::Projects, &json!([2]))
            .await
            .unwrap();

        let err = first
            .attempt_put(DocumentType::Projects, &json!([3]))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Rejected { status: 409, .. }));

        // The stale sha was dropped, so the retry reads the current one
        first
            .attempt_put(DocumentType::Projects, &json!([3]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_last_commit_time_reads_committer_date() {
        let (url, repo) = fake_github().await;
        repo.lock()
            .unwrap()
            .heads
            .insert("main".to_string(), "2026-03-04T05:06:07Z".to_string());

        // No token needed for a public repository
        let mut github = backend(&url, None);
        let changed = github.last_modified().await.unwrap().unwrap();
        assert_eq!(changed.to_rfc3339(), "2026-03-04T05:06:07+00:00");
    }

    #[tokio::test]
    async fn test_last_commit_time_of_missing_branch() {
        let (url, _repo) = fake_github().await;
        let github = backend(&url, Some(TOKEN));
        assert_eq!(github.last_commit_time().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_token() {
        let mut github = backend("http://127.0.0.1:9", None);
        assert!(!github.is_available());

        let err = github.attempt_get(DocumentType::Skills).await.unwrap_err();
        assert_eq!(
            err,
            BackendError::CredentialMissing(GITHUB_TOKEN_KEY.to_string())
        );
    }

    #[tokio::test]
    async fn test_bad_token_is_rejected_with_message() {
        let (url, _repo) = fake_github().await;
        let mut github = backend(&url, Some("wrong"));

        let err = github.attempt_get(DocumentType::Skills).await.unwrap_err();
        assert_eq!(
            err,
            BackendError::Rejected {
                status: 401,
                message: "Bad credentials".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let url = unreachable_url().await;
        let mut github = backend(&url, Some(TOKEN));

        let err = github.attempt_get(DocumentType::Skills).await.unwrap_err();
        assert!(matches!(err, BackendError::Unreachable(_)));
    }

    #[test]
    fn test_decode_content_handles_wrapped_base64() {
        let encoded = STANDARD.encode(r#"{"siteTitle":"Rajin's Portfolio"}"#);
        let wrapped = wrap_base64(&encoded) + "\n";
        let doc = decode_content(&wrapped).unwrap();
        assert_eq!(doc["siteTitle"], "Rajin's Portfolio");
    }

    #[test]
    fn test_decode_content_rejects_garbage() {
        assert!(matches!(
            decode_content("!!!"),
            Err(BackendError::Serialization(_))
        ));
        let not_json = STANDARD.encode("not json");
        assert!(matches!(
            decode_content(&not_json),
            Err(BackendError::Serialization(_))
        ));
    }
}
