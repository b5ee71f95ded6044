//! Shared HTTP plumbing for remote backends

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;

use super::error::BackendError;

/// User agent sent with every request (GitHub rejects requests without one)
const USER_AGENT: &str = concat!("folio/", env!("CARGO_PKG_VERSION"));

/// Build a client whose requests give up after `timeout`
pub(crate) fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to build HTTP client")
}

/// Turn a non-success response into a `Rejected` error
///
/// Uses the `message` field of a JSON error body when there is one.
pub(crate) async fn rejection(response: Response) -> BackendError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    BackendError::Rejected {
        status: status.as_u16(),
        message: error_message(status, &body),
    }
}

fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            } else {
                trimmed.chars().take(200).collect()
            }
        })
}

/// Join a base URL and a path without doubling slashes
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_json_message() {
        let msg = error_message(StatusCode::CONFLICT, r#"{"message":"sha mismatch"}"#);
        assert_eq!(msg, "sha mismatch");
    }

    #[test]
    fn test_error_message_falls_back_to_body_or_reason() {
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "upstream down"),
            "upstream down"
        );
        assert_eq!(error_message(StatusCode::NOT_FOUND, ""), "Not Found");
    }

    #[test]
    fn test_join_url() {
        assert_eq!(
            join_url("https://api.github.com/", "/repos/a/b"),
            "https://api.github.com/repos/a/b"
        );
        assert_eq!(join_url("http://x", "y"), "http://x/y");
    }
}
