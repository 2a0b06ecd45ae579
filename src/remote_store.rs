//! Remote [`StatusStore`] backed by a hosted PostgREST table (e.g. Supabase).
//!
//! # Wire Contract
//!
//! | Operation | Request |
//! |-----------|---------|
//! | list | `GET <base>/<table>?select=<key_col>,status` → JSON array |
//! | upsert | `POST <base>/<table>` + `Prefer: resolution=merge-duplicates`, body `{<key_col>, status}` |
//! | delete | `DELETE <base>/<table>?<key_col>=eq.<key>` |
//!
//! Every request carries `apikey: <token>` and `Authorization: Bearer <token>`
//! and is bounded by the configured timeout (default 15s).
//!
//! # Errors
//!
//! - Timeout, connection failure, or non-2xx → [`StoreError::RemoteUnavailable`]
//! - Body that is not a JSON array of objects → [`StoreError::RemoteFormat`]
//! - Missing table (PostgREST codes `42P01` / `PGRST205`) →
//!   [`StoreError::RemoteUnavailable`] for every operation, so reads, writes
//!   and deletes all land on the same local fallback.
//!
//! This store never falls back on its own. The status service decides
//! whether to construct it (only when URL and key are both configured) and
//! what to do when it fails.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use arcade_shelf_core::models::{Status, StatusKey, StatusMap};
use arcade_shelf_core::store::{Backend, StatusStore, StoreError};

use crate::config::RemoteSettings;

/// PostgREST / Postgres error codes meaning "the table does not exist".
const MISSING_TABLE_CODES: &[&str] = &["42P01", "PGRST205"];

/// REST implementation of the [`StatusStore`] trait.
pub struct RestStatusStore {
    client: Client,
    settings: RemoteSettings,
}

impl RestStatusStore {
    /// Build a client with auth headers and timeout from `settings`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is not a valid header value or the
    /// HTTP client cannot be built.
    pub fn new(settings: RemoteSettings) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(&settings.api_key).context("remote api key is not a valid header")?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", settings.api_key))
                .context("remote api key is not a valid header")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(settings.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { client, settings })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Reply, StoreError> {
        let resp = request.send().await.map_err(|e| {
            let kind = if e.is_timeout() { "timed out" } else { "request failed" };
            StoreError::RemoteUnavailable(format!("{}: {}", kind, e))
        })?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| StoreError::RemoteUnavailable(format!("reading body: {}", e)))?;
        Ok(Reply { status, body })
    }
}

struct Reply {
    status: StatusCode,
    body: String,
}

impl Reply {
    fn is_missing_table(&self) -> bool {
        is_missing_table(self.status, &self.body)
    }

    fn into_result(self) -> Result<String, StoreError> {
        if self.status.is_success() {
            Ok(self.body)
        } else if self.is_missing_table() {
            Err(StoreError::RemoteUnavailable(format!(
                "table does not exist (HTTP {}): {}",
                self.status,
                truncate(&self.body, 200)
            )))
        } else {
            Err(StoreError::RemoteUnavailable(format!(
                "HTTP {}: {}",
                self.status,
                truncate(&self.body, 200)
            )))
        }
    }
}

/// True if an error response says the target table does not exist.
pub fn is_missing_table(status: StatusCode, body: &str) -> bool {
    if status.is_success() {
        return false;
    }
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("code").and_then(|c| c.as_str()).map(str::to_string))
        .map(|code| MISSING_TABLE_CODES.contains(&code.as_str()))
        .unwrap_or(false)
}

/// Parse a list response into a [`StatusMap`].
///
/// Rows with a blank key or a null/`none` status are skipped; keys are
/// normalized to lowercase.
pub fn parse_rows(body: &str, key_column: &str) -> Result<StatusMap, StoreError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| StoreError::RemoteFormat(format!("invalid JSON: {}", e)))?;
    let rows = value
        .as_array()
        .ok_or_else(|| StoreError::RemoteFormat("expected a JSON array of rows".to_string()))?;

    let mut out = StatusMap::new();
    for row in rows {
        let key = row
            .get(key_column)
            .and_then(|v| v.as_str())
            .and_then(StatusKey::parse);
        let status = row
            .get("status")
            .and_then(|v| v.as_str())
            .and_then(Status::parse_opt);
        if let (Some(key), Some(status)) = (key, status) {
            out.insert(key.as_str().to_string(), status);
        }
    }
    Ok(out)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect::<String>() + "..."
    }
}

#[async_trait]
impl StatusStore for RestStatusStore {
    fn backend(&self) -> Backend {
        Backend::Remote
    }

    async fn list_all(&self) -> Result<StatusMap, StoreError> {
        let url = self.settings.table_url();
        let select = format!("{},status", self.settings.key_column);
        debug!(url = %url, "listing remote statuses");

        let reply = self
            .send(self.client.get(&url).query(&[("select", select.as_str())]))
            .await?;
        let body = reply.into_result()?;
        parse_rows(&body, &self.settings.key_column)
    }

    async fn upsert(&self, key: &StatusKey, status: &Status) -> Result<(), StoreError> {
        let url = self.settings.table_url();
        let mut row = serde_json::Map::new();
        row.insert(
            self.settings.key_column.clone(),
            Value::String(key.as_str().to_string()),
        );
        row.insert("status".to_string(), Value::String(status.as_str().to_string()));

        let reply = self
            .send(
                self.client
                    .post(&url)
                    .header("Prefer", "resolution=merge-duplicates")
                    .json(&Value::Object(row)),
            )
            .await?;
        reply.into_result().map(|_| ())
    }

    async fn delete(&self, key: &StatusKey) -> Result<(), StoreError> {
        let url = self.settings.table_url();
        let filter = format!("eq.{}", key.as_str());

        let reply = self
            .send(
                self.client
                    .delete(&url)
                    .query(&[(self.settings.key_column.as_str(), filter.as_str())]),
            )
            .await?;
        reply.into_result().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rows_normalizes_and_skips() {
        let body = r#"[
            {"key": "PacMan", "status": "played"},
            {"key": "  ", "status": "played"},
            {"key": "galaga", "status": null},
            {"key": "dkong", "status": "want_to_play"},
            {"status": "played"}
        ]"#;
        let map = parse_rows(body, "key").unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("pacman"), Some(&Status::Played));
        assert_eq!(map.get("dkong"), Some(&Status::WantToPlay));
    }

    #[test]
    fn test_parse_rows_custom_key_column() {
        let map = parse_rows(r#"[{"rom": "sf2", "status": "favorite"}]"#, "rom").unwrap();
        assert_eq!(map.get("sf2"), Some(&Status::Other("favorite".into())));
    }

    #[test]
    fn test_parse_rows_rejects_non_array() {
        let err = parse_rows(r#"{"message": "nope"}"#, "key").unwrap_err();
        assert!(matches!(err, StoreError::RemoteFormat(_)));
        let err = parse_rows("<html>", "key").unwrap_err();
        assert!(matches!(err, StoreError::RemoteFormat(_)));
    }

    #[test]
    fn test_missing_table_detection() {
        assert!(is_missing_table(
            StatusCode::NOT_FOUND,
            r#"{"code":"42P01","message":"relation \"public.game_status\" does not exist"}"#
        ));
        assert!(is_missing_table(
            StatusCode::NOT_FOUND,
            r#"{"code":"PGRST205","message":"Could not find the table"}"#
        ));
        assert!(!is_missing_table(StatusCode::NOT_FOUND, "not json"));
        assert!(!is_missing_table(
            StatusCode::UNAUTHORIZED,
            r#"{"code":"PGRST301","message":"JWT expired"}"#
        ));
        assert!(!is_missing_table(StatusCode::OK, r#"{"code":"42P01"}"#));
    }

    #[test]
    fn test_missing_table_reply_is_unavailable() {
        let reply = Reply {
            status: StatusCode::NOT_FOUND,
            body: r#"{"code":"42P01"}"#.to_string(),
        };
        match reply.into_result() {
            Err(StoreError::RemoteUnavailable(detail)) => {
                assert!(detail.contains("does not exist"))
            }
            other => panic!("expected RemoteUnavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abc", 5), "abc");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }
}
