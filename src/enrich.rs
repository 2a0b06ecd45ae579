//! On-demand enrichment from third-party HTTP endpoints.
//!
//! Two fetch kinds are supported, both cached in the caller's [`Session`]:
//!
//! | Kind | Cache key | Result |
//! |------|-----------|--------|
//! | Binary (marquee artwork) | exact URL | [`BinaryFetch`] |
//! | Structured (arcade-database metadata) | normalized subject key | [`StructuredPayload`] |
//!
//! Failures are cached like successes, so a dead endpoint is hit at most
//! once per session until the caller invalidates the entry. Fetches never
//! return transport errors: a binary fetch degrades to
//! [`BinaryFetch::Absent`], a structured fetch to
//! [`StructuredPayload::Error`] with a human-browsable fallback page.
//!
//! Structured fetches walk the configured endpoint templates in order
//! (HTTPS first, then HTTP by default) and stop at the first response that
//! parses as JSON.

use std::path::Path;
use std::time::Duration;

use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use arcade_shelf_core::models::StatusKey;

use crate::config::{Config, EnrichmentConfig};
use crate::session::Session;

pub use arcade_shelf_core::media::extract_media_references;

/// Payload fields shown in the details summary, in display order.
pub const SUMMARY_FIELDS: &[&str] = &[
    "title",
    "description",
    "manufacturer",
    "year",
    "genre",
    "players",
    "buttons",
    "controls",
    "rotation",
    "status",
];

const ACCEPT_STRUCTURED: &str = "application/json,text/plain,*/*";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnrichError {
    /// The subject has no usable key (e.g. a catalog row without a ROM name).
    #[error("no subject key available for enrichment")]
    NoSubjectKey,
}

/// Outcome of a binary fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinaryFetch {
    Fetched(Vec<u8>),
    /// Transport failure, non-2xx, or empty body.
    Absent,
}

impl BinaryFetch {
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            BinaryFetch::Fetched(b) => Some(b),
            BinaryFetch::Absent => None,
        }
    }
}

/// Outcome of a structured metadata fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredPayload {
    Ok {
        payload: Value,
        /// The endpoint variant that answered.
        source_url: String,
    },
    Error {
        /// Last failure seen across all variants.
        detail: String,
        /// Page a user can open instead.
        fallback_ref: String,
    },
}

pub struct EnrichmentClient {
    binary: Client,
    structured: Client,
    config: EnrichmentConfig,
}

impl EnrichmentClient {
    pub fn new(config: &EnrichmentConfig) -> anyhow::Result<Self> {
        let binary = Client::builder()
            .timeout(Duration::from_secs(config.binary_timeout_secs))
            .build()?;
        let structured = Client::builder()
            .timeout(Duration::from_secs(config.structured_timeout_secs))
            .build()?;
        Ok(Self {
            binary,
            structured,
            config: config.clone(),
        })
    }

    /// Fetch raw bytes from `url`, using the session cache.
    pub async fn fetch_binary(&self, session: &mut Session, url: &str) -> BinaryFetch {
        if let Some(hit) = session.binaries.get(url) {
            return hit.value.clone();
        }

        let result = match self.download(url).await {
            Ok(bytes) => BinaryFetch::Fetched(bytes),
            Err(detail) => {
                debug!(url, error = %detail, "binary fetch failed");
                BinaryFetch::Absent
            }
        };
        session.binaries.insert(url.to_string(), result)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, String> {
        let resp = self
            .binary
            .get(url)
            .header(USER_AGENT, &self.config.user_agent)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = resp.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status));
        }
        let bytes = resp.bytes().await.map_err(|e| e.to_string())?;
        if bytes.is_empty() {
            return Err("empty body".to_string());
        }
        Ok(bytes.to_vec())
    }

    /// `<marquee_root>/<key>.png`, or the default image for a blank key.
    pub fn marquee_url(&self, raw_key: &str) -> String {
        match StatusKey::parse(raw_key) {
            Some(key) => push_segment(self.marquee_root(), &format!("{}.png", key)),
            None => self.default_marquee_url(),
        }
    }

    pub fn default_marquee_url(&self) -> String {
        format!(
            "{}/{}",
            self.marquee_root(),
            self.config.default_marquee.trim_start_matches('/')
        )
    }

    fn marquee_root(&self) -> &str {
        self.config.marquee_root.trim_end_matches('/')
    }

    /// Marquee artwork for `raw_key`, falling back to the default image.
    pub async fn marquee(&self, session: &mut Session, raw_key: &str) -> BinaryFetch {
        if StatusKey::parse(raw_key).is_some() {
            let url = self.marquee_url(raw_key);
            let found = self.fetch_binary(session, &url).await;
            if found.bytes().is_some() {
                return found;
            }
        }
        let fallback = self.default_marquee_url();
        self.fetch_binary(session, &fallback).await
    }

    /// Endpoint URLs tried for `key`, in order.
    pub fn variant_urls(&self, key: &StatusKey) -> Vec<String> {
        self.config
            .details_endpoints
            .iter()
            .map(|t| fill_template(t, key))
            .collect()
    }

    /// Human-browsable page for `key`.
    pub fn fallback_page(&self, key: &StatusKey) -> String {
        fill_template(&self.config.details_page, key)
    }

    /// Fetch structured metadata for `subject`, using the session cache.
    ///
    /// # Errors
    ///
    /// [`EnrichError::NoSubjectKey`] when `subject` is blank. Upstream
    /// failures are reported inside [`StructuredPayload::Error`].
    pub async fn fetch_structured(
        &self,
        session: &mut Session,
        subject: &str,
    ) -> Result<StructuredPayload, EnrichError> {
        let key = StatusKey::parse(subject).ok_or(EnrichError::NoSubjectKey)?;
        if let Some(hit) = session.structured.get(key.as_str()) {
            return Ok(hit.value.clone());
        }

        let mut last_err = None;
        for url in self.variant_urls(&key) {
            match self.get_json(&url).await {
                Ok(payload) => {
                    debug!(key = %key, url = %url, "structured fetch succeeded");
                    let found = StructuredPayload::Ok {
                        payload,
                        source_url: url,
                    };
                    return Ok(session.structured.insert(key.as_str().to_string(), found));
                }
                Err(detail) => {
                    debug!(key = %key, url = %url, error = %detail, "structured variant failed");
                    last_err = Some(detail);
                }
            }
        }

        let detail = last_err.unwrap_or_else(|| "no endpoints configured".to_string());
        warn!(key = %key, error = %detail, "structured fetch failed on every endpoint");
        let failed = StructuredPayload::Error {
            detail,
            fallback_ref: self.fallback_page(&key),
        };
        Ok(session.structured.insert(key.as_str().to_string(), failed))
    }

    async fn get_json(&self, url: &str) -> Result<Value, String> {
        let resp = self
            .structured
            .get(url)
            .header(USER_AGENT, &self.config.user_agent)
            .header(ACCEPT, ACCEPT_STRUCTURED)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| e.to_string())?;
        if !status.is_success() {
            return Err(format!("HTTP {}", status));
        }
        serde_json::from_str(text.trim()).map_err(|e| format!("invalid JSON: {}", e))
    }

    /// Forget the cached structured result for `subject`.
    pub fn invalidate(&self, session: &mut Session, subject: &str) -> bool {
        StatusKey::parse(subject)
            .map(|key| session.structured.remove(key.as_str()).is_some())
            .unwrap_or(false)
    }

    /// Forget the cached bytes for `url`.
    pub fn invalidate_binary(&self, session: &mut Session, url: &str) -> bool {
        session.binaries.remove(url).is_some()
    }
}

/// Images listed by `shelf details`.
const MAX_IMAGES: usize = 10;

/// Print the details summary and artwork URLs for `subject`.
pub async fn run_details(config: &Config, subject: &str, show_images: bool) -> anyhow::Result<()> {
    let client = EnrichmentClient::new(&config.enrichment)?;
    let mut session = Session::new();

    let result = match client.fetch_structured(&mut session, subject).await {
        Ok(result) => result,
        Err(EnrichError::NoSubjectKey) => {
            println!("Details require a ROM short name; none was given.");
            return Ok(());
        }
    };

    match result {
        StructuredPayload::Ok {
            payload,
            source_url,
        } => {
            println!("Source: {}", source_url);
            for (field, value) in summary_fields(&payload) {
                match value {
                    Value::String(s) => println!("{}: {}", field, s),
                    other => println!("{}: {}", field, other),
                }
            }
            if show_images {
                let images = extract_media_references(&payload);
                if images.is_empty() {
                    println!("No direct image URLs found.");
                } else {
                    println!("Images:");
                    for url in images.iter().take(MAX_IMAGES) {
                        println!("  {}", url);
                    }
                }
            }
        }
        StructuredPayload::Error {
            detail,
            fallback_ref,
        } => {
            println!("Could not retrieve details right now.");
            println!("Details: {}", detail);
            println!("Browse instead: {}", fallback_ref);
        }
    }
    Ok(())
}

/// Write the marquee for `key` (or the default marquee) to `out`.
pub async fn run_marquee(config: &Config, key: &str, out: &Path) -> anyhow::Result<()> {
    let client = EnrichmentClient::new(&config.enrichment)?;
    let mut session = Session::new();

    match client.marquee(&mut session, key).await {
        BinaryFetch::Fetched(bytes) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(out, &bytes)?;
            eprintln!("Wrote {} bytes to {}", bytes.len(), out.display());
        }
        BinaryFetch::Absent => {
            println!("No marquee available for '{}'.", key.trim());
        }
    }
    Ok(())
}

/// Append `segment` to `root` as one percent-encoded path segment.
fn push_segment(root: &str, segment: &str) -> String {
    match reqwest::Url::parse(root) {
        Ok(mut url) if !url.cannot_be_a_base() => {
            if let Ok(mut segments) = url.path_segments_mut() {
                segments.pop_if_empty().push(segment);
            }
            url.to_string()
        }
        _ => {
            let encoded: String =
                url::form_urlencoded::byte_serialize(segment.as_bytes()).collect();
            format!("{}/{}", root, encoded)
        }
    }
}

fn fill_template(template: &str, key: &StatusKey) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(key.as_str().as_bytes()).collect();
    template.replace("{key}", &encoded)
}

/// Present, non-empty [`SUMMARY_FIELDS`] of `payload`, in display order.
pub fn summary_fields(payload: &Value) -> Vec<(&'static str, &Value)> {
    SUMMARY_FIELDS
        .iter()
        .filter_map(|&field| {
            payload
                .get(field)
                .filter(|v| has_content(v))
                .map(|v| (field, v))
        })
        .collect()
}

fn has_content(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
