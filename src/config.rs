//! TOML configuration parsing, validation, and secret resolution.
//!
//! Arcade Shelf is configured via a TOML file (default:
//! `config/shelf.toml`). Every section is optional; a missing file falls
//! back to [`Config::minimal`], which stores statuses in a local SQLite
//! file and uses the stock enrichment endpoints.
//!
//! # Example
//!
//! ```toml
//! [db]
//! path = "./data/shelf.sqlite"
//!
//! [remote]
//! url = "https://project.supabase.co"
//! table = "game_status"
//!
//! [enrichment]
//! marquee_root = "https://pub-04cb80aef9834a5d908ddf7538b7fffa.r2.dev"
//!
//! [search]
//! strict = true
//! limit = 25
//! ```
//!
//! # Secrets
//!
//! Remote credentials are resolved by [`RemoteSettings::resolve`], which
//! checks the environment before the `[remote]` table. Unset or blank
//! values mean "no remote"; that is a normal outcome, not an error.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use arcade_shelf_core::relevance::SubjectProfile;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/shelf.sqlite"),
        }
    }
}

/// Hosted REST table settings. `url` and `api_key` may instead come from
/// the environment.
#[derive(Debug, Deserialize, Clone)]
pub struct RemoteConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_key_column")]
    pub key_column: String,
    #[serde(default = "default_rest_path")]
    pub rest_path: String,
    #[serde(default = "default_remote_timeout")]
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            table: default_table(),
            key_column: default_key_column(),
            rest_path: default_rest_path(),
            timeout_secs: default_remote_timeout(),
        }
    }
}

fn default_table() -> String {
    "game_status".to_string()
}
fn default_key_column() -> String {
    "key".to_string()
}
fn default_rest_path() -> String {
    "/rest/v1".to_string()
}
fn default_remote_timeout() -> u64 {
    15
}

#[derive(Debug, Deserialize, Clone)]
pub struct EnrichmentConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_marquee_root")]
    pub marquee_root: String,
    #[serde(default = "default_marquee_file")]
    pub default_marquee: String,
    /// Ordered endpoint templates; `{key}` is replaced by the subject key.
    #[serde(default = "default_details_endpoints")]
    pub details_endpoints: Vec<String>,
    /// Human-browsable page offered when every endpoint fails.
    #[serde(default = "default_details_page")]
    pub details_page: String,
    #[serde(default = "default_binary_timeout")]
    pub binary_timeout_secs: u64,
    #[serde(default = "default_structured_timeout")]
    pub structured_timeout_secs: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            marquee_root: default_marquee_root(),
            default_marquee: default_marquee_file(),
            details_endpoints: default_details_endpoints(),
            details_page: default_details_page(),
            binary_timeout_secs: default_binary_timeout(),
            structured_timeout_secs: default_structured_timeout(),
        }
    }
}

fn default_user_agent() -> String {
    format!(
        "Mozilla/5.0 (compatible; arcade-shelf/{})",
        env!("CARGO_PKG_VERSION")
    )
}
fn default_marquee_root() -> String {
    "https://pub-04cb80aef9834a5d908ddf7538b7fffa.r2.dev".to_string()
}
fn default_marquee_file() -> String {
    "default.png".to_string()
}
fn default_details_endpoints() -> Vec<String> {
    vec![
        "https://adb.arcadeitalia.net/service_scraper.php?ajax=query_mame&lang=en&game_name={key}"
            .to_string(),
        "http://adb.arcadeitalia.net/service_scraper.php?ajax=query_mame&lang=en&game_name={key}"
            .to_string(),
    ]
}
fn default_details_page() -> String {
    "http://adb.arcadeitalia.net/?mame={key}".to_string()
}
fn default_binary_timeout() -> u64 {
    10
}
fn default_structured_timeout() -> u64 {
    12
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_search_limit")]
    pub limit: u32,
    #[serde(default = "default_strict")]
    pub strict: bool,
    #[serde(default)]
    pub profile: SubjectProfile,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            timeout_secs: default_search_timeout(),
            limit: default_search_limit(),
            strict: default_strict(),
            profile: SubjectProfile::default(),
        }
    }
}

fn default_search_endpoint() -> String {
    "https://www.loc.gov/collections/chronicling-america/".to_string()
}
fn default_search_timeout() -> u64 {
    20
}
fn default_search_limit() -> u32 {
    25
}
fn default_strict() -> bool {
    true
}

impl Config {
    /// Configuration used when no config file exists.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig::default(),
            remote: RemoteConfig::default(),
            enrichment: EnrichmentConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

/// Fully resolved connection settings for the remote status table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSettings {
    /// Project URL without trailing slash.
    pub url: String,
    pub api_key: String,
    pub table: String,
    pub key_column: String,
    pub rest_path: String,
    pub timeout: Duration,
}

const URL_VARS: &[&str] = &["SHELF_REMOTE_URL", "SUPABASE_URL"];
const KEY_VARS: &[&str] = &["SHELF_REMOTE_KEY", "SUPABASE_ANON_KEY", "SUPABASE_KEY"];

impl RemoteSettings {
    /// Resolve remote settings from the process environment and `config`.
    pub fn from_env(config: &RemoteConfig) -> Option<Self> {
        Self::resolve(config, |name| std::env::var(name).ok())
    }

    /// Resolve remote settings using `lookup` for environment values.
    ///
    /// Environment variables win over the config file. Returns `None`
    /// unless both a URL and a key are present and non-blank.
    pub fn resolve(config: &RemoteConfig, lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let first = |vars: &[&str], file: Option<&String>| -> Option<String> {
            vars.iter()
                .filter_map(|&v| lookup(v))
                .chain(file.cloned())
                .map(|v| v.trim().to_string())
                .find(|v| !v.is_empty())
        };

        let url = first(URL_VARS, config.url.as_ref())?;
        let api_key = first(KEY_VARS, config.api_key.as_ref())?;

        Some(Self {
            url: url.trim_end_matches('/').to_string(),
            api_key,
            table: config.table.clone(),
            key_column: config.key_column.clone(),
            rest_path: config.rest_path.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    /// `<url><rest_path>/<table>`
    pub fn table_url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.url,
            self.rest_path.trim_matches('/'),
            self.table
        )
    }
}

/// Load the config file, or [`Config::minimal`] when it does not exist.
pub fn load_or_minimal(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::minimal())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.remote.timeout_secs == 0 {
        bail!("remote.timeout_secs must be > 0");
    }
    if config.remote.table.trim().is_empty() || config.remote.key_column.trim().is_empty() {
        bail!("remote.table and remote.key_column must not be empty");
    }

    let enrichment = &config.enrichment;
    if enrichment.binary_timeout_secs == 0 || enrichment.structured_timeout_secs == 0 {
        bail!("enrichment timeouts must be > 0");
    }
    if enrichment.details_endpoints.is_empty() {
        bail!("enrichment.details_endpoints must list at least one endpoint");
    }
    for template in enrichment
        .details_endpoints
        .iter()
        .chain(std::iter::once(&enrichment.details_page))
    {
        if !template.contains("{key}") {
            bail!("enrichment template '{}' must contain {{key}}", template);
        }
    }

    if config.search.timeout_secs == 0 {
        bail!("search.timeout_secs must be > 0");
    }
    if !(1..=100).contains(&config.search.limit) {
        bail!("search.limit must be in 1..=100");
    }
    config.search.profile.validate()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_minimal_defaults() {
        let cfg = Config::minimal();
        assert_eq!(cfg.db.path, PathBuf::from("./data/shelf.sqlite"));
        assert_eq!(cfg.remote.table, "game_status");
        assert_eq!(cfg.enrichment.details_endpoints.len(), 2);
        assert!(cfg.enrichment.details_endpoints[0].starts_with("https://"));
        assert!(cfg.search.strict);
        assert!(validate(&cfg).is_ok());
    }

    #[test]
    fn test_parse_partial_file() {
        let cfg: Config = toml::from_str(
            r#"
[db]
path = "/tmp/shelf.sqlite"

[remote]
url = "https://example.supabase.co/"
table = "statuses"
"#,
        )
        .unwrap();
        assert_eq!(cfg.remote.table, "statuses");
        assert_eq!(cfg.remote.key_column, "key");
        assert_eq!(cfg.search.limit, 25);
    }

    #[test]
    fn test_remote_absent_without_key() {
        let cfg = RemoteConfig {
            url: Some("https://example.supabase.co".into()),
            ..RemoteConfig::default()
        };
        assert!(RemoteSettings::resolve(&cfg, env(&[])).is_none());
    }

    #[test]
    fn test_remote_blank_values_are_absent() {
        let cfg = RemoteConfig {
            url: Some("   ".into()),
            api_key: Some("secret".into()),
            ..RemoteConfig::default()
        };
        assert!(RemoteSettings::resolve(&cfg, env(&[])).is_none());
    }

    #[test]
    fn test_env_overrides_file() {
        let cfg = RemoteConfig {
            url: Some("https://file.example".into()),
            api_key: Some("file-key".into()),
            ..RemoteConfig::default()
        };
        let settings = RemoteSettings::resolve(
            &cfg,
            env(&[("SUPABASE_URL", "https://env.example/"), ("SUPABASE_KEY", " k ")]),
        )
        .unwrap();
        assert_eq!(settings.url, "https://env.example");
        assert_eq!(settings.api_key, "k");
        assert_eq!(
            settings.table_url(),
            "https://env.example/rest/v1/game_status"
        );
    }

    #[test]
    fn test_blank_env_falls_through_to_file() {
        let cfg = RemoteConfig {
            url: Some("https://file.example".into()),
            api_key: Some("file-key".into()),
            ..RemoteConfig::default()
        };
        let settings =
            RemoteSettings::resolve(&cfg, env(&[("SHELF_REMOTE_KEY", "  ")])).unwrap();
        assert_eq!(settings.api_key, "file-key");
    }

    #[test]
    fn test_validation_rejects_template_without_key() {
        let mut cfg = Config::minimal();
        cfg.enrichment.details_endpoints = vec!["https://adb.example/scraper".into()];
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn test_validation_rejects_limit() {
        let mut cfg = Config::minimal();
        cfg.search.limit = 0;
        assert!(validate(&cfg).is_err());
    }
}
