//! Historical newspaper archive search.
//!
//! Builds a date-bounded keyword query against a loc.gov-style JSON search
//! endpoint, caches the raw upstream page in the [`Session`] by request URL,
//! and runs the results through a [`RelevanceFilter`] on every call. Keeping
//! the filter out of the cache lets a caller re-run the same query loosely
//! without another network round trip.
//!
//! # Request
//!
//! ```text
//! <endpoint>?q=<keywords>&ops=AND|PHRASE|OR&start_date=YYYY-MM-DD
//!           &end_date=YYYY-MM-DD&c=<limit>&fo=json[&fa=location_state:<region>]
//! ```
//!
//! # Response
//!
//! A JSON object with a `results` array. Per item the first present field
//! wins: `date`; `title` / `partof_title`; `url` / `id`;
//! `snippet` / `description`. Text fields may be strings or arrays of
//! strings.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, Url};
use serde_json::Value;
use tracing::{debug, warn};

use arcade_shelf_core::models::ArticleItem;
use arcade_shelf_core::relevance::{RelevanceFilter, SearchHit, SubjectProfile};

use crate::config::{Config, SearchConfig};
use crate::session::Session;

const SNIPPET_CHARS: usize = 300;

/// How keywords combine upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum MatchMode {
    And,
    Phrase,
    Or,
}

impl MatchMode {
    pub fn as_param(&self) -> &'static str {
        match self {
            MatchMode::And => "AND",
            MatchMode::Phrase => "PHRASE",
            MatchMode::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveQuery {
    pub keywords: Vec<String>,
    pub mode: MatchMode,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// US state facet, e.g. `new york`.
    pub region: Option<String>,
    pub limit: u32,
}

impl ArchiveQuery {
    /// OR query over the names `profile` used in `year`, bounded to that
    /// calendar year. `None` if the year is not a valid date.
    pub fn for_season(profile: &SubjectProfile, year: i32, limit: u32) -> Option<Self> {
        Some(Self {
            keywords: profile.names_for(year),
            mode: MatchMode::Or,
            start: NaiveDate::from_ymd_opt(year, 1, 1)?,
            end: NaiveDate::from_ymd_opt(year, 12, 31)?,
            region: None,
            limit,
        })
    }

    fn query_text(&self) -> String {
        self.keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Raw upstream page as cached per request URL.
#[derive(Debug, Clone)]
pub enum ArchivePage {
    Hits(Vec<SearchHit>),
    Failed(String),
}

/// What a search call returns after filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Results {
        items: Vec<ArticleItem>,
        /// Hits removed by the strict gate.
        discarded: usize,
    },
    Error {
        detail: String,
    },
}

impl SearchOutcome {
    /// True when strict filtering removed every upstream hit.
    pub fn needs_loosening(&self) -> bool {
        matches!(self, SearchOutcome::Results { items, discarded } if items.is_empty() && *discarded > 0)
    }
}

pub struct ArchiveClient {
    client: Client,
    endpoint: String,
    user_agent: String,
}

impl ArchiveClient {
    pub fn new(config: &SearchConfig, user_agent: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            user_agent: user_agent.to_string(),
        })
    }

    /// The full request URL for `query`; also its cache key.
    pub fn request_url(&self, query: &ArchiveQuery) -> Result<Url, url::ParseError> {
        let mut params = vec![
            ("q", query.query_text()),
            ("ops", query.mode.as_param().to_string()),
            ("start_date", query.start.format("%Y-%m-%d").to_string()),
            ("end_date", query.end.format("%Y-%m-%d").to_string()),
            ("c", query.limit.to_string()),
            ("fo", "json".to_string()),
        ];
        if let Some(region) = query.region.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            params.push(("fa", format!("location_state:{}", region.to_lowercase())));
        }
        Url::parse_with_params(&self.endpoint, &params)
    }

    /// Run `query` and filter the results with `filter`.
    pub async fn search(
        &self,
        session: &mut Session,
        query: &ArchiveQuery,
        filter: &RelevanceFilter,
    ) -> SearchOutcome {
        let url = match self.request_url(query) {
            Ok(url) => url,
            Err(e) => {
                return SearchOutcome::Error {
                    detail: format!("invalid search endpoint: {}", e),
                }
            }
        };

        let page = match session.searches.get(url.as_str()) {
            Some(hit) => hit.value.clone(),
            None => {
                let page = match self.fetch(url.clone()).await {
                    Ok(hits) => ArchivePage::Hits(hits),
                    Err(detail) => {
                        warn!(url = %url, error = %detail, "archive search failed");
                        ArchivePage::Failed(detail)
                    }
                };
                session.searches.insert(url.to_string(), page)
            }
        };

        match page {
            ArchivePage::Hits(hits) => {
                let filtered = filter.apply(hits);
                debug!(
                    variants = ?filter.variants(),
                    kept = filtered.items.len(),
                    discarded = filtered.discarded,
                    strict = filter.is_strict(),
                    "archive results filtered"
                );
                SearchOutcome::Results {
                    items: filtered.items,
                    discarded: filtered.discarded,
                }
            }
            ArchivePage::Failed(detail) => SearchOutcome::Error { detail },
        }
    }

    async fn fetch(&self, url: Url) -> Result<Vec<SearchHit>, String> {
        debug!(url = %url, "querying archive");
        let resp = self
            .client
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| e.to_string())?;
        if !status.is_success() {
            return Err(format!("HTTP {}", status));
        }
        parse_results(&body)
    }
}

/// Options for `shelf search`.
#[derive(Debug, Clone)]
pub struct SearchArgs {
    pub year: i32,
    pub keywords: Option<String>,
    pub mode: Option<MatchMode>,
    pub region: Option<String>,
    pub limit: Option<u32>,
    pub loose: bool,
}

/// Search the archive for one season and print ranked articles.
pub async fn run_search(config: &Config, args: SearchArgs) -> anyhow::Result<()> {
    let profile = &config.search.profile;
    let limit = args.limit.unwrap_or(config.search.limit).clamp(1, 100);
    let mut query = ArchiveQuery::for_season(profile, args.year, limit)
        .ok_or_else(|| anyhow::anyhow!("invalid year: {}", args.year))?;

    if let Some(keywords) = args.keywords.as_deref().filter(|k| !k.trim().is_empty()) {
        query.keywords = vec![keywords.trim().to_string()];
        query.mode = MatchMode::And;
    } else if query.keywords.is_empty() {
        anyhow::bail!(
            "no subject names for {}; pass --keywords or add an era to [search.profile]",
            args.year
        );
    }
    if let Some(mode) = args.mode {
        query.mode = mode;
    }
    query.region = args.region;

    let strict = config.search.strict && !args.loose;
    let filter = RelevanceFilter::for_year(profile, args.year, strict);
    let client = ArchiveClient::new(&config.search, &config.enrichment.user_agent)?;
    let mut session = Session::new();

    let outcome = client.search(&mut session, &query, &filter).await;
    match &outcome {
        SearchOutcome::Error { detail } => {
            println!("Archive search failed: {}", detail);
        }
        SearchOutcome::Results { items, discarded } => {
            if outcome.needs_loosening() {
                println!(
                    "All {} results were filtered out as off-topic. Try --loose or different keywords.",
                    discarded
                );
            } else if items.is_empty() {
                println!("No articles found.");
            } else {
                for (i, item) in items.iter().enumerate() {
                    println!(
                        "{}. [{}] {} ({})",
                        i + 1,
                        item.relevance_score,
                        item.source_title,
                        item.date
                    );
                    println!("   {}", item.url);
                    if !item.snippet.is_empty() {
                        println!("   {}", item.snippet);
                    }
                }
                if *discarded > 0 {
                    eprintln!("{} off-topic results hidden", discarded);
                }
            }
        }
    }
    Ok(())
}

/// Parse an archive response body into unscored hits.
pub fn parse_results(body: &str) -> Result<Vec<SearchHit>, String> {
    let value: Value = serde_json::from_str(body).map_err(|e| format!("invalid JSON: {}", e))?;
    let results = value
        .get("results")
        .and_then(|r| r.as_array())
        .ok_or_else(|| "response has no results array".to_string())?;

    Ok(results.iter().map(parse_item).collect())
}

fn parse_item(raw: &Value) -> SearchHit {
    let field = |names: &[&str]| -> String {
        names
            .iter()
            .map(|n| text_of(raw.get(*n)))
            .find(|s| !s.is_empty())
            .unwrap_or_default()
    };

    let title = field(&["title", "partof_title"]);
    let snippet = text_of(raw.get("snippet"));
    let description = text_of(raw.get("description"));
    let display = if snippet.is_empty() { &description } else { &snippet };

    let item = ArticleItem {
        date: field(&["date"]),
        source_title: title.clone(),
        url: field(&["url", "id"]),
        snippet: clip(display, SNIPPET_CHARS),
        relevance_score: 0,
    };
    SearchHit::new(item, &[title.as_str(), snippet.as_str(), description.as_str()])
}

/// Flatten a string or array-of-strings field.
fn text_of(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|i| i.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        _ => String::new(),
    }
}

fn clip(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect::<String>() + "…"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(endpoint: &str) -> ArchiveClient {
        let config = SearchConfig {
            endpoint: endpoint.into(),
            ..SearchConfig::default()
        };
        ArchiveClient::new(&config, "test-agent").unwrap()
    }

    #[test]
    fn test_for_season_uses_period_names() {
        let profile = SubjectProfile::default();
        let q = ArchiveQuery::for_season(&profile, 1908, 10).unwrap();
        assert!(q.keywords.contains(&"highlanders".to_string()));
        assert!(!q.keywords.contains(&"yankees".to_string()));
        assert_eq!(q.mode, MatchMode::Or);
        assert_eq!(q.start, NaiveDate::from_ymd_opt(1908, 1, 1).unwrap());
        assert_eq!(q.end, NaiveDate::from_ymd_opt(1908, 12, 31).unwrap());
    }

    #[test]
    fn test_request_url_params() {
        let c = client("https://archive.example/search/");
        let q = ArchiveQuery {
            keywords: vec!["yankees".into(), "pennant".into()],
            mode: MatchMode::And,
            start: NaiveDate::from_ymd_opt(1923, 4, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(1923, 10, 15).unwrap(),
            region: Some("New York".into()),
            limit: 5,
        };
        let url = c.request_url(&q).unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("q".into(), "yankees pennant".into())));
        assert!(pairs.contains(&("ops".into(), "AND".into())));
        assert!(pairs.contains(&("start_date".into(), "1923-04-01".into())));
        assert!(pairs.contains(&("end_date".into(), "1923-10-15".into())));
        assert!(pairs.contains(&("c".into(), "5".into())));
        assert!(pairs.contains(&("fo".into(), "json".into())));
        assert!(pairs.contains(&("fa".into(), "location_state:new york".into())));
    }

    #[test]
    fn test_parse_results_field_fallbacks() {
        let body = r#"{"results": [
            {"date": "1923-10-15", "title": "The Sun", "url": "https://a/1",
             "snippet": "Yankees win the World Series"},
            {"date": "1923-10-16", "partof_title": ["Evening World"], "id": "https://a/2",
             "description": ["Ruth homers", "pitcher Pennock"]}
        ]}"#;
        let hits = parse_results(body).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].item.source_title, "The Sun");
        assert_eq!(hits[1].item.source_title, "Evening World");
        assert_eq!(hits[1].item.url, "https://a/2");
        assert_eq!(hits[1].item.snippet, "Ruth homers pitcher Pennock");
        assert!(hits[1].blob.contains("pitcher pennock"));
    }

    #[test]
    fn test_parse_results_requires_array() {
        assert!(parse_results(r#"{"items": []}"#).is_err());
        assert!(parse_results("<html>").is_err());
    }

    #[test]
    fn test_clip() {
        assert_eq!(clip("short", 10), "short");
        assert_eq!(clip("abcdef", 3), "abc…");
    }

    #[test]
    fn test_needs_loosening() {
        let empty = SearchOutcome::Results {
            items: vec![],
            discarded: 3,
        };
        assert!(empty.needs_loosening());
        let nothing = SearchOutcome::Results {
            items: vec![],
            discarded: 0,
        };
        assert!(!nothing.needs_loosening());
    }
}
