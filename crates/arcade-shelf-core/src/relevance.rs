//! Relevance filtering for archive search results.
//!
//! Full-text newspaper search upstream is high recall and low precision:
//! a query for a ball club returns weather reports, shipping notices and
//! anything else that happens to share a page with the club's name. This
//! module narrows and orders those results in two stages:
//!
//! 1. **Gate** (strict mode only): drop every hit whose text contains none
//!    of the subject-name variants valid for the searched period.
//! 2. **Rank**: score each surviving hit by how many distinct supporting
//!    terms appear in its text, then stable-sort by descending score so ties
//!    keep upstream order.
//!
//! The subject's canonical name changed over time (the New York American
//! League club was the Highlanders before it was the Yankees), so the
//! variants are chosen per year from a [`SubjectProfile`].

use anyhow::{bail, Result};
use serde::Deserialize;

use crate::models::ArticleItem;

/// A span of years during which a set of names referred to the subject.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Era {
    pub from: i32,
    /// Inclusive end year; open-ended when absent.
    #[serde(default)]
    pub to: Option<i32>,
    pub names: Vec<String>,
}

impl Era {
    fn covers(&self, year: i32) -> bool {
        self.from <= year && self.to.map_or(true, |to| year <= to)
    }
}

/// Period-dependent names plus the topic vocabulary used for ranking.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SubjectProfile {
    pub eras: Vec<Era>,
    #[serde(default = "default_support_terms")]
    pub support_terms: Vec<String>,
}

fn default_support_terms() -> Vec<String> {
    [
        "box score",
        "pitcher",
        "innings",
        "home run",
        "batting",
        "pennant",
        "shortstop",
        "catcher",
        "outfielder",
        "doubleheader",
        "world series",
        "american league",
        "polo grounds",
        "hilltop park",
        "strikeouts",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for SubjectProfile {
    fn default() -> Self {
        Self {
            eras: vec![
                Era {
                    from: 1903,
                    to: Some(1912),
                    names: vec![
                        "highlanders".to_string(),
                        "hilltoppers".to_string(),
                        "new york americans".to_string(),
                    ],
                },
                Era {
                    from: 1913,
                    to: None,
                    names: vec!["yankees".to_string(), "yanks".to_string()],
                },
            ],
            support_terms: default_support_terms(),
        }
    }
}

impl SubjectProfile {
    /// Name variants valid in `year`, lowercased. Empty when no era covers it.
    pub fn names_for(&self, year: i32) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for era in self.eras.iter().filter(|e| e.covers(year)) {
            for name in &era.names {
                let name = name.trim().to_lowercase();
                if !name.is_empty() && !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    pub fn validate(&self) -> Result<()> {
        if self.eras.is_empty() {
            bail!("search.profile must define at least one era");
        }
        for era in &self.eras {
            if era.names.iter().all(|n| n.trim().is_empty()) {
                bail!("search.profile era starting {} has no names", era.from);
            }
            if let Some(to) = era.to {
                if to < era.from {
                    bail!(
                        "search.profile era {}-{} ends before it starts",
                        era.from,
                        to
                    );
                }
            }
        }
        Ok(())
    }
}

/// A search result paired with the lowercase text it is judged on.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub item: ArticleItem,
    pub blob: String,
}

impl SearchHit {
    /// Build a hit whose blob joins the given text fields.
    pub fn new(item: ArticleItem, text_fields: &[&str]) -> Self {
        let blob = text_fields
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        Self { item, blob }
    }
}

/// Result of [`RelevanceFilter::apply`].
#[derive(Debug, Clone, Default)]
pub struct Filtered {
    /// Surviving items, best first.
    pub items: Vec<ArticleItem>,
    /// How many hits the strict gate removed.
    pub discarded: usize,
}

impl Filtered {
    /// True when the gate removed everything upstream returned, so the
    /// caller should suggest loosening filters instead of an empty state.
    pub fn needs_loosening(&self) -> bool {
        self.items.is_empty() && self.discarded > 0
    }
}

/// Two-stage filter: hard inclusion gate plus soft ranking.
#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    variants: Vec<String>,
    support_terms: Vec<String>,
    strict: bool,
}

impl RelevanceFilter {
    pub fn new(variants: Vec<String>, support_terms: Vec<String>, strict: bool) -> Self {
        let lower = |v: Vec<String>| -> Vec<String> {
            v.into_iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect()
        };
        Self {
            variants: lower(variants),
            support_terms: lower(support_terms),
            strict,
        }
    }

    /// Filter for `year` using the profile's period-appropriate names.
    pub fn for_year(profile: &SubjectProfile, year: i32, strict: bool) -> Self {
        Self::new(
            profile.names_for(year),
            profile.support_terms.clone(),
            strict,
        )
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn variants(&self) -> &[String] {
        &self.variants
    }

    /// Number of distinct support terms present in `blob`.
    pub fn score(&self, blob: &str) -> u32 {
        self.support_terms
            .iter()
            .filter(|t| blob.contains(t.as_str()))
            .count() as u32
    }

    fn passes_gate(&self, blob: &str) -> bool {
        // Strict with no variants: nothing can name the subject.
        !self.strict || self.variants.iter().any(|v| blob.contains(v.as_str()))
    }

    /// Gate, score, and rank `hits`.
    pub fn apply(&self, hits: Vec<SearchHit>) -> Filtered {
        let total = hits.len();
        let mut items: Vec<ArticleItem> = hits
            .into_iter()
            .filter(|h| self.passes_gate(&h.blob))
            .map(|h| {
                let mut item = h.item;
                item.relevance_score = self.score(&h.blob);
                item
            })
            .collect();
        let discarded = total - items.len();

        // `sort_by` is stable: equal scores keep upstream order.
        items.sort_by(|a, b| b.relevance_score.cmp(&a.relevance_score));

        Filtered { items, discarded }
    }
}
