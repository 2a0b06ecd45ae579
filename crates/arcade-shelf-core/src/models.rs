//! Core data models shared by the status service and enrichment clients.
//!
//! These types represent status keys, user-assigned statuses, stored
//! records, and the derived article items produced by archive search.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Normalized identifier for a catalog entry (e.g. a MAME ROM short name).
///
/// Always trimmed, lowercased, and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StatusKey(String);

impl StatusKey {
    /// Normalize raw input into a key. Blank input yields `None`.
    ///
    /// ```rust
    /// use arcade_shelf_core::models::StatusKey;
    ///
    /// assert_eq!(StatusKey::parse("  PacMan ").unwrap().as_str(), "pacman");
    /// assert!(StatusKey::parse("   ").is_none());
    /// ```
    pub fn parse(raw: &str) -> Option<Self> {
        let key = raw.trim().to_lowercase();
        if key.is_empty() {
            None
        } else {
            Some(Self(key))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StatusKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A user-assigned status.
///
/// The four arcade statuses are named; other dashboard variants store
/// free-form values such as `read` or `favorite`, kept as [`Status::Other`].
/// "No status" is modelled as `Option<Status>::None`, never as a variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Status {
    WantToPlay,
    Played,
    DontHaveRom,
    NotPlayable,
    Other(String),
}

impl Status {
    pub const WANT_TO_PLAY: &'static str = "want_to_play";
    pub const PLAYED: &'static str = "played";
    pub const DONT_HAVE_ROM: &'static str = "dont_have_rom";
    pub const NOT_PLAYABLE: &'static str = "not_playable";

    /// Parse a status string. `"none"`, `"-"` and blank input mean "no status".
    pub fn parse_opt(raw: &str) -> Option<Self> {
        let s = raw.trim().to_lowercase();
        match s.as_str() {
            "" | "none" | "-" => None,
            Self::WANT_TO_PLAY => Some(Self::WantToPlay),
            Self::PLAYED => Some(Self::Played),
            Self::DONT_HAVE_ROM => Some(Self::DontHaveRom),
            Self::NOT_PLAYABLE => Some(Self::NotPlayable),
            _ => Some(Self::Other(s)),
        }
    }

    /// Wire form stored in both backends.
    pub fn as_str(&self) -> &str {
        match self {
            Self::WantToPlay => Self::WANT_TO_PLAY,
            Self::Played => Self::PLAYED,
            Self::DontHaveRom => Self::DONT_HAVE_ROM,
            Self::NotPlayable => Self::NOT_PLAYABLE,
            Self::Other(s) => s,
        }
    }

    /// Plain name, e.g. `Want to Play`.
    pub fn title(&self) -> String {
        match self {
            Self::WantToPlay => "Want to Play".to_string(),
            Self::Played => "Played".to_string(),
            Self::DontHaveRom => "Don't have ROM".to_string(),
            Self::NotPlayable => "Not playable".to_string(),
            Self::Other(s) => s.replace('_', " "),
        }
    }

    /// Human label shown next to a game.
    pub fn label(&self) -> String {
        let icon = match self {
            Self::WantToPlay => "⏳ ",
            Self::Played => "✅ ",
            Self::DontHaveRom => "🧩 ",
            Self::NotPlayable => "🚫 ",
            Self::Other(_) => "",
        };
        format!("{}{}", icon, self.title())
    }
}

/// Label for an optional status; absent renders as an em-dash placeholder.
pub fn status_label(status: Option<&Status>) -> String {
    status.map(Status::label).unwrap_or_else(|| "—".to_string())
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_opt(s).ok_or_else(|| format!("'{}' is not a storable status", s))
    }
}

impl Serialize for Status {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Every stored status, keyed by normalized key.
pub type StatusMap = BTreeMap<String, Status>;

/// A persisted status row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusRecord {
    pub key: String,
    pub status: Status,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A ranked archive search result. Derived per query, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleItem {
    /// Issue date as reported upstream (usually `YYYY-MM-DD`).
    pub date: String,
    /// Newspaper or collection title.
    pub source_title: String,
    pub url: String,
    /// Short excerpt for display.
    pub snippet: String,
    /// Number of supporting terms found in the item's text.
    pub relevance_score: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_normalization() {
        assert_eq!(StatusKey::parse("DKong").unwrap().as_str(), "dkong");
        assert_eq!(StatusKey::parse("\tsf2 \n").unwrap().to_string(), "sf2");
        assert!(StatusKey::parse("").is_none());
    }

    #[test]
    fn test_status_none_variants() {
        assert_eq!(Status::parse_opt("none"), None);
        assert_eq!(Status::parse_opt(" NONE "), None);
        assert_eq!(Status::parse_opt(""), None);
        assert_eq!(Status::parse_opt("-"), None);
    }

    #[test]
    fn test_status_known_and_other() {
        assert_eq!(Status::parse_opt("Played"), Some(Status::Played));
        assert_eq!(
            Status::parse_opt("want_to_play"),
            Some(Status::WantToPlay)
        );
        assert_eq!(
            Status::parse_opt("favorite"),
            Some(Status::Other("favorite".to_string()))
        );
        assert_eq!(Status::Other("read".into()).as_str(), "read");
    }

    #[test]
    fn test_status_from_str_rejects_none() {
        assert!("none".parse::<Status>().is_err());
        assert_eq!("dont_have_rom".parse::<Status>(), Ok(Status::DontHaveRom));
    }

    #[test]
    fn test_status_serde_wire_form() {
        let json = serde_json::to_string(&Status::NotPlayable).unwrap();
        assert_eq!(json, "\"not_playable\"");
        let back: Status = serde_json::from_str("\"played\"").unwrap();
        assert_eq!(back, Status::Played);
    }

    #[test]
    fn test_labels() {
        assert_eq!(status_label(None), "—");
        assert_eq!(status_label(Some(&Status::Played)), "✅ Played");
        assert_eq!(Status::Other("to_read".into()).label(), "to read");
    }
}
