//! Export the keys holding a given status.
//!
//! The default export is the "Want to Play" list: one line per key, sorted,
//! as plain text for pasting into notes. `--json` emits the same selection
//! as an array of `{key, status}` objects for scripts.

use anyhow::Result;
use serde::Serialize;
use std::path::Path;

use arcade_shelf_core::models::{Status, StatusMap};

use crate::session::Session;
use crate::status::StatusService;

#[derive(Serialize)]
struct ExportRow<'a> {
    key: &'a str,
    status: &'a Status,
}

/// Keys in `map` holding `status`, in key order.
pub fn select<'a>(map: &'a StatusMap, status: &Status) -> Vec<&'a str> {
    map.iter()
        .filter(|(_, s)| *s == status)
        .map(|(k, _)| k.as_str())
        .collect()
}

/// Plain-text export body.
pub fn render_text(map: &StatusMap, status: &Status) -> String {
    let keys = select(map, status);
    if keys.is_empty() {
        return format!("No games marked as {}.", status.title());
    }
    keys.iter()
        .map(|k| format!("ROM: {}", k))
        .collect::<Vec<_>>()
        .join("\n")
}

/// JSON export body.
pub fn render_json(map: &StatusMap, status: &Status) -> Result<String> {
    let rows: Vec<ExportRow> = select(map, status)
        .into_iter()
        .map(|key| ExportRow { key, status })
        .collect();
    Ok(serde_json::to_string_pretty(&rows)?)
}

/// Export keys with `status`.
///
/// If `output` is `Some`, writes to that file path. Otherwise writes
/// to stdout for piping.
pub async fn run_export(
    service: &StatusService,
    session: &mut Session,
    status: &Status,
    json: bool,
    output: Option<&Path>,
) -> Result<()> {
    let map = service.statuses(session).await?;
    let body = if json {
        render_json(&map, status)?
    } else {
        render_text(&map, status)
    };
    let count = select(&map, status).len();

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &body)?;
            eprintln!("Exported {} {} keys to {}", count, status, path.display());
        }
        None => {
            println!("{}", body);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StatusMap {
        StatusMap::from([
            ("galaga".to_string(), Status::WantToPlay),
            ("dkong".to_string(), Status::WantToPlay),
            ("pacman".to_string(), Status::Played),
        ])
    }

    #[test]
    fn test_text_export_sorted() {
        assert_eq!(
            render_text(&sample(), &Status::WantToPlay),
            "ROM: dkong\nROM: galaga"
        );
    }

    #[test]
    fn test_text_export_empty() {
        assert_eq!(
            render_text(&sample(), &Status::NotPlayable),
            "No games marked as Not playable."
        );
    }

    #[test]
    fn test_json_export() {
        let json = render_json(&sample(), &Status::Played).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, serde_json::json!([{"key": "pacman", "status": "played"}]));
    }
}
