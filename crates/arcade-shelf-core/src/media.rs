//! Media-reference extraction from arbitrary JSON payloads.
//!
//! Third-party metadata services do not keep stable field names for their
//! artwork, so instead of probing known keys this module walks the whole
//! [`serde_json::Value`] tree and collects every string that looks like an
//! absolute image URL.
//!
//! # Matching Rules
//!
//! A string (after trimming) is collected when:
//! - it starts with `http://` or `https://` and has a non-empty host,
//! - it contains no whitespace,
//! - its path ends in `.png`, `.jpg`, `.jpeg`, or `.webp` (case-insensitive),
//!   optionally followed by a `?query`.
//!
//! Results are de-duplicated, preserving first-seen order.

use std::collections::HashSet;

use serde_json::Value;

const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".webp"];

/// Collect every image URL found anywhere in `payload`.
///
/// ```rust
/// use arcade_shelf_core::media::extract_media_references;
///
/// let payload = serde_json::json!({"a": {"b": ["https://x/y.png", "not a url"]}});
/// assert_eq!(extract_media_references(&payload), vec!["https://x/y.png"]);
/// ```
pub fn extract_media_references(payload: &Value) -> Vec<String> {
    let mut found = Vec::new();
    walk(payload, &mut found);

    let mut seen = HashSet::new();
    found.retain(|url| seen.insert(url.clone()));
    found
}

fn walk(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for v in map.values() {
                walk(v, out);
            }
        }
        Value::Array(items) => {
            for v in items {
                walk(v, out);
            }
        }
        Value::String(s) => {
            let s = s.trim();
            if is_image_url(s) {
                out.push(s.to_string());
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

/// True if `s` is an absolute HTTP(S) URL pointing at an image file.
pub fn is_image_url(s: &str) -> bool {
    let rest = match s
        .strip_prefix("https://")
        .or_else(|| s.strip_prefix("http://"))
    {
        Some(rest) => rest,
        None => return false,
    };
    if rest.is_empty() || rest.starts_with('/') || s.chars().any(char::is_whitespace) {
        return false;
    }

    // The extension may close the string or sit just before any `?`.
    let lower = s.to_ascii_lowercase();
    let mut ends: Vec<usize> = lower.match_indices('?').map(|(i, _)| i).collect();
    ends.push(lower.len());
    ends.iter().any(|&end| {
        let head = &lower[..end];
        IMAGE_EXTENSIONS.iter().any(|ext| head.ends_with(ext))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_extraction_in_order() {
        let payload = json!({"a": {"b": ["https://x/y.png", "not a url", "https://x/z.jpg?x=1"]}});
        assert_eq!(
            extract_media_references(&payload),
            vec!["https://x/y.png", "https://x/z.jpg?x=1"]
        );
    }

    #[test]
    fn test_deduplicates_preserving_first_seen() {
        let payload = json!([
            "https://cdn/a.webp",
            {"again": "https://cdn/a.webp", "other": "https://cdn/b.JPEG"},
            "https://cdn/a.webp"
        ]);
        assert_eq!(
            extract_media_references(&payload),
            vec!["https://cdn/a.webp", "https://cdn/b.JPEG"]
        );
    }

    #[test]
    fn test_ignores_non_image_and_non_http() {
        let payload = json!({
            "page": "https://adb.arcadeitalia.net/?mame=pacman",
            "ftp": "ftp://host/a.png",
            "relative": "/media/a.png",
            "count": 3,
            "flag": true,
            "nothing": null
        });
        assert!(extract_media_references(&payload).is_empty());
    }

    #[test]
    fn test_trims_whitespace() {
        let payload = json!({"url_image_title": "  http://adb/media/pacman.png  "});
        assert_eq!(
            extract_media_references(&payload),
            vec!["http://adb/media/pacman.png"]
        );
    }

    #[test]
    fn test_is_image_url_edge_cases() {
        assert!(is_image_url("https://x/y.PNG"));
        assert!(is_image_url("https://x/y.jpeg?size=large&v=2"));
        assert!(!is_image_url("https://x/y.png#frag"));
        assert!(!is_image_url("https://"));
        assert!(!is_image_url("https://x/y z.png"));
        assert!(!is_image_url("https://x/y.gif"));
    }
}
