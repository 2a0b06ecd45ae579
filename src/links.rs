//! Research links for a game title.
//!
//! Plain search-engine URLs; nothing is fetched.

/// `(label, url)` pairs for `title`, in display order.
pub fn research_links(title: &str) -> Vec<(&'static str, String)> {
    let words = title.split_whitespace().collect::<Vec<_>>().join(" ");
    let q: String = url::form_urlencoded::byte_serialize(words.as_bytes()).collect();
    vec![
        (
            "Gameplay (YouTube)",
            format!("https://www.youtube.com/results?search_query={}+arcade+gameplay", q),
        ),
        (
            "History / Legacy (search)",
            format!("https://www.google.com/search?q={}+arcade+history+legacy", q),
        ),
        (
            "Controls / Moves (search)",
            format!("https://www.google.com/search?q={}+arcade+controls+buttons", q),
        ),
        (
            "Manual / Instructions (search)",
            format!("https://www.google.com/search?q={}+arcade+manual+instructions", q),
        ),
        (
            "Ports / Collections (search)",
            format!("https://www.google.com/search?q={}+arcade+collection+port", q),
        ),
    ]
}

/// Print research links for `title`.
pub fn run_links(title: &str) {
    for (label, url) in research_links(title) {
        println!("{}: {}", label, url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links_join_words() {
        let links = research_links("Ms. Pac-Man  Plus");
        assert_eq!(links.len(), 5);
        assert_eq!(
            links[0].1,
            "https://www.youtube.com/results?search_query=Ms.+Pac-Man+Plus+arcade+gameplay"
        );
        assert!(links[4].1.ends_with("Ms.+Pac-Man+Plus+arcade+collection+port"));
    }

    #[test]
    fn test_links_encode_reserved_characters() {
        let links = research_links("Spy & Spy #2");
        assert_eq!(
            links[1].1,
            "https://www.google.com/search?q=Spy+%26+Spy+%232+arcade+history+legacy"
        );
    }
}
