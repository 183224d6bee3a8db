pub mod captions;
pub mod config;
pub mod limiter;
pub mod prompt;
pub mod relay;
pub mod server;

use std::sync::OnceLock;

use regex::Regex;

/// Normalize a video reference to a bare 11-character video ID.
///
/// The extension sends whatever it scraped from the active tab, so full
/// URL forms are accepted alongside bare IDs. Returns `None` when no video
/// ID can be found in the input.
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();

    if is_bare_id(input) {
        return Some(input.to_string());
    }

    static URL_RE: OnceLock<Regex> = OnceLock::new();
    let re = URL_RE.get_or_init(|| {
        Regex::new(
            r"(?:youtube\.com/watch\?[^\s]*v=|youtu\.be/|youtube\.com/embed/|youtube\.com/shorts/)([a-zA-Z0-9_-]{11})",
        )
        .unwrap()
    });

    re.captures(input).map(|caps| caps[1].to_string())
}

fn is_bare_id(s: &str) -> bool {
    s.len() == 11 && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}
