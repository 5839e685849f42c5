use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Media extensions, highest priority first.
pub const MEDIA_EXTENSIONS: [&str; 4] = ["m3u8", "mpd", "flv", "mp4"];

static STREAM_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    MEDIA_EXTENSIONS
        .iter()
        .map(|ext| {
            Regex::new(&format!(
                r#"(?i)https?://[^\s'"<>]+\.{ext}(?:\?[^\s'"<>]+)?"#
            ))
            .unwrap()
        })
        .collect()
});

static IFRAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<iframe[^>]+src=["']([^"']+)["']"#).unwrap());

/// First media URL in `text`: by extension priority, then leftmost.
pub fn find_stream(text: &str) -> Option<&str> {
    STREAM_REGEXES
        .iter()
        .find_map(|rgx| rgx.find(text).map(|m| m.as_str()))
}

/// Raw `src` attribute of every `<iframe>` in document order.
pub fn iframe_sources(text: &str) -> impl Iterator<Item = &str> {
    IFRAME_REGEX
        .captures_iter(text)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
}

/// Resolves a frame source against the page it appears in. Only http(s) targets qualify.
pub fn frame_url(base: &Url, src: &str) -> Option<Url> {
    let url = base.join(src.trim()).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

/// Whether an observed network URL points at a media resource.
pub fn is_media_url(raw: &str) -> bool {
    let Ok(url) = Url::parse(raw) else {
        return false;
    };
    let path = url.path().to_ascii_lowercase();
    MEDIA_EXTENSIONS
        .iter()
        .any(|ext| path.contains(&format!(".{ext}")))
}
