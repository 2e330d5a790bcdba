use once_cell::sync::Lazy;
use regex::Regex;

/// Longest excerpt, in characters, before the ellipsis.
pub const EXCERPT_LENGTH: usize = 200;

/// Tags that end a line of text when rendered.
static BLOCK_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)</?(?:p|br|div|li|ul|ol|h[2-6]|blockquote|pre|hr|table|thead|tbody|tr|th|td)\b[^>]*>")
        .expect("block tag pattern compiles")
});

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag pattern compiles"));

static LINE_BREAKS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\r\n|\r|\n)+").expect("line break pattern compiles"));

/// Plain-text summary of an HTML fragment.
///
/// Tags are stripped (block-level ones leave a line break behind, inline
/// ones leave nothing), the handful of entities the sanitizer emits are
/// decoded, each run of line breaks becomes one space, and anything past
/// [`EXCERPT_LENGTH`] characters is cut and marked with `...`.
pub fn make_excerpt(html: &str) -> String {
    let text = BLOCK_TAG.replace_all(html, "\n");
    let text = TAG.replace_all(&text, "");
    let text = decode_entities(&text);
    let text = LINE_BREAKS.replace_all(&text, " ");
    limit(text.trim(), EXCERPT_LENGTH)
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn limit(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", text[..cut].trim_end()),
        None => text.to_string(),
    }
}
