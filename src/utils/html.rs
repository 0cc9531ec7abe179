/// Helpers for Telegram HTML parse mode.
///
/// Bot UI messages are rendered as HTML, so any user-provided text that is
/// interpolated into them must be escaped first.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn truncate_text(text: &str, max_length: usize) -> String {
    const SUFFIX: &str = "...";
    if text.chars().count() <= max_length {
        return text.to_string();
    }
    let cut: String = text
        .chars()
        .take(max_length.saturating_sub(SUFFIX.len()))
        .collect();
    format!("{cut}{SUFFIX}")
}

/// Short escaped preview of post text for list rows and detail views.
pub fn post_preview_text(text: Option<&str>, max_chars: usize) -> String {
    match text {
        Some(text) if !text.is_empty() => {
            let first_line = text.lines().next().unwrap_or_default();
            escape_html(&truncate_text(first_line, max_chars))
        }
        _ => "—".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a < b & c > d"), "a &lt; b &amp; c &gt; d");
        assert_eq!(escape_html("plain"), "plain");
        assert_eq!(escape_html(""), "");
        // Ampersand escapes first so entities are not double-broken
        assert_eq!(escape_html("&lt;"), "&amp;lt;");
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 20), "short");
        assert_eq!(truncate_text("abcdefghij", 8), "abcde...");
    }

    #[test]
    fn test_post_preview_text() {
        assert_eq!(post_preview_text(None, 20), "—");
        assert_eq!(post_preview_text(Some(""), 20), "—");
        assert_eq!(post_preview_text(Some("первая\nвторая"), 20), "первая");
        assert_eq!(post_preview_text(Some("<b>x</b>"), 20), "&lt;b&gt;x&lt;/b&gt;");
    }
}
