/// Parsing of `label - url` button definitions.
///
/// Each line is parsed independently: the leftmost occurrence of a
/// recognized separator splits it into label and URL candidates. Lines
/// without a separator or with an invalid URL are silently dropped so the
/// other lines of the same submission still succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedButton {
    pub label: String,
    pub url: String,
}

const SEPARATORS: &[&str] = &[" - ", " | ", " — "];

pub fn parse_button_lines(input: &str) -> Vec<ParsedButton> {
    let mut buttons = Vec::new();

    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut earliest: Option<(usize, &str)> = None;
        for separator in SEPARATORS {
            if let Some(index) = line.find(separator) {
                if earliest.map_or(true, |(best, _)| index < best) {
                    earliest = Some((index, separator));
                }
            }
        }
        let Some((index, separator)) = earliest else {
            continue;
        };

        let label = line[..index].trim();
        let url = line[index + separator.len()..].trim();
        if label.is_empty() || !is_valid_url(url) {
            continue;
        }

        buttons.push(ParsedButton {
            label: label.to_string(),
            url: url.to_string(),
        });
    }

    buttons
}

/// Strict `http(s)://host[...]` shape check for Telegram button URLs.
///
/// Accepts dotted domains, `localhost` and IPv4 literals, with an optional
/// numeric port and path/query. Anything with whitespace or a missing
/// scheme is rejected.
pub fn is_valid_url(url: &str) -> bool {
    if url.is_empty() || url.chars().any(char::is_whitespace) {
        return false;
    }

    let lower = url.to_ascii_lowercase();
    let rest = if let Some(rest) = lower.strip_prefix("https://") {
        rest
    } else if let Some(rest) = lower.strip_prefix("http://") {
        rest
    } else {
        return false;
    };

    let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..authority_end];
    if authority.is_empty() {
        return false;
    }

    let (host, port) = match authority.split_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (authority, None),
    };
    if let Some(port) = port {
        if port.is_empty() || !port.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
    }
    if host.is_empty() {
        return false;
    }

    if host == "localhost" {
        return true;
    }

    // IPv4 literal
    if host.chars().all(|c| c.is_ascii_digit() || c == '.') {
        let octets: Vec<&str> = host.split('.').collect();
        return octets.len() == 4
            && octets
                .iter()
                .all(|o| !o.is_empty() && o.len() <= 3 && o.chars().all(|c| c.is_ascii_digit()));
    }

    // Dotted domain with an alphabetic TLD
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    for label in &labels {
        if label.is_empty()
            || !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            || label.starts_with('-')
            || label.ends_with('-')
        {
            return false;
        }
    }
    labels
        .last()
        .is_some_and(|tld| tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_line() {
        let buttons = parse_button_lines("Подробнее - https://example.com");
        assert_eq!(
            buttons,
            vec![ParsedButton {
                label: "Подробнее".to_string(),
                url: "https://example.com".to_string(),
            }]
        );
    }

    #[test]
    fn test_parse_pipe_and_dash_separators() {
        let buttons = parse_button_lines(
            "Сайт | https://example.com\nКанал — https://t.me/channel",
        );
        assert_eq!(buttons.len(), 2);
        assert_eq!(buttons[0].label, "Сайт");
        assert_eq!(buttons[1].url, "https://t.me/channel");
    }

    #[test]
    fn test_leftmost_separator_wins() {
        let buttons = parse_button_lines("Метка - https://example.com/a|b");
        assert_eq!(buttons.len(), 1);
        assert_eq!(buttons[0].label, "Метка");
        assert_eq!(buttons[0].url, "https://example.com/a|b");

        // Splitting at the leftmost separator leaves a URL candidate with
        // spaces, so the whole line is dropped
        assert!(parse_button_lines("A | B - https://example.com").is_empty());
    }

    #[test]
    fn test_invalid_lines_dropped_without_affecting_others() {
        let buttons = parse_button_lines(
            "Без ссылки\nПлохой урл - ftp://example.com\nХороший - https://example.com\n\n",
        );
        assert_eq!(buttons.len(), 1);
        assert_eq!(buttons[0].label, "Хороший");
    }

    #[test]
    fn test_zero_valid_lines() {
        assert!(parse_button_lines("просто текст\nещё текст").is_empty());
        assert!(parse_button_lines("").is_empty());
    }

    #[test]
    fn test_valid_urls() {
        assert!(is_valid_url("https://example.com"));
        assert!(is_valid_url("http://example.com/path?query=1"));
        assert!(is_valid_url("https://sub.example.co.uk"));
        assert!(is_valid_url("http://localhost"));
        assert!(is_valid_url("http://localhost:8080/page"));
        assert!(is_valid_url("http://192.168.1.1"));
        assert!(is_valid_url("HTTPS://EXAMPLE.COM"));
    }

    #[test]
    fn test_invalid_urls() {
        assert!(!is_valid_url(""));
        assert!(!is_valid_url("example.com"));
        assert!(!is_valid_url("ftp://example.com"));
        assert!(!is_valid_url("https://"));
        assert!(!is_valid_url("https://exa mple.com"));
        assert!(!is_valid_url("https://example"));
        assert!(!is_valid_url("https://example.c0m"));
        assert!(!is_valid_url("https://example.com:port"));
    }
}
