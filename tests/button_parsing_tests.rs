use channel_post_bot::utils::buttons::{is_valid_url, parse_button_lines};

#[test]
fn test_label_and_url_preserved() {
    let inputs = vec![
        ("Подробнее - https://example.com", "Подробнее", "https://example.com"),
        ("Наш сайт | http://example.org/page", "Наш сайт", "http://example.org/page"),
        ("Канал — https://t.me/channel", "Канал", "https://t.me/channel"),
        ("Multi word label - https://sub.example.co.uk/a?b=c", "Multi word label", "https://sub.example.co.uk/a?b=c"),
    ];

    for (line, label, url) in inputs {
        let buttons = parse_button_lines(line);
        assert_eq!(buttons.len(), 1, "line: {line}");
        assert_eq!(buttons[0].label, label);
        assert_eq!(buttons[0].url, url);
    }
}

#[test]
fn test_multiple_lines_parsed_independently() {
    let input = "Первая - https://example.com/1\n\
                 мусор без разделителя\n\
                 Вторая - https://example.com/2\n\
                 \n\
                 Плохая - not-a-url\n\
                 Третья | https://example.com/3";

    let buttons = parse_button_lines(input);
    assert_eq!(buttons.len(), 3);
    assert_eq!(buttons[0].url, "https://example.com/1");
    assert_eq!(buttons[1].url, "https://example.com/2");
    assert_eq!(buttons[2].url, "https://example.com/3");
}

#[test]
fn test_invalid_lines_yield_zero_buttons() {
    assert!(parse_button_lines("no separator here").is_empty());
    assert!(parse_button_lines("label - ftp://example.com").is_empty());
    assert!(parse_button_lines(" - https://example.com").is_empty());
    assert!(parse_button_lines("").is_empty());
    assert!(parse_button_lines("\n\n\n").is_empty());
}

#[test]
fn test_url_shape_validation() {
    // Valid shapes
    assert!(is_valid_url("https://example.com"));
    assert!(is_valid_url("http://example.com"));
    assert!(is_valid_url("https://sub.domain.example.com/path/to?x=1&y=2"));
    assert!(is_valid_url("http://localhost"));
    assert!(is_valid_url("http://localhost:3000"));
    assert!(is_valid_url("http://127.0.0.1:8080/health"));

    // Invalid shapes
    assert!(!is_valid_url("example.com"));
    assert!(!is_valid_url("//example.com"));
    assert!(!is_valid_url("https://"));
    assert!(!is_valid_url("https://no-tld"));
    assert!(!is_valid_url("https://bad space.com"));
    assert!(!is_valid_url("mailto:user@example.com"));
}
