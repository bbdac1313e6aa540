/// Escapes a value for embedding inside a JSON string literal.
///
/// Covers backslash, double quote, forward slash and the control characters
/// backspace, form feed, newline, carriage return and tab. Backslash is handled
/// first so the escapes produced for the other characters are not doubled.
pub fn escape_data(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '/' => out.push_str("\\/"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000C}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

/// Inverse of [`escape_data`].
///
/// A backslash followed by anything outside the escape set is kept as-is.
pub fn unescape_data(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('/') => out.push('/'),
            Some('b') => out.push('\u{0008}'),
            Some('f') => out.push('\u{000C}'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("\\", "\\\\")]
    #[case("\"", "\\\"")]
    #[case("/", "\\/")]
    #[case("\u{0008}", "\\b")]
    #[case("\u{000C}", "\\f")]
    #[case("\n", "\\n")]
    #[case("\r", "\\r")]
    #[case("\t", "\\t")]
    fn test_escape_special_character(#[case] raw: &str, #[case] escaped: &str) {
        assert_eq!(escape_data(raw), escaped);
        assert_eq!(unescape_data(escaped), raw);
    }

    #[test]
    fn test_plain_text_is_untouched() {
        assert_eq!(escape_data("Jane Doe"), "Jane Doe");
        assert_eq!(unescape_data("Jane Doe"), "Jane Doe");
    }

    #[test]
    fn test_backslash_is_not_double_escaped() {
        assert_eq!(escape_data("a\\n"), "a\\\\n");
        assert_eq!(unescape_data("a\\\\n"), "a\\n");
    }

    #[test]
    fn test_mixed_content() {
        let raw = "<a href=\"http://a\">\n\tLink</a>";
        let escaped = escape_data(raw);
        assert_eq!(escaped, "<a href=\\\"http:\\/\\/a\\\">\\n\\tLink<\\/a>");
        assert_eq!(unescape_data(&escaped), raw);
    }

    #[test]
    fn test_escape_matches_json_string_body() {
        let raw = "quote \" slash / tab \t";
        let json = serde_json::to_string(&serde_json::Value::String(raw.to_string())).unwrap();
        let parsed: String = serde_json::from_str(&format!("\"{}\"", escape_data(raw))).unwrap();
        assert_eq!(parsed, raw);
        assert_eq!(serde_json::from_str::<String>(&json).unwrap(), raw);
    }

    #[test]
    fn test_unknown_escape_is_preserved() {
        assert_eq!(unescape_data("\\x"), "\\x");
        assert_eq!(unescape_data("trailing\\"), "trailing\\");
    }
}
