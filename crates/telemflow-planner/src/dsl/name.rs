//! Operator name tokens: ASCII alphanumerics and `-`.

/// Strip leading whitespace and split an operator name off `text`.
/// Returns `None` when `text` does not start with a name.
pub fn parse_name(text: &str) -> Option<(&str, &str)> {
    let text = text.trim_start();
    let end = text
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
        .unwrap_or(text.len());
    if end == 0 {
        return None;
    }
    Some((&text[..end], &text[end..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_names() {
        assert_eq!(parse_name("  parse-json | x"), Some(("parse-json", " | x")));
        assert_eq!(parse_name("where a==1"), Some(("where", " a==1")));
        assert_eq!(parse_name("discard"), Some(("discard", "")));
        assert_eq!(parse_name("| write"), None);
        assert_eq!(parse_name("   "), None);
    }
}
