//! Argument tokenizing shared by the built-in plugins.
//!
//! Built-in operators own the text up to the next `|` that is not inside a
//! double-quoted string. Quoted strings use `\"` and `\\` as escapes.

use crate::traits::OpError;

/// Split the arguments of the current operator off the remaining pipeline
/// text. Returns the trimmed arguments and the text after the separator.
pub fn split_args(text: &str) -> (&str, &str) {
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '|' if !in_quotes => return (text[..i].trim(), &text[i + 1..]),
            _ => {}
        }
    }
    (text.trim(), "")
}

/// Split a list on commas and whitespace outside quotes. Empty items vanish.
pub fn split_list(args: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut start = None;
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in args.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        let separator = !in_quotes && (c == ',' || c.is_whitespace());
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            _ => {}
        }
        if separator {
            if let Some(s) = start.take() {
                items.push(&args[s..i]);
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        items.push(&args[s..]);
    }
    items
}

/// Strip surrounding double quotes and resolve escapes. Returns the value and
/// whether it was quoted.
pub fn unquote(token: &str) -> Result<(String, bool), OpError> {
    let Some(inner) = token.strip_prefix('"') else {
        return Ok((token.to_string(), false));
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) => out.push(escaped),
                None => break,
            },
            '"' => {
                if chars.next().is_some() {
                    return Err(OpError::Parse(format!(
                        "unexpected text after closing quote in {token}"
                    )));
                }
                return Ok((out, true));
            }
            other => out.push(other),
        }
    }
    Err(OpError::Parse(format!("unterminated string {token}")))
}

/// Render a value so that `unquote(split_list(..))` gives it back.
pub fn quote(value: &str, force: bool) -> String {
    let needs = force
        || value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '|' | ',' | '\\'));
    if !needs {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

pub fn expect_no_args(operator: &str, args: &str) -> Result<(), OpError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(OpError::Parse(format!(
            "operator '{operator}' takes no arguments, got '{args}'"
        )))
    }
}

/// Exactly one (possibly quoted) argument, e.g. a path.
pub fn single_arg(operator: &str, args: &str) -> Result<String, OpError> {
    match split_list(args).as_slice() {
        [one] => Ok(unquote(one)?.0),
        [] => Err(OpError::Parse(format!(
            "operator '{operator}' expects one argument"
        ))),
        many => Err(OpError::Parse(format!(
            "operator '{operator}' expects one argument, got {}",
            many.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_args_stops_at_unquoted_pipe() {
        assert_eq!(split_args(" a == 1 | write x"), ("a == 1", " write x"));
        assert_eq!(
            split_args(r#"msg == "a | b" | pass"#),
            (r#"msg == "a | b""#, " pass")
        );
        assert_eq!(split_args("  tail  "), ("tail", ""));
    }

    #[test]
    fn split_list_respects_quotes() {
        assert_eq!(split_list("a, b  c,,d"), vec!["a", "b", "c", "d"]);
        assert_eq!(
            split_list(r#""x, y" z"#),
            vec![r#""x, y""#, "z"]
        );
    }

    #[test]
    fn quote_roundtrips_through_unquote() {
        for value in ["plain", "with space", r#"q"uote"#, "", r"back\slash"] {
            let quoted = quote(value, false);
            assert_eq!(unquote(&quoted).unwrap().0, value);
        }
        assert_eq!(quote("plain", false), "plain");
        assert_eq!(quote("plain", true), "\"plain\"");
    }

    #[test]
    fn unquote_rejects_unterminated() {
        assert!(unquote("\"open").is_err());
        assert!(unquote("\"a\"b").is_err());
    }

    #[test]
    fn single_arg_counts_tokens() {
        assert_eq!(single_arg("from", "\"/tmp/a b.json\"").unwrap(), "/tmp/a b.json");
        assert!(single_arg("from", "").is_err());
        assert!(single_arg("from", "a b").is_err());
    }
}
