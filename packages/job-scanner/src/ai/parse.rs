//! Defensive parsing of JSON arrays out of free-form completions.

use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;

lazy_static! {
    static ref FENCED_BLOCK: Regex = Regex::new(r"```(?:json)?\s*([\s\S]*?)```").unwrap();
}

/// What a completion yielded when read as a JSON array.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayReply<T> {
    Items(Vec<T>),
    /// No array in the text at all.
    Missing,
    /// An array-looking span that did not deserialize.
    Malformed(String),
}

impl<T> ArrayReply<T> {
    /// Items, or an empty list for anything unusable.
    pub fn into_items(self) -> Vec<T> {
        match self {
            ArrayReply::Items(items) => items,
            ArrayReply::Missing | ArrayReply::Malformed(_) => Vec::new(),
        }
    }
}

/// Locate the JSON array in a completion.
///
/// A fenced code block wins. Otherwise the first balanced top-level
/// `[...]` is taken and trailing prose is ignored. Either way the span is
/// cut after its last `]`.
pub fn locate_json_array(raw: &str) -> Option<&str> {
    let span = match FENCED_BLOCK.captures(raw).and_then(|c| c.get(1)) {
        Some(block) => block.as_str().trim(),
        None => balanced_array(raw)?,
    };

    match span.rfind(']') {
        Some(end) => Some(&span[..=end]),
        None => Some(span),
    }
}

/// Read a completion as a JSON array of `T`.
pub fn parse_json_array<T: DeserializeOwned>(raw: &str) -> ArrayReply<T> {
    match locate_json_array(raw) {
        None => ArrayReply::Missing,
        Some(span) => match serde_json::from_str::<Vec<T>>(span) {
            Ok(items) => ArrayReply::Items(items),
            Err(e) => ArrayReply::Malformed(e.to_string()),
        },
    }
}

/// First balanced `[...]` starting at the first `[`. Brackets inside JSON
/// strings are not counted.
fn balanced_array(raw: &str) -> Option<&str> {
    let start = raw.find('[')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in raw[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(raw[start..start + offset + 1].trim());
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_block_is_preferred() {
        let raw = "Here you go:\n```json\n[\"a\", \"b\"]\n```\nAnd also [\"c\"]";
        assert_eq!(locate_json_array(raw), Some("[\"a\", \"b\"]"));
    }

    #[test]
    fn bare_array_ignores_trailing_prose() {
        let raw = "Sure! [{\"title\": \"Engineer\"}] Let me know if you need more.";
        assert_eq!(locate_json_array(raw), Some("[{\"title\": \"Engineer\"}]"));
    }

    #[test]
    fn brackets_inside_strings_do_not_close_the_array() {
        let raw = r#"[{"title": "Engineer [Remote]"}, {"title": "QA ]"}] trailing"#;
        let parsed: Vec<serde_json::Value> = parse_json_array(raw).into_items();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0]["title"], "Engineer [Remote]");
    }

    #[test]
    fn nested_arrays_are_balanced() {
        let raw = "[[1, 2], [3]] done";
        assert_eq!(locate_json_array(raw), Some("[[1, 2], [3]]"));
    }

    #[test]
    fn prose_without_array_is_missing() {
        let reply: ArrayReply<String> = parse_json_array("There are no job titles here.");
        assert_eq!(reply, ArrayReply::Missing);
    }

    #[test]
    fn unbalanced_array_is_missing() {
        let reply: ArrayReply<String> = parse_json_array("[\"a\", \"b\"");
        assert_eq!(reply, ArrayReply::Missing);
    }

    #[test]
    fn wrong_shape_is_malformed() {
        let reply: ArrayReply<String> = parse_json_array("[1, 2, 3]");
        assert!(matches!(reply, ArrayReply::Malformed(_)));
    }
}
