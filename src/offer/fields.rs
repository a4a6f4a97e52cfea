//! Lenient field readers shared by the stage record parsers

use serde_json::{Map, Value};

/// First non-empty string among `keys`, trimmed.
pub(crate) fn str_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| map.get(*k))
        .find_map(value_as_text)
}

/// A scalar JSON value rendered as trimmed, non-empty text.
pub(crate) fn value_as_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// A list of strings from an array, or from a comma/newline-delimited string.
pub(crate) fn list_field(map: &Map<String, Value>, key: &str) -> Vec<String> {
    match map.get(key) {
        Some(Value::Array(items)) => items.iter().filter_map(value_as_text).collect(),
        Some(Value::String(text)) => split_list(text),
        _ => Vec::new(),
    }
}

/// Split free text into list items: newlines first, then commas.
///
/// Leading bullet markers are stripped from each item.
pub(crate) fn split_list(text: &str) -> Vec<String> {
    let parts: Vec<&str> = if text.contains('\n') {
        text.split('\n').collect()
    } else if text.contains(',') {
        text.split(',').collect()
    } else {
        vec![text]
    };

    parts
        .into_iter()
        .map(|p| p.trim().trim_start_matches(&['•', '-', '*'][..]).trim())
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// A number from a JSON number or a price-like string ("$1,500", "997 USD").
pub(crate) fn number_field(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_amount(s),
        _ => None,
    }
}

/// Parse the first number in a price-like string, ignoring `$` and thousands separators.
pub(crate) fn parse_amount(text: &str) -> Option<f64> {
    let cleaned: String = text.replace(',', "");
    let start = cleaned.find(|c: char| c.is_ascii_digit())?;
    let digits: String = cleaned[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.trim_end_matches('.').parse::<f64>().ok()
}

/// Truncate to at most `max` characters on a char boundary, marking the cut with "...".
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}
