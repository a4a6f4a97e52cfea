//! Result extraction: raw generation output to a structured record
//!
//! Generation output is not guaranteed to be pure JSON. Models wrap objects
//! in code fences or surround them with commentary, so extraction is lenient:
//!
//! 1. A structured output is returned unchanged
//! 2. Text is trimmed and stripped of a surrounding fenced-block delimiter
//! 3. The span from the first `{` to the last `}` is parsed as an object
//!
//! Anything else is an explicit `Extraction::Failed`, never an error.

use crate::generation::GenerationOutput;
use serde_json::{Map, Value};
use std::fmt;

/// Why an output could not be read as a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionFailure {
    /// No `{ ... }` span in the text.
    NoObject,
    /// A span was found but did not parse as a JSON object.
    Malformed(String),
    /// The value was neither an object nor text.
    Unsupported,
}

impl fmt::Display for ExtractionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionFailure::NoObject => f.write_str("no JSON object in output"),
            ExtractionFailure::Malformed(e) => write!(f, "malformed JSON object: {}", e),
            ExtractionFailure::Unsupported => f.write_str("output is neither an object nor text"),
        }
    }
}

/// Outcome of extracting one generation output.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Record(Map<String, Value>),
    Failed(ExtractionFailure),
}

impl Extraction {
    pub fn is_failed(&self) -> bool {
        matches!(self, Extraction::Failed(_))
    }

    pub fn record(self) -> Option<Map<String, Value>> {
        match self {
            Extraction::Record(map) => Some(map),
            Extraction::Failed(_) => None,
        }
    }

    /// The extraction as a JSON value; failure maps to `null`, which
    /// re-extracts to the same failure.
    pub fn into_value(self) -> Value {
        match self {
            Extraction::Record(map) => Value::Object(map),
            Extraction::Failed(_) => Value::Null,
        }
    }
}

/// Extract a record from a generation port's output.
pub fn extract(output: &GenerationOutput) -> Extraction {
    match output {
        GenerationOutput::Structured(map) => Extraction::Record(map.clone()),
        GenerationOutput::Text(text) => extract_text(text),
    }
}

/// Extract from an arbitrary JSON value.
pub fn extract_value(value: &Value) -> Extraction {
    match value {
        Value::Object(map) => Extraction::Record(map.clone()),
        Value::String(text) => extract_text(text),
        _ => Extraction::Failed(ExtractionFailure::Unsupported),
    }
}

fn extract_text(text: &str) -> Extraction {
    let body = strip_fences(text.trim());

    let (Some(start), Some(end)) = (body.find('{'), body.rfind('}')) else {
        return Extraction::Failed(ExtractionFailure::NoObject);
    };
    if start > end {
        return Extraction::Failed(ExtractionFailure::NoObject);
    }

    match serde_json::from_str::<Value>(&body[start..=end]) {
        Ok(Value::Object(map)) => Extraction::Record(map),
        Ok(_) => Extraction::Failed(ExtractionFailure::Malformed("not an object".to_string())),
        Err(e) => Extraction::Failed(ExtractionFailure::Malformed(e.to_string())),
    }
}

/// Remove a leading "```lang" line and a trailing "```".
fn strip_fences(text: &str) -> &str {
    let mut body = text;
    if let Some(rest) = body.strip_prefix("```") {
        // drop the optional language tag up to the end of the line
        body = match rest.find('\n') {
            Some(nl) => &rest[nl + 1..],
            None => rest,
        };
    }
    if let Some(rest) = body.trim_end().strip_suffix("```") {
        body = rest;
    }
    body.trim()
}
