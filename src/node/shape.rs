//! Output reshaping of Story Memory API responses.
//!
//! List responses are narrowed element by element for the `text` and
//! `summary` formats. A single object is only narrowed for `text`, and only
//! when it carries a truthy `story_text`; every other single value is
//! forwarded as-is, `summary` included.

use super::params::OutputFormat;
use serde_json::{Map, Value};

/// Fields kept by the `text` format
pub const TEXT_FIELDS: [&str; 4] = ["story_text", "summary", "keywords", "id"];

/// Fields kept by the `summary` format
pub const SUMMARY_FIELDS: [&str; 5] = ["id", "summary", "keywords", "difficulty", "created_at"];

/// Reshape a parsed response body for the requested output format
#[must_use]
pub fn reshape(data: Value, format: OutputFormat) -> Value {
    let fields: &[&str] = match format {
        OutputFormat::Full => return data,
        OutputFormat::Text => &TEXT_FIELDS,
        OutputFormat::Summary => &SUMMARY_FIELDS,
    };

    match data {
        Value::Array(stories) => {
            Value::Array(stories.into_iter().map(|story| project(story, fields)).collect())
        }
        Value::Object(story)
            if format == OutputFormat::Text && is_truthy(story.get("story_text")) =>
        {
            project(Value::Object(story), fields)
        }
        other => other,
    }
}

/// Keep only `fields` of an object. Fields missing upstream stay missing.
fn project(story: Value, fields: &[&str]) -> Value {
    match story {
        Value::Object(mut source) => {
            let mut narrowed = Map::with_capacity(fields.len());
            for field in fields {
                if let Some(value) = source.remove(*field) {
                    narrowed.insert((*field).to_string(), value);
                }
            }
            Value::Object(narrowed)
        }
        other => other,
    }
}

/// Loose truthiness as used by JSON-document hosts
fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}

/// Human-readable summary attached to every successful record
#[must_use]
pub fn context_summary(data: &Value, child_id: i64) -> String {
    match data {
        Value::Array(stories) => format!("Found {} stories for child {child_id}", stories.len()),
        _ => format!("Retrieved data for child {child_id}"),
    }
}
