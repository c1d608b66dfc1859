use crate::host::ExecutionContext;
use crate::{Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Remote read operation selected per item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    /// Search stories by keywords or semantic similarity
    SearchStories,
    /// List the most recent stories of a child
    GetChildStories,
    /// Fetch a child's profile
    GetChildProfile,
    /// Fetch the most recent story of a child
    GetLatestStory,
}

impl Operation {
    pub const ALL: [Self; 4] = [
        Self::SearchStories,
        Self::GetChildStories,
        Self::GetChildProfile,
        Self::GetLatestStory,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SearchStories => "searchStories",
            Self::GetChildStories => "getChildStories",
            Self::GetChildProfile => "getChildProfile",
            Self::GetLatestStory => "getLatestStory",
        }
    }

    /// Whether the `query` parameter applies
    #[must_use]
    pub const fn uses_query(self) -> bool {
        matches!(self, Self::SearchStories)
    }

    /// Whether the `limit` parameter applies
    #[must_use]
    pub const fn uses_limit(self) -> bool {
        matches!(self, Self::SearchStories | Self::GetChildStories)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| Error::UnknownOperation(s.to_string()))
    }
}

/// How much of the remote response is forwarded downstream
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Complete response, unmodified
    Full,
    /// Story text with summary, keywords and id
    #[default]
    Text,
    /// Summary, keywords and metadata without the story text
    Summary,
}

impl OutputFormat {
    pub const ALL: [Self; 3] = [Self::Full, Self::Text, Self::Summary];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Text => "text",
            Self::Summary => "summary",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|format| format.as_str() == s)
            .ok_or_else(|| {
                Error::invalid_input("outputFormat", format!("unknown output format '{s}'"))
            })
    }
}

/// Parameters of one input item, as accepted in an items file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemParameters {
    pub operation: Operation,
    /// Identifier of the child whose stories are read
    pub child_id: i64,
    /// Search term, only used by `searchStories`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Maximum number of stories (1-50), used by `searchStories` and `getChildStories`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default)]
    pub output_format: OutputFormat,
}

/// Parameters resolved before a per-item failure can be captured.
///
/// `operation` and `output_format` stay raw here; an unrecognised value is an
/// item-level concern handled while the item is processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemHeader {
    pub operation: String,
    pub child_id: i64,
    pub output_format: String,
}

impl ItemHeader {
    pub fn resolve(ctx: &dyn ExecutionContext, item_index: usize) -> Result<Self> {
        let operation = string_parameter(ctx, "operation", item_index)?;
        let child_id = integer_parameter(ctx, "childId", item_index)?;
        let output_format = string_parameter(ctx, "outputFormat", item_index)?;
        Ok(Self {
            operation,
            child_id,
            output_format,
        })
    }
}

pub(crate) fn string_parameter(
    ctx: &dyn ExecutionContext,
    name: &str,
    item_index: usize,
) -> Result<String> {
    match ctx.node_parameter(name, item_index)? {
        Value::String(s) => Ok(s),
        Value::Null => Ok(String::new()),
        other => Err(Error::invalid_input(name, format!("expected a string, got {other}"))),
    }
}

/// Resolve a numeric parameter that must hold a whole number.
///
/// Hosts commonly carry numbers as doubles, so `5.0` is accepted as `5`.
pub(crate) fn integer_parameter(
    ctx: &dyn ExecutionContext,
    name: &str,
    item_index: usize,
) -> Result<i64> {
    let value = ctx.node_parameter(name, item_index)?;
    as_integer(&value).ok_or_else(|| {
        Error::invalid_input(name, format!("expected a whole number, got {value}"))
    })
}

#[allow(clippy::cast_possible_truncation)]
fn as_integer(value: &Value) -> Option<i64> {
    if let Some(i) = value.as_i64() {
        return Some(i);
    }
    let f = value.as_f64()?;
    (f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64).then_some(f as i64)
}
