use crate::{Error, Result};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::Value;

/// What happens to the run when an item fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPolicy {
    /// Abort at the first failure; no output is returned
    Strict,
    /// Record failures as data and keep going
    ContinueOnFail,
}

impl ExecutionPolicy {
    #[must_use]
    pub const fn from_continue_on_fail(continue_on_fail: bool) -> Self {
        if continue_on_fail {
            Self::ContinueOnFail
        } else {
            Self::Strict
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessRecord {
    pub operation: String,
    pub child_id: i64,
    pub data: Value,
    pub context_summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureRecord {
    pub error: String,
    /// Operation as the item requested it, which may not be a known one
    pub operation: String,
    pub child_id: i64,
}

/// Result of processing one input item
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    Success(SuccessRecord),
    Failure(FailureRecord),
}

impl ItemOutcome {
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    #[must_use]
    pub const fn child_id(&self) -> i64 {
        match self {
            Self::Success(record) => record.child_id,
            Self::Failure(record) => record.child_id,
        }
    }
}

/// Serialized as a host execution item: `{"json": record}` on success and
/// `{"json": record, "error": message}` on failure.
impl Serialize for ItemOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Success(record) => {
                let mut item = serializer.serialize_struct("NodeExecutionData", 1)?;
                item.serialize_field("json", record)?;
                item.end()
            }
            Self::Failure(record) => {
                let mut item = serializer.serialize_struct("NodeExecutionData", 2)?;
                item.serialize_field("json", record)?;
                item.serialize_field("error", &record.error)?;
                item.end()
            }
        }
    }
}

/// Turn per-item outcomes into the node's result under `policy`
pub fn aggregate(outcomes: Vec<ItemOutcome>, policy: ExecutionPolicy) -> Result<Vec<ItemOutcome>> {
    if policy == ExecutionPolicy::Strict {
        if let Some(ItemOutcome::Failure(failure)) = outcomes.iter().find(|o| o.is_failure()) {
            return Err(Error::NodeOperation(failure.error.clone()));
        }
    }
    Ok(outcomes)
}
