//! # Story Memory Search node
//!
//! For every input item the node resolves its parameters, issues one GET
//! against the Story Memory API, reshapes the JSON body and records either a
//! success or a failure. An unknown operation is an item failure like any
//! other; an unknown output format forwards the body unchanged. Items are
//! processed strictly in order; the request for item `i + 1` is only issued
//! once item `i` has been recorded.
//!
//! ```text
//! items ──► ItemHeader::resolve ──► StoryRequest::resolve ──► RequestHelper::get_json
//!                                                                    │
//!   Vec<ItemOutcome> ◄── aggregate(policy) ◄── ItemOutcome ◄── reshape
//! ```

pub mod description;
pub mod execute;
pub mod params;
pub mod request;
pub mod shape;

pub use description::NodeDescription;
pub use execute::{aggregate, ExecutionPolicy, FailureRecord, ItemOutcome, SuccessRecord};
pub use params::{ItemParameters, Operation, OutputFormat};
pub use request::StoryRequest;

use crate::credentials::{StoryMemoryCredentials, CREDENTIAL_NAME};
use crate::host::ExecutionContext;
use crate::{Error, Result};
use async_trait::async_trait;
use params::ItemHeader;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// A node type a workflow host can load and execute
#[async_trait]
pub trait NodeType: Send + Sync {
    /// Declarative description of the node and its parameters
    fn description(&self) -> NodeDescription;

    /// Process every input item, returning one outcome per item
    async fn execute(&self, ctx: &dyn ExecutionContext) -> Result<Vec<ItemOutcome>>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeOptions {
    /// Reuse one response for items that resolve to the same request URL
    pub coalesce_requests: bool,
}

/// Responses already fetched in the current execution, keyed by URL
type ResponseCache = HashMap<String, std::result::Result<Value, Arc<Error>>>;

#[derive(Debug, Clone, Default)]
pub struct StoryMemorySearch {
    options: NodeOptions,
}

impl StoryMemorySearch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_options(options: NodeOptions) -> Self {
        Self { options }
    }

    /// Process a single item: resolve its request, fetch and reshape.
    async fn process_item(
        &self,
        ctx: &dyn ExecutionContext,
        item_index: usize,
        header: ItemHeader,
        credentials: &StoryMemoryCredentials,
        cache: &mut ResponseCache,
    ) -> ItemOutcome {
        match self.fetch(ctx, item_index, &header, credentials, cache).await {
            Ok(body) => {
                let data = match header.output_format.parse::<OutputFormat>() {
                    Ok(format) => shape::reshape(body, format),
                    Err(_) => {
                        debug!(
                            item_index,
                            output_format = %header.output_format,
                            "Unrecognised output format, forwarding the response unchanged"
                        );
                        body
                    }
                };
                ItemOutcome::Success(SuccessRecord {
                    context_summary: shape::context_summary(&data, header.child_id),
                    operation: header.operation,
                    child_id: header.child_id,
                    data,
                })
            }
            Err(e) => {
                warn!(
                    item_index,
                    operation = %header.operation,
                    child_id = header.child_id,
                    client_error = e.is_client_error(),
                    "Item failed: {}",
                    e
                );
                ItemOutcome::Failure(FailureRecord {
                    error: e.to_string(),
                    operation: header.operation,
                    child_id: header.child_id,
                })
            }
        }
    }

    async fn fetch(
        &self,
        ctx: &dyn ExecutionContext,
        item_index: usize,
        header: &ItemHeader,
        credentials: &StoryMemoryCredentials,
        cache: &mut ResponseCache,
    ) -> std::result::Result<Value, Arc<Error>> {
        let operation: Operation = header.operation.parse()?;
        let request = StoryRequest::resolve(ctx, item_index, operation, header.child_id)?;
        let url = request.url(credentials.base_url());
        debug!(item_index, %url, "Resolved Story Memory request");

        if self.options.coalesce_requests {
            if let Some(cached) = cache.get(&url) {
                debug!(item_index, %url, "Reusing response from an earlier item");
                return cached.clone();
            }
        }

        let response = ctx
            .helpers()
            .get_json(&url, credentials)
            .await
            .map_err(Arc::new);

        if self.options.coalesce_requests {
            cache.insert(url, response.clone());
        }
        response
    }
}

#[async_trait]
impl NodeType for StoryMemorySearch {
    fn description(&self) -> NodeDescription {
        description::story_memory_search()
    }

    #[instrument(
        skip_all,
        fields(execution_id = %Uuid::new_v4(), items = ctx.input_items().len())
    )]
    async fn execute(&self, ctx: &dyn ExecutionContext) -> Result<Vec<ItemOutcome>> {
        let credentials =
            StoryMemoryCredentials::from_value(ctx.credentials(CREDENTIAL_NAME).await?)?;
        let policy = ExecutionPolicy::from_continue_on_fail(ctx.continue_on_fail());
        let item_count = ctx.input_items().len();

        info!(
            "Executing Story Memory Search over {} items ({:?}, coalescing {})",
            item_count, policy, self.options.coalesce_requests
        );

        let mut cache = ResponseCache::new();
        let mut outcomes = Vec::with_capacity(item_count);

        for item_index in 0..item_count {
            let header = ItemHeader::resolve(ctx, item_index)?;
            let outcome = self
                .process_item(ctx, item_index, header, &credentials, &mut cache)
                .await;

            let abort = policy == ExecutionPolicy::Strict && outcome.is_failure();
            outcomes.push(outcome);
            if abort {
                break;
            }
        }

        match aggregate(outcomes, policy) {
            Ok(outcomes) => {
                let failed = outcomes.iter().filter(|o| o.is_failure()).count();
                info!(
                    "Story Memory Search finished: {} records, {} failed",
                    outcomes.len(),
                    failed
                );
                Ok(outcomes)
            }
            Err(e) => {
                error!("Story Memory Search aborted: {}", e);
                Err(e)
            }
        }
    }
}
