//! Execution harness seam.
//!
//! A workflow host drives the node through [`ExecutionContext`]. The
//! [`LocalExecution`] implementation backs the command-line harness and the
//! tests: parameters are read from each item, then from node-level values,
//! then from the declared defaults, and are validated against the node
//! description the way a host's parameter layer would.

use crate::client::RequestHelper;
use crate::credentials::{StoryMemoryCredentials, CREDENTIAL_NAME};
use crate::node::description::NodeDescription;
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Services a host provides to a node during one execution
#[async_trait]
pub trait ExecutionContext: Send + Sync {
    /// Ordered input items
    fn input_items(&self) -> &[Value];

    /// Resolved value of parameter `name` for the item at `item_index`
    fn node_parameter(&self, name: &str, item_index: usize) -> Result<Value>;

    /// Resolved credential record of type `name`
    async fn credentials(&self, name: &str) -> Result<Value>;

    /// Whether per-item failures are recorded instead of aborting the run
    fn continue_on_fail(&self) -> bool;

    /// Request helper used for outgoing HTTP calls
    fn helpers(&self) -> &dyn RequestHelper;
}

/// In-process execution context
pub struct LocalExecution {
    description: NodeDescription,
    items: Vec<Value>,
    parameters: Map<String, Value>,
    credentials: StoryMemoryCredentials,
    continue_on_fail: bool,
    helper: Arc<dyn RequestHelper>,
}

impl std::fmt::Debug for LocalExecution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalExecution")
            .field("node", &self.description.name)
            .field("items", &self.items.len())
            .field("parameters", &self.parameters)
            .field("credentials", &self.credentials)
            .field("continue_on_fail", &self.continue_on_fail)
            .finish_non_exhaustive()
    }
}

impl LocalExecution {
    #[must_use]
    pub fn new(
        description: NodeDescription,
        items: Vec<Value>,
        credentials: StoryMemoryCredentials,
        helper: Arc<dyn RequestHelper>,
    ) -> Self {
        Self {
            description,
            items,
            parameters: Map::new(),
            credentials,
            continue_on_fail: false,
            helper,
        }
    }

    /// Node-level parameter values used when an item does not carry its own
    #[must_use]
    pub fn with_parameters(mut self, parameters: Map<String, Value>) -> Self {
        self.parameters = parameters;
        self
    }

    #[must_use]
    pub const fn with_continue_on_fail(mut self, continue_on_fail: bool) -> Self {
        self.continue_on_fail = continue_on_fail;
        self
    }
}

#[async_trait]
impl ExecutionContext for LocalExecution {
    fn input_items(&self) -> &[Value] {
        &self.items
    }

    fn node_parameter(&self, name: &str, item_index: usize) -> Result<Value> {
        let property = self.description.property(name).ok_or_else(|| {
            Error::invalid_input(name, format!("'{}' has no parameter '{name}'", self.description.name))
        })?;
        let item = self.items.get(item_index).ok_or_else(|| {
            Error::invalid_input("itemIndex", format!("no input item at index {item_index}"))
        })?;

        let value = item
            .get(name)
            .or_else(|| self.parameters.get(name))
            .filter(|value| !value.is_null())
            .cloned()
            .unwrap_or_else(|| property.default.clone());

        property.validate(&value)?;
        Ok(value)
    }

    async fn credentials(&self, name: &str) -> Result<Value> {
        if name != CREDENTIAL_NAME {
            return Err(Error::invalid_input(
                "credentials",
                format!("node does not have credentials of type '{name}'"),
            ));
        }
        Ok(self.credentials.to_value())
    }

    fn continue_on_fail(&self) -> bool {
        self.continue_on_fail
    }

    fn helpers(&self) -> &dyn RequestHelper {
        self.helper.as_ref()
    }
}
