//! Declarative node and property descriptions.
//!
//! These types mirror the JSON shape a workflow host expects when it loads a
//! node type: display metadata plus the list of user-facing properties with
//! defaults, allowed options, bounds and visibility rules.

use super::params::{Operation, OutputFormat};
use crate::credentials::CREDENTIAL_NAME;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Kind of value a property holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyType {
    String,
    Number,
    Options,
}

/// One selectable value of an `options` property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyOption {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

/// Extra constraints on a property value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
}

/// Visibility rules: the property is shown only when every named parameter
/// holds one of the listed values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayOptions {
    pub show: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeProperty {
    pub display_name: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PropertyType,
    pub default: Value,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub no_data_expression: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<PropertyOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_options: Option<TypeOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_options: Option<DisplayOptions>,
}

impl NodeProperty {
    fn new(display_name: &str, name: &str, kind: PropertyType, default: Value) -> Self {
        Self {
            display_name: display_name.to_string(),
            name: name.to_string(),
            kind,
            default,
            required: false,
            no_data_expression: false,
            description: None,
            placeholder: None,
            options: Vec::new(),
            type_options: None,
            display_options: None,
        }
    }

    #[must_use]
    pub fn string(display_name: &str, name: &str, default: &str) -> Self {
        Self::new(display_name, name, PropertyType::String, json!(default))
    }

    #[must_use]
    pub fn number(display_name: &str, name: &str, default: i64) -> Self {
        Self::new(display_name, name, PropertyType::Number, json!(default))
    }

    #[must_use]
    pub fn options(display_name: &str, name: &str, default: &str, options: Vec<PropertyOption>) -> Self {
        let mut property = Self::new(display_name, name, PropertyType::Options, json!(default));
        property.options = options;
        property
    }

    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn describe(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    #[must_use]
    pub fn placeholder(mut self, placeholder: &str) -> Self {
        self.placeholder = Some(placeholder.to_string());
        self
    }

    #[must_use]
    pub fn password(mut self) -> Self {
        self.type_options.get_or_insert_with(TypeOptions::default).password = Some(true);
        self
    }

    #[must_use]
    pub fn bounds(mut self, min: f64, max: f64) -> Self {
        let type_options = self.type_options.get_or_insert_with(TypeOptions::default);
        type_options.min_value = Some(min);
        type_options.max_value = Some(max);
        self
    }

    /// Show this property only when `parameter` holds one of `values`
    #[must_use]
    pub fn show_when(mut self, parameter: &str, values: &[&str]) -> Self {
        self.display_options
            .get_or_insert_with(DisplayOptions::default)
            .show
            .insert(
                parameter.to_string(),
                values.iter().map(ToString::to_string).collect(),
            );
        self
    }

    /// Check a resolved value against this property's declared type and constraints
    pub fn validate(&self, value: &Value) -> Result<()> {
        match self.kind {
            PropertyType::String => {
                if !value.is_string() {
                    return Err(self.type_error("a string", value));
                }
            }
            PropertyType::Options => {
                let Some(selected) = value.as_str() else {
                    return Err(self.type_error("a string option", value));
                };
                if !self.options.iter().any(|o| o.value == selected) {
                    let allowed: Vec<&str> = self.options.iter().map(|o| o.value.as_str()).collect();
                    return Err(Error::invalid_input(
                        &self.name,
                        format!("'{selected}' is not one of {}", allowed.join(", ")),
                    ));
                }
            }
            PropertyType::Number => {
                let Some(number) = value.as_f64() else {
                    return Err(self.type_error("a number", value));
                };
                if let Some(type_options) = &self.type_options {
                    if let Some(min) = type_options.min_value {
                        if number < min {
                            return Err(Error::invalid_input(
                                &self.name,
                                format!("{number} is below the minimum of {min}"),
                            ));
                        }
                    }
                    if let Some(max) = type_options.max_value {
                        if number > max {
                            return Err(Error::invalid_input(
                                &self.name,
                                format!("{number} is above the maximum of {max}"),
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn type_error(&self, expected: &str, value: &Value) -> Error {
        Error::invalid_input(&self.name, format!("expected {expected}, got {value}"))
    }
}

/// Credential requirement declared by a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeCredential {
    pub name: String,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefaults {
    pub name: String,
}

/// Full declarative description of a node type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDescription {
    pub display_name: String,
    pub name: String,
    pub icon: String,
    pub group: Vec<String>,
    pub version: u32,
    pub subtitle: String,
    pub description: String,
    pub defaults: NodeDefaults,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub credentials: Vec<NodeCredential>,
    pub properties: Vec<NodeProperty>,
}

impl NodeDescription {
    /// Look up a property by its parameter name
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&NodeProperty> {
        self.properties.iter().find(|p| p.name == name)
    }
}

fn operation_option(operation: Operation) -> PropertyOption {
    let (name, description, action) = match operation {
        Operation::SearchStories => (
            "Search Stories",
            "Search stories by keywords or semantic similarity",
            "Search stories by keywords or semantic similarity",
        ),
        Operation::GetChildStories => (
            "Get Child Stories",
            "Get all stories for a specific child",
            "Get all stories for a child",
        ),
        Operation::GetChildProfile => (
            "Get Child Profile",
            "Get child profile information",
            "Get child profile information",
        ),
        Operation::GetLatestStory => (
            "Get Latest Story",
            "Get the most recent story for a child",
            "Get the most recent story for a child",
        ),
    };
    PropertyOption {
        name: name.to_string(),
        value: operation.as_str().to_string(),
        description: Some(description.to_string()),
        action: Some(action.to_string()),
    }
}

fn output_format_option(format: OutputFormat) -> PropertyOption {
    let (name, description) = match format {
        OutputFormat::Full => (
            "Full Story Objects",
            "Return complete story data including embeddings",
        ),
        OutputFormat::Text => ("Text Only", "Return only story text for use as context"),
        OutputFormat::Summary => ("Summary", "Return story summaries and keywords"),
    };
    PropertyOption {
        name: name.to_string(),
        value: format.as_str().to_string(),
        description: Some(description.to_string()),
        action: None,
    }
}

fn operations_using(predicate: fn(Operation) -> bool) -> Vec<&'static str> {
    Operation::ALL
        .into_iter()
        .filter(|op| predicate(*op))
        .map(Operation::as_str)
        .collect()
}

/// Description of the Story Memory Search node
#[must_use]
pub fn story_memory_search() -> NodeDescription {
    let mut operation = NodeProperty::options(
        "Operation",
        "operation",
        Operation::SearchStories.as_str(),
        Operation::ALL.into_iter().map(operation_option).collect(),
    );
    operation.no_data_expression = true;

    let properties = vec![
        operation,
        NodeProperty::number("Child ID", "childId", 1)
            .required()
            .describe("The ID of the child"),
        NodeProperty::string("Search Query", "query", "")
            .show_when("operation", &operations_using(Operation::uses_query))
            .describe("Search term for finding relevant stories")
            .placeholder("adventure, friendship, dragons..."),
        NodeProperty::number("Limit", "limit", 5)
            .show_when("operation", &operations_using(Operation::uses_limit))
            .describe("Maximum number of stories to return")
            .bounds(1.0, 50.0),
        NodeProperty::options(
            "Output Format",
            "outputFormat",
            OutputFormat::default().as_str(),
            OutputFormat::ALL.into_iter().map(output_format_option).collect(),
        )
        .describe("How to format the output for downstream nodes"),
    ];

    NodeDescription {
        display_name: "Story Memory Search".to_string(),
        name: "storyMemorySearch".to_string(),
        icon: "fa:book-open".to_string(),
        group: vec!["input".to_string()],
        version: 1,
        subtitle: "={{$parameter[\"operation\"]}}".to_string(),
        description: "Search and retrieve stories from Story Memory API for context in other prompts"
            .to_string(),
        defaults: NodeDefaults {
            name: "Story Memory Search".to_string(),
        },
        inputs: vec!["main".to_string()],
        outputs: vec!["main".to_string()],
        credentials: vec![NodeCredential {
            name: CREDENTIAL_NAME.to_string(),
            required: true,
        }],
        properties,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_bounds() {
        let description = story_memory_search();
        let limit = description.property("limit").unwrap();
        assert!(limit.validate(&json!(1)).is_ok());
        assert!(limit.validate(&json!(50)).is_ok());
        assert!(limit.validate(&json!(0)).is_err());
        assert!(limit.validate(&json!(51)).is_err());
        assert!(limit.validate(&json!("5")).is_err());
    }

    #[test]
    fn test_visibility_rules() {
        let description = story_memory_search();
        let query = description.property("query").unwrap();
        let shown = &query.display_options.as_ref().unwrap().show["operation"];
        assert_eq!(shown, &vec!["searchStories".to_string()]);

        let limit = description.property("limit").unwrap();
        let shown = &limit.display_options.as_ref().unwrap().show["operation"];
        assert_eq!(shown, &vec!["searchStories".to_string(), "getChildStories".to_string()]);
    }

    #[test]
    fn test_serializes_in_camel_case() {
        let value = serde_json::to_value(story_memory_search()).unwrap();
        assert_eq!(value["name"], "storyMemorySearch");
        assert_eq!(value["displayName"], "Story Memory Search");
        assert_eq!(value["properties"][0]["noDataExpression"], true);
        assert_eq!(value["properties"][3]["typeOptions"]["maxValue"], 50.0);
        assert_eq!(value["properties"][4]["default"], "text");
        assert_eq!(value["credentials"][0]["name"], "storyMemoryApi");
    }

    #[test]
    fn test_options_reject_unknown_value() {
        let description = story_memory_search();
        let format = description.property("outputFormat").unwrap();
        assert!(format.validate(&json!("summary")).is_ok());
        assert!(format.validate(&json!("markdown")).is_err());
    }
}
