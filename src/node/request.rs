use super::params::{integer_parameter, string_parameter, Operation};
use crate::host::ExecutionContext;
use crate::{Error, Result};

/// One fully resolved read against the Story Memory API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoryRequest {
    Search {
        child_id: i64,
        limit: u32,
        query: Option<String>,
    },
    ChildStories {
        child_id: i64,
        limit: u32,
    },
    ChildProfile {
        child_id: i64,
    },
    LatestStory {
        child_id: i64,
    },
}

impl StoryRequest {
    /// Resolve the operation-specific parameters of an item.
    ///
    /// `query` and `limit` are only read for the operations that use them.
    pub fn resolve(
        ctx: &dyn ExecutionContext,
        item_index: usize,
        operation: Operation,
        child_id: i64,
    ) -> Result<Self> {
        Ok(match operation {
            Operation::SearchStories => {
                let query = string_parameter(ctx, "query", item_index)?;
                Self::Search {
                    child_id,
                    limit: limit_parameter(ctx, item_index)?,
                    query: (!query.is_empty()).then_some(query),
                }
            }
            Operation::GetChildStories => Self::ChildStories {
                child_id,
                limit: limit_parameter(ctx, item_index)?,
            },
            Operation::GetChildProfile => Self::ChildProfile { child_id },
            Operation::GetLatestStory => Self::LatestStory { child_id },
        })
    }

    /// Build the absolute request URL below `base_url`
    #[must_use]
    pub fn url(&self, base_url: &str) -> String {
        let base_url = base_url.trim_end_matches('/');
        match self {
            Self::Search {
                child_id,
                limit,
                query,
            } => {
                let mut url = format!("{base_url}/stories/search?child_id={child_id}&limit={limit}");
                if let Some(query) = query {
                    url.push_str("&query=");
                    url.push_str(&encode_uri_component(query));
                }
                url
            }
            Self::ChildStories { child_id, limit } => {
                format!("{base_url}/stories/{child_id}?limit={limit}")
            }
            Self::ChildProfile { child_id } => format!("{base_url}/children/{child_id}"),
            Self::LatestStory { child_id } => format!("{base_url}/stories/latest/{child_id}"),
        }
    }
}

fn limit_parameter(ctx: &dyn ExecutionContext, item_index: usize) -> Result<u32> {
    let limit = integer_parameter(ctx, "limit", item_index)?;
    u32::try_from(limit)
        .map_err(|_| Error::invalid_input("limit", format!("{limit} is not a valid limit")))
}

/// Percent-encode a query value the way browsers' `encodeURIComponent` does.
///
/// `urlencoding` escapes everything but `A-Z a-z 0-9 - _ . ~`; the sub-delimiters
/// `! ' ( ) *` are left intact by `encodeURIComponent`, so they are restored.
#[must_use]
pub fn encode_uri_component(value: &str) -> String {
    urlencoding::encode(value)
        .replace("%21", "!")
        .replace("%27", "'")
        .replace("%28", "(")
        .replace("%29", ")")
        .replace("%2A", "*")
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://stories.example/api";

    #[test]
    fn test_search_url_without_query() {
        let request = StoryRequest::Search {
            child_id: 7,
            limit: 5,
            query: None,
        };
        assert_eq!(
            request.url(BASE),
            "https://stories.example/api/stories/search?child_id=7&limit=5"
        );
    }

    #[test]
    fn test_search_url_with_encoded_query() {
        let request = StoryRequest::Search {
            child_id: 2,
            limit: 10,
            query: Some("dragons & friendship".to_string()),
        };
        assert_eq!(
            request.url(BASE),
            "https://stories.example/api/stories/search?child_id=2&limit=10&query=dragons%20%26%20friendship"
        );
    }

    #[test]
    fn test_path_operations() {
        assert_eq!(
            StoryRequest::ChildStories { child_id: 3, limit: 5 }.url(BASE),
            "https://stories.example/api/stories/3?limit=5"
        );
        assert_eq!(
            StoryRequest::ChildProfile { child_id: 3 }.url(BASE),
            "https://stories.example/api/children/3"
        );
        assert_eq!(
            StoryRequest::LatestStory { child_id: 3 }.url(BASE),
            "https://stories.example/api/stories/latest/3"
        );
    }

    #[test]
    fn test_trailing_slash_on_base() {
        assert_eq!(
            StoryRequest::ChildProfile { child_id: 1 }.url("http://localhost:8000/"),
            "http://localhost:8000/children/1"
        );
    }

    #[test]
    fn test_encode_uri_component_matches_browser() {
        assert_eq!(encode_uri_component("it's (very) fun!*"), "it's%20(very)%20fun!*");
        assert_eq!(encode_uri_component("a/b?c=d"), "a%2Fb%3Fc%3Dd");
        assert_eq!(encode_uri_component("drachen ü"), "drachen%20%C3%BC");
    }
}
