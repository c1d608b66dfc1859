pub mod cli;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod host;
pub mod node;

pub use client::{HttpClientConfig, RequestHelper, StoryMemoryClient};
pub use config::{Config, ConfigOverrides};
pub use credentials::{CredentialTestResult, StoryMemoryApi, StoryMemoryCredentials};
pub use error::{Error, Result};
pub use host::{ExecutionContext, LocalExecution};
pub use node::{
    ExecutionPolicy, ItemOutcome, ItemParameters, NodeOptions, NodeType, Operation, OutputFormat,
    StoryMemorySearch, StoryRequest,
};
