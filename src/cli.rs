//! Command-line harness for the Story Memory node.
//!
//! Plays the host's role: loads configuration, resolves the credential once,
//! feeds items into [`StoryMemorySearch`] and prints the resulting execution
//! items as JSON on stdout. Logs go to stderr.

use crate::config::{Config, ConfigOverrides, LogFormat, LoggingConfig};
use crate::credentials::{CredentialStatus, StoryMemoryApi, StoryMemoryCredentials};
use crate::host::LocalExecution;
use crate::node::{ItemParameters, NodeOptions, NodeType, Operation, OutputFormat, StoryMemorySearch};
use crate::{HttpClientConfig, StoryMemoryClient};
use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Query a Story Memory API the way the workflow node does
#[derive(Parser, Debug)]
#[command(name = "story-memory-node")]
#[command(version)]
#[command(about = "Story Memory Search node harness", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Story Memory API key
    #[arg(long, global = true, env = "STORY_MEMORY_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the Story Memory API
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Log filter directive, e.g. `debug`
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(long, global = true, value_parser = LogFormat::from_str)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print a declarative description as JSON
    Describe {
        #[arg(value_enum, default_value = "node")]
        target: DescribeTarget,
    },
    /// Validate the credential against the health endpoint
    TestCredentials,
    /// Execute the node over one or more items
    Run(RunArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DescribeTarget {
    /// The Story Memory Search node type
    Node,
    /// The Story Memory API credential type
    Credentials,
    /// JSON Schema of one entry in an items file
    Parameters,
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// JSON file holding an array of item parameter objects
    #[arg(long)]
    pub items: Option<PathBuf>,

    /// searchStories, getChildStories, getChildProfile or getLatestStory
    #[arg(long, value_parser = Operation::from_str)]
    pub operation: Option<Operation>,

    #[arg(long)]
    pub child_id: Option<i64>,

    #[arg(long)]
    pub query: Option<String>,

    #[arg(long)]
    pub limit: Option<u32>,

    /// full, text or summary
    #[arg(long, value_parser = OutputFormat::from_str)]
    pub output_format: Option<OutputFormat>,

    /// Record failed items in the output instead of aborting
    #[arg(long)]
    pub continue_on_fail: bool,

    /// Fetch identical requests only once per run
    #[arg(long)]
    pub coalesce: bool,
}

impl RunArgs {
    /// Node-level parameters given as flags
    fn parameters(&self) -> Map<String, Value> {
        let mut parameters = Map::new();
        if let Some(operation) = self.operation {
            parameters.insert("operation".into(), json!(operation.as_str()));
        }
        if let Some(child_id) = self.child_id {
            parameters.insert("childId".into(), json!(child_id));
        }
        if let Some(query) = &self.query {
            parameters.insert("query".into(), json!(query));
        }
        if let Some(limit) = self.limit {
            parameters.insert("limit".into(), json!(limit));
        }
        if let Some(format) = self.output_format {
            parameters.insert("outputFormat".into(), json!(format.as_str()));
        }
        parameters
    }
}

/// Install the tracing subscriber. `RUST_LOG` wins over the configured level.
pub fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    // A subscriber may already be installed when embedded in another process
    let _ = match logging.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;

    let (continue_on_fail, coalesce) = match &cli.command {
        Commands::Run(args) => (
            args.continue_on_fail.then_some(true),
            args.coalesce.then_some(true),
        ),
        _ => (None, None),
    };
    config.apply_overrides(&ConfigOverrides {
        api_key: cli.api_key,
        base_url: cli.base_url,
        log_level: cli.log_level,
        log_format: cli.log_format,
        continue_on_fail,
        coalesce_requests: coalesce,
    });
    config.validate()?;
    init_tracing(&config.logging);
    debug!("Effective configuration: {:?}", config);

    match cli.command {
        Commands::Describe { target } => describe(target),
        Commands::TestCredentials => test_credentials(&config).await,
        Commands::Run(args) => run_node(&config, &args).await,
    }
}

fn describe(target: DescribeTarget) -> anyhow::Result<()> {
    let description = match target {
        DescribeTarget::Node => serde_json::to_value(StoryMemorySearch::new().description())?,
        DescribeTarget::Credentials => serde_json::to_value(StoryMemoryApi.description())?,
        DescribeTarget::Parameters => serde_json::to_value(schemars::schema_for!(ItemParameters))?,
    };
    println!("{}", serde_json::to_string_pretty(&description)?);
    Ok(())
}

async fn test_credentials(config: &Config) -> anyhow::Result<()> {
    let credentials = StoryMemoryCredentials::from_config(&config.credentials)?;
    let client = StoryMemoryClient::new(&HttpClientConfig::from(&config.http))?;

    let result = StoryMemoryApi.test(&client, &credentials).await;
    let reason = match &result.status {
        CredentialStatus::Valid => None,
        CredentialStatus::Invalid { reason } => Some(reason.clone()),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "valid": result.is_valid(),
            "reason": reason,
            "durationMs": u64::try_from(result.duration.as_millis()).unwrap_or(u64::MAX),
            "details": result.details,
        }))?
    );

    result.into_result()?;
    Ok(())
}

async fn run_node(config: &Config, args: &RunArgs) -> anyhow::Result<()> {
    let credentials = StoryMemoryCredentials::from_config(&config.credentials)?;
    let client = StoryMemoryClient::new(&HttpClientConfig::from(&config.http))?;

    let items = match &args.items {
        Some(path) => read_items(path)?,
        None => vec![Value::Object(Map::new())],
    };

    let node = StoryMemorySearch::with_options(NodeOptions {
        coalesce_requests: config.execution.coalesce_requests,
    });
    let ctx = LocalExecution::new(node.description(), items, credentials, Arc::new(client))
        .with_parameters(args.parameters())
        .with_continue_on_fail(config.execution.continue_on_fail);

    let outcomes = node.execute(&ctx).await?;
    info!("Produced {} output items", outcomes.len());
    println!("{}", serde_json::to_string_pretty(&outcomes)?);
    Ok(())
}

/// Read an items file: a JSON array of parameter objects. Host-style items
/// wrapped as `{"json": {...}}` are unwrapped.
pub fn read_items(path: &Path) -> anyhow::Result<Vec<Value>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read items file {}", path.display()))?;
    let items: Vec<Value> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array", path.display()))?;

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(mut map) if map.len() == 1 && map.contains_key("json") => {
                Ok(map.remove("json").unwrap_or_default())
            }
            Value::Object(map) => Ok(Value::Object(map)),
            other => bail!("item {index} must be an object, got {other}"),
        })
        .collect()
}
