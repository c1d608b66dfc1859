//! Story Memory node harness
//!
//! Runs the Story Memory Search node and its credential check outside a
//! workflow host.
//!
//! ```bash
//! # Validate the configured credential
//! story-memory-node --api-key "$KEY" test-credentials
//!
//! # Search a child's stories
//! story-memory-node run --operation searchStories --child-id 7 --query dragons
//!
//! # Print the node description
//! story-memory-node describe node
//! ```

use clap::Parser;
use story_memory_node::cli::{run, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
