//! CLI argument definitions using clap derive macros.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

/// Default total for `batch`, one term at a time.
pub const DEFAULT_BATCH_TOTAL: u8 = 50;

/// Image search proxy with per-query result caching.
///
/// Without a subcommand, runs the HTTP server.
#[derive(Parser, Debug)]
#[command(name = "imgsearch")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Base directory for downloaded images
    #[arg(short = 'o', long, global = true)]
    pub save_dir: Option<PathBuf>,

    /// Keyword list file (default: ./keywords.txt, then ../keywords.txt)
    #[arg(short = 'k', long, global = true)]
    pub keywords_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API
    Serve {
        /// Address to listen on (default: 0.0.0.0:5000)
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },
    /// Run one search and print the results as JSON
    Search {
        /// Search query
        query: String,

        /// Number of results (clamped to 1-100)
        #[arg(short = 'n', long, default_value_t = 10)]
        total: u8,

        #[command(flatten)]
        credentials: CredentialArgs,
    },
    /// Save one image under the query's folder
    Download {
        /// Result id used as the file name
        #[arg(long)]
        id: u64,

        /// Image URL
        #[arg(long)]
        url: String,

        /// Query the image belongs to (folder name source)
        #[arg(long)]
        query: String,
    },
    /// Print the keyword list
    Keywords,
    /// Search every keyword in turn, warming the cache
    Batch {
        /// Results per keyword (clamped to 1-100)
        #[arg(short = 'n', long, default_value_t = DEFAULT_BATCH_TOTAL)]
        total: u8,

        #[command(flatten)]
        credentials: CredentialArgs,
    },
}

/// Search API credentials; falls back to environment variables.
#[derive(ClapArgs, Clone)]
pub struct CredentialArgs {
    /// Search API key
    #[arg(long, env = "IMGSEARCH_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Search engine id
    #[arg(long, env = "IMGSEARCH_CX")]
    pub cx: Option<String>,
}

impl std::fmt::Debug for CredentialArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialArgs")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("cx", &self.cx)
            .finish()
    }
}
