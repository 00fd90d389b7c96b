//! CLI entry point for the imgsearch proxy.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use imgsearch_core::keywords::parse_keyword_lines;
use imgsearch_core::{DownloadRequest, ImageSearchService, SearchParams, ServiceConfig, server};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

mod app_config;
mod cli;

use app_config::{FileConfig, load_default_file_config};
use cli::{Args, Command, CredentialArgs};

/// Default listen address for `serve`.
const DEFAULT_BIND: SocketAddr = SocketAddr::new(std::net::IpAddr::V4(Ipv4Addr::UNSPECIFIED), 5000);

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    let loaded = load_default_file_config()?;
    let file_config = loaded.config.unwrap_or_default();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > config file > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => file_config.verbosity.map_or("info", |v| v.log_level()),
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, config_path = ?loaded.path, "CLI arguments parsed");

    let config = service_config(&args, &file_config);
    let service = Arc::new(
        ImageSearchService::new(&config).context("Failed to build HTTP client")?,
    );

    match args.command {
        None => run_server(service, file_config.bind.unwrap_or(DEFAULT_BIND)).await,
        Some(Command::Serve { bind }) => {
            run_server(service, bind.or(file_config.bind).unwrap_or(DEFAULT_BIND)).await
        }
        Some(Command::Search {
            query,
            total,
            credentials,
        }) => run_search(&service, query, total, credentials).await,
        Some(Command::Download { id, url, query }) => {
            let path = service
                .download(&DownloadRequest::new(id, url, query))
                .await?;
            println!("{}", path.display());
            Ok(())
        }
        Some(Command::Keywords) => {
            for keyword in service.keywords().await? {
                println!("{keyword}");
            }
            Ok(())
        }
        Some(Command::Batch { total, credentials }) => {
            run_batch(&service, total, &credentials).await
        }
    }
}

/// Merges CLI flags over file config over built-in defaults.
fn service_config(args: &Args, file: &FileConfig) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    if let Some(save_dir) = args.save_dir.clone().or_else(|| file.save_dir.clone()) {
        config.save_dir = save_dir;
    }
    if let Some(keywords_file) = args
        .keywords_file
        .clone()
        .or_else(|| file.keywords_file.clone())
    {
        config.keyword_files = vec![keywords_file];
    }
    if let Some(endpoint) = &file.search_endpoint {
        config.search_endpoint.clone_from(endpoint);
    }
    if let Some(secs) = file.search_timeout_secs {
        config.search_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = file.download_timeout_secs {
        config.download_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = file.probe_timeout_secs {
        config.probe_timeout = Duration::from_secs(secs);
    }
    config
}

async fn run_server(service: Arc<ImageSearchService>, bind: SocketAddr) -> Result<()> {
    let save_dir = service.save_dir().to_path_buf();
    tokio::fs::create_dir_all(&save_dir)
        .await
        .with_context(|| format!("Failed to create save directory '{}'", save_dir.display()))?;
    info!(save_dir = %save_dir.display(), "save directory ready");

    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;

    server::serve(listener, service, async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
        }
    })
    .await
    .context("Server error")
}

async fn run_search(
    service: &ImageSearchService,
    query: String,
    total: u8,
    credentials: CredentialArgs,
) -> Result<()> {
    let params = SearchParams {
        q: Some(query),
        api_key: credentials.api_key,
        cx: credentials.cx,
        total: Some(total.to_string()),
    };
    let results = service.search(&params).await?;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

/// Searches each keyword in order; a failed term is logged and skipped.
async fn run_batch(
    service: &ImageSearchService,
    total: u8,
    credentials: &CredentialArgs,
) -> Result<()> {
    let entries = parse_keyword_lines(&service.keywords().await?);
    if entries.is_empty() {
        info!("No keywords found");
        return Ok(());
    }

    let mut failed = 0usize;
    for entry in &entries {
        let params = SearchParams {
            q: Some(entry.term.clone()),
            api_key: credentials.api_key.clone(),
            cx: credentials.cx.clone(),
            total: Some(total.to_string()),
        };
        match service.search(&params).await {
            Ok(results) => {
                println!("{}\t{}", entry.label, results.len());
            }
            Err(e) => {
                failed += 1;
                warn!(term = %entry.term, error = %e, "batch search failed; continuing");
            }
        }
    }

    info!(terms = entries.len(), failed, "Batch complete");
    Ok(())
}
