//! NFL props API - cache an NFL projections feed and serve it over HTTP
//!
//! `serve` runs the HTTP server with a background refresh loop; `fetch`
//! writes the feed to a file once and exits.

use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use nflprops::cache::CacheStore;
use nflprops::cli::{Cli, Command, FetchConfig, ServeConfig, UpstreamConfig};
use nflprops::data::FeedClient;
use nflprops::logging;
use nflprops::refresh::RefreshHandle;
use nflprops::server::{self, AppState};
use nflprops::service::PropsService;
use nflprops::snapshot::{self, SnapshotOutcome};

fn feed_client(upstream: &UpstreamConfig) -> FeedClient {
    FeedClient::new(upstream.url.clone()).with_timeout(upstream.fetch_timeout)
}

/// Resolves on Ctrl-C. If the handler cannot be installed, never resolves.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn run_server(config: ServeConfig) -> Result<(), Box<dyn std::error::Error>> {
    let client = feed_client(&config.upstream);
    info!(
        upstream = client.upstream_host(),
        ttl_secs = config.upstream.ttl.as_secs(),
        refresh_interval_secs = config.refresh.interval.as_secs(),
        "NFL props API server starting"
    );

    let store = Arc::new(CacheStore::new(config.upstream.ttl));
    let service = Arc::new(PropsService::new(client, store));
    let refresher = RefreshHandle::spawn(config.refresh.clone(), Arc::clone(&service));
    let state = AppState::new(service, refresher.subscribe());

    let listener = TcpListener::bind(config.addr).await?;
    info!(addr = %config.addr, "listening");

    server::serve(listener, state, shutdown_signal()).await?;

    refresher.shutdown().await;
    info!("server stopped");
    Ok(())
}

async fn run_fetch(config: FetchConfig) -> Result<(), Box<dyn std::error::Error>> {
    let client = feed_client(&config.upstream);
    let outcome =
        snapshot::export(&client, &config.output, config.upstream.ttl, config.force).await?;

    match outcome {
        SnapshotOutcome::Skipped { age } => {
            info!(age_secs = age.as_secs(), "no update needed");
        }
        SnapshotOutcome::Written { records } => {
            info!(records, path = %config.output.display(), "update completed");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(cli.log_format).map_err(|e| e as Box<dyn std::error::Error>)?;

    let result = match cli.command {
        Command::Serve(args) => match ServeConfig::from_args(&args) {
            Ok(config) => run_server(config).await,
            Err(e) => Err(e.into()),
        },
        Command::Fetch(args) => match FetchConfig::from_args(&args) {
            Ok(config) => run_fetch(config).await,
            Err(e) => Err(e.into()),
        },
    };

    if let Err(ref e) = result {
        error!(error = %e, "nflprops exited with an error");
    }
    result
}
