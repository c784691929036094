//! Command-line interface parsing for the NFL props service
//!
//! This module handles parsing of CLI arguments using clap. Every option can
//! also come from the environment, so the upstream URL (which embeds the API
//! key) never needs to appear on a command line.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use reqwest::Url;
use thiserror::Error;

use crate::cache::DEFAULT_TTL_SECS;
use crate::data::DEFAULT_FETCH_TIMEOUT_SECS;
use crate::logging::LogFormat;
use crate::refresh::RefreshConfig;

/// Error types for CLI argument validation
#[derive(Debug, Error)]
pub enum CliError {
    /// The upstream URL could not be parsed
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    /// The upstream URL is not http(s)
    #[error("Unsupported API URL scheme '{0}': expected http or https")]
    UnsupportedScheme(String),

    /// A duration option was zero
    #[error("--{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

/// NFL props API - cache an NFL projections feed and serve it over HTTP
#[derive(Parser, Debug)]
#[command(name = "nflprops")]
#[command(about = "Cache an NFL player-projection feed and serve it over HTTP")]
#[command(version)]
pub struct Cli {
    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP server with background refresh
    Serve(ServeArgs),
    /// Fetch the feed once and write it to a JSON file
    Fetch(FetchArgs),
}

/// Options shared by every mode that talks to the upstream API
#[derive(Args, Debug, Clone)]
pub struct UpstreamArgs {
    /// Upstream feed URL, including any API key query parameter
    #[arg(long, env = "NFL_API_URL", hide_env_values = true)]
    pub api_url: String,

    /// Seconds before cached data is considered stale
    #[arg(long, env = "CACHE_TTL_SECS", default_value_t = DEFAULT_TTL_SECS)]
    pub ttl_secs: u64,

    /// Hard timeout for one upstream call, in seconds
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = DEFAULT_FETCH_TIMEOUT_SECS)]
    pub fetch_timeout_secs: u64,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub upstream: UpstreamArgs,

    /// Address to listen on
    #[arg(long, env = "BIND_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Seconds between background refreshes (defaults to the TTL)
    #[arg(long, env = "REFRESH_INTERVAL_SECS")]
    pub refresh_interval_secs: Option<u64>,

    /// Only refresh on demand when a request finds the cache stale
    #[arg(long)]
    pub no_background_refresh: bool,
}

#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    #[command(flatten)]
    pub upstream: UpstreamArgs,

    /// File to write the feed to
    #[arg(long, short, default_value = "NFLprops.json")]
    pub output: PathBuf,

    /// Fetch even if the output file is younger than the TTL
    #[arg(long)]
    pub force: bool,
}

/// Validated upstream settings
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamConfig {
    pub url: Url,
    pub ttl: Duration,
    pub fetch_timeout: Duration,
}

/// Validated settings for `serve`
#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub upstream: UpstreamConfig,
    pub addr: SocketAddr,
    pub refresh: RefreshConfig,
}

/// Validated settings for `fetch`
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub upstream: UpstreamConfig,
    pub output: PathBuf,
    pub force: bool,
}

/// Converts a seconds option into a non-zero Duration
fn non_zero_secs(value: u64, flag: &'static str) -> Result<Duration, CliError> {
    if value == 0 {
        return Err(CliError::ZeroDuration(flag));
    }
    Ok(Duration::from_secs(value))
}

impl UpstreamConfig {
    /// Validates the shared upstream options.
    ///
    /// # Returns
    /// * `Ok(UpstreamConfig)` with a parsed http(s) URL and non-zero durations
    /// * `Err(CliError)` if any option is invalid
    pub fn from_args(args: &UpstreamArgs) -> Result<Self, CliError> {
        let url = Url::parse(&args.api_url).map_err(|e| CliError::InvalidUrl(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CliError::UnsupportedScheme(url.scheme().to_string()));
        }

        Ok(Self {
            url,
            ttl: non_zero_secs(args.ttl_secs, "ttl-secs")?,
            fetch_timeout: non_zero_secs(args.fetch_timeout_secs, "fetch-timeout-secs")?,
        })
    }
}

impl ServeConfig {
    pub fn from_args(args: &ServeArgs) -> Result<Self, CliError> {
        let upstream = UpstreamConfig::from_args(&args.upstream)?;
        let interval = match args.refresh_interval_secs {
            Some(secs) => non_zero_secs(secs, "refresh-interval-secs")?,
            None => upstream.ttl,
        };

        Ok(Self {
            addr: SocketAddr::new(args.host, args.port),
            refresh: RefreshConfig {
                interval,
                enabled: !args.no_background_refresh,
            },
            upstream,
        })
    }
}

impl FetchConfig {
    pub fn from_args(args: &FetchArgs) -> Result<Self, CliError> {
        Ok(Self {
            upstream: UpstreamConfig::from_args(&args.upstream)?,
            output: args.output.clone(),
            force: args.force,
        })
    }
}
