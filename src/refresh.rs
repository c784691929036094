//! Background feed refresh
//!
//! Runs a fixed-period loop that refetches the feed into the cache
//! independently of client traffic: fetch, then sleep for the configured
//! interval, regardless of whether the fetch succeeded.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::service::PropsService;

/// Default period between scheduled refreshes in seconds
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 3600;

/// Where the refresh loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    /// Not started yet
    Idle,
    /// Waiting on the upstream call
    Fetching,
    /// Waiting for the next period
    Sleeping,
    /// Background refresh is turned off
    Disabled,
    /// Shut down
    Stopped,
}

/// Configuration for the refresh loop
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Sleep between the end of one fetch and the start of the next
    pub interval: Duration,
    /// Whether background refresh is enabled
    pub enabled: bool,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS),
            enabled: true,
        }
    }
}

/// Handle for controlling the background refresh task
///
/// Dropping the handle also stops the loop at its next await point.
pub struct RefreshHandle {
    state: watch::Receiver<SchedulerState>,
    shutdown_tx: mpsc::Sender<()>,
    task: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    /// Spawns the refresh loop
    ///
    /// The first fetch starts immediately; later fetches follow at
    /// `config.interval` after the previous one finished.
    pub fn spawn(config: RefreshConfig, service: Arc<PropsService>) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

        if !config.enabled {
            info!("background refresh disabled");
            let (_, state) = watch::channel(SchedulerState::Disabled);
            return Self {
                state,
                shutdown_tx,
                task: None,
            };
        }

        let (state_tx, state) = watch::channel(SchedulerState::Idle);
        let task = tokio::spawn(run_loop(config.interval, service, state_tx, shutdown_rx));

        Self {
            state,
            shutdown_tx,
            task: Some(task),
        }
    }

    /// Current state of the loop
    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Receiver that follows state changes, for status reporting
    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.clone()
    }

    /// Signals the loop to stop and waits for it to exit
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

async fn run_loop(
    interval: Duration,
    service: Arc<PropsService>,
    state_tx: watch::Sender<SchedulerState>,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    info!(interval_secs = interval.as_secs(), "background refresh started");

    loop {
        state_tx.send_replace(SchedulerState::Fetching);
        debug!("scheduled refresh triggered");
        tokio::select! {
            // Failures are logged by the service; the loop carries on either way
            _ = service.refresh() => {}
            _ = shutdown_rx.recv() => break,
        }

        state_tx.send_replace(SchedulerState::Sleeping);
        debug!(sleep_secs = interval.as_secs(), "sleeping until next refresh");
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown_rx.recv() => break,
        }
    }

    state_tx.send_replace(SchedulerState::Stopped);
    info!("background refresh stopped");
}
