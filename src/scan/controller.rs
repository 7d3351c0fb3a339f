use anyhow::{bail, Context, Result};
use log::info;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::engine::worker::SnapshotReceiver;
use crate::engine::{mutation_loop, Collaborators, Engine};
use crate::providers::FeedSource;

use super::loop_worker::{scan_loop, Scanner};

/// Owns the scan task and the mutation task of one running pipeline.
pub struct ScanController {
    scan_handle: Option<JoinHandle<()>>,
    mutation_handle: Option<JoinHandle<Engine>>,
    cancel_token: Option<CancellationToken>,
    snapshots: Option<SnapshotReceiver>,
}

impl Default for ScanController {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanController {
    pub fn new() -> Self {
        Self {
            scan_handle: None,
            mutation_handle: None,
            cancel_token: None,
            snapshots: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.scan_handle.is_some()
    }

    pub fn start(
        &mut self,
        config: EngineConfig,
        collaborators: Collaborators,
        feed: Arc<dyn FeedSource>,
    ) -> Result<()> {
        if self.is_running() {
            bail!("scan already active");
        }

        let scanner = Scanner::new(feed, collaborators.repository.clone(), config.clone());
        let engine = Engine::new(config, collaborators);

        let (batch_tx, batch_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(Vec::new()));
        let cancel_token = CancellationToken::new();

        let mutation_handle = tokio::spawn(mutation_loop(engine, batch_rx, snapshot_tx));
        let scan_handle = tokio::spawn(scan_loop(
            scanner,
            batch_tx,
            snapshot_rx.clone(),
            cancel_token.clone(),
        ));

        info!("scan and mutation loops started");
        self.scan_handle = Some(scan_handle);
        self.mutation_handle = Some(mutation_handle);
        self.cancel_token = Some(cancel_token);
        self.snapshots = Some(snapshot_rx);
        Ok(())
    }

    /// A receiver for the snapshots published after each batch, if running.
    pub fn subscribe(&self) -> Option<SnapshotReceiver> {
        self.snapshots.clone()
    }

    /// Stop scanning, let the mutation task finish every queued batch, and
    /// return its engine. `None` when nothing was running.
    pub async fn stop(&mut self) -> Result<Option<Engine>> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        self.snapshots = None;

        // the scan task owns the only batch sender; joining it closes the queue
        if let Some(handle) = self.scan_handle.take() {
            handle.await.context("scan loop task failed to join")?;
        }

        match self.mutation_handle.take() {
            Some(handle) => {
                let engine = handle.await.context("mutation loop task failed to join")?;
                info!("pipeline stopped");
                Ok(Some(engine))
            }
            None => Ok(None),
        }
    }
}
