use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::engine::worker::SnapshotReceiver;
use crate::engine::ScanBatch;
use crate::investigation::InvestigationSnapshot;
use crate::models::Update;
use crate::providers::{FeedSource, ItemRepository};

use super::gap_fill::GapFiller;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Everything a scan tick needs, owned by the scan task.
pub struct Scanner {
    feed: Arc<dyn FeedSource>,
    repository: Arc<dyn ItemRepository>,
    config: EngineConfig,
    gaps: GapFiller,
}

impl Scanner {
    pub fn new(
        feed: Arc<dyn FeedSource>,
        repository: Arc<dyn ItemRepository>,
        config: EngineConfig,
    ) -> Self {
        Self {
            feed,
            repository,
            config,
            gaps: GapFiller::new(),
        }
    }

    pub fn gaps(&self) -> &GapFiller {
        &self.gaps
    }

    /// Fetch the latest updates, refresh stale members of `live`
    /// investigations, and persist what was seen.
    ///
    /// Only the primary fetch is fatal for the tick; a failed gap-fill or
    /// write is logged and the batch still goes out.
    pub async fn scan_once(
        &mut self,
        live: &[InvestigationSnapshot],
        now: DateTime<Utc>,
    ) -> Result<ScanBatch> {
        let fetch_start = Instant::now();
        let mut updates = tokio::time::timeout(self.config.fetch_timeout(), self.feed.fetch_latest())
            .await
            .map_err(|_| anyhow!("feed fetch timed out after {}s", self.config.fetch_timeout_secs))?
            .context("feed fetch failed")?;
        let fetch_ms = fetch_start.elapsed().as_millis();

        self.gaps
            .mark_polled(updates.iter().map(|update| update.id.as_str()), now);

        let stale = self.gaps.stale_members(
            live,
            now,
            self.config.gap_fill_after(),
            self.config.gap_fill_limit,
        );
        if !stale.is_empty() {
            match self.refetch(&stale).await {
                Ok(refreshed) => {
                    let seen: HashSet<String> =
                        updates.iter().map(|update| update.id.clone()).collect();
                    let added = refreshed.len();
                    updates.extend(
                        refreshed
                            .into_iter()
                            .filter(|update| !seen.contains(&update.id)),
                    );
                    log_info!("gap-filled {} of {} stale members", added, stale.len());
                }
                Err(err) => log_warn!("gap-fill failed for {} items: {err:?}", stale.len()),
            }
            // also covers ids the feed no longer knows, so they are not retried every tick
            self.gaps.mark_polled(stale.iter().map(String::as_str), now);
        }

        self.gaps
            .forget_inactive(live, now, self.config.delta_retention());

        if !updates.is_empty() {
            if let Err(err) = self.repository.record_updates(&updates).await {
                log_warn!("failed to persist {} scanned items: {err:?}", updates.len());
            }
        }

        log_info!(
            "scan fetched {} updates in {}ms ({} live investigations)",
            updates.len(),
            fetch_ms,
            live.len()
        );

        Ok(ScanBatch {
            fetched_at: now,
            updates,
        })
    }

    async fn refetch(&self, ids: &[String]) -> Result<Vec<Update>> {
        tokio::time::timeout(self.config.fetch_timeout(), self.feed.fetch_items(ids))
            .await
            .map_err(|_| anyhow!("item refresh timed out after {}s", self.config.fetch_timeout_secs))?
    }
}

/// Produce one batch per tick until cancelled or until the mutation side
/// hangs up. Never waits on the mutation task.
pub async fn scan_loop(
    mut scanner: Scanner,
    batches: mpsc::UnboundedSender<ScanBatch>,
    snapshots: SnapshotReceiver,
    cancel_token: CancellationToken,
) {
    let period = scanner.config.scan_interval().max(Duration::from_millis(1));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let live = snapshots.borrow().clone();
                match scanner.scan_once(&live, Utc::now()).await {
                    Ok(batch) => {
                        if batches.send(batch).is_err() {
                            log_error!("mutation loop is gone; stopping scan loop");
                            break;
                        }
                    }
                    Err(err) => log_error!("scan tick failed: {err:?}"),
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("scan loop shutting down");
                break;
            }
        }
    }
}
