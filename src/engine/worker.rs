use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use crate::investigation::InvestigationSnapshot;

use super::{Engine, ScanBatch};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

pub type SnapshotSender = watch::Sender<Arc<Vec<InvestigationSnapshot>>>;
pub type SnapshotReceiver = watch::Receiver<Arc<Vec<InvestigationSnapshot>>>;

/// Apply batches in arrival order until every sender is gone.
///
/// A fresh snapshot is published after each batch. The loop only exits once
/// the channel is closed and drained, so nothing queued before shutdown is
/// lost. The engine is handed back to the caller.
pub async fn mutation_loop(
    mut engine: Engine,
    mut batches: mpsc::UnboundedReceiver<ScanBatch>,
    snapshots: SnapshotSender,
) -> Engine {
    while let Some(batch) = batches.recv().await {
        let size = batch.updates.len();
        let summary = engine.process_batch(batch).await;

        log_info!(
            "batch of {} updates: {} created, {} folded, {} touched, {} merged, {} pruned, {} candidates, {} alerts",
            size,
            summary.created,
            summary.folded,
            summary.touched,
            summary.merges.len(),
            summary.pruned.len(),
            summary.candidates,
            summary.alerts.len()
        );
        if summary.embed_failures > 0 {
            log_warn!("{} updates skipped after embedding failures", summary.embed_failures);
        }

        // send_replace keeps the latest value even when nobody is subscribed
        snapshots.send_replace(Arc::new(engine.snapshot()));
    }

    log_info!(
        "mutation loop drained; {} investigations live",
        engine.state().arena.len()
    );
    engine
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::Collaborators;
    use crate::investigation::test_support::{at, update};
    use crate::providers::mock::{
        CollectingAlertSink, MemoryRepository, MockEmbeddingProvider, ScriptedSummarizer,
    };

    fn engine() -> Engine {
        Engine::new(
            EngineConfig::default(),
            Collaborators {
                embedder: Arc::new(MockEmbeddingProvider::new()),
                summarizer: Arc::new(ScriptedSummarizer::new("NO_NEWS")),
                vision: None,
                repository: Arc::new(MemoryRepository::new()),
                alerts: Arc::new(CollectingAlertSink::new()),
            },
        )
    }

    #[tokio::test]
    async fn queued_batches_are_drained_after_the_sender_closes() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(Vec::new()));

        tx.send(ScanBatch {
            fetched_at: at(0),
            updates: vec![update("a", 3, 0)],
        })
        .unwrap();
        tx.send(ScanBatch {
            fetched_at: at(10),
            updates: vec![update("a", 9, 1)],
        })
        .unwrap();
        drop(tx);

        let engine = mutation_loop(engine(), rx, snapshot_tx).await;

        assert_eq!(engine.state().arena.len(), 1);
        assert_eq!(engine.state().deltas.last_seen("a"), Some((9, 1)));

        let published = snapshot_rx.borrow().clone();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].total_score, 9);
        assert_eq!(published[0].total_comments, 1);
    }
}
