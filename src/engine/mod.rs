//! The mutation side of the pipeline.
//!
//! `Engine` owns every piece of mutable clustering state. It is driven by a
//! single task (see [`worker`]) so investigations are never touched from two
//! places at once; everyone else only sees the immutable snapshots it
//! publishes after each batch.

pub mod worker;

pub use worker::mutation_loop;

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::clustering::{
    assign_update, merge_converged, prune_expired, AssignmentOutcome, DeltaTracker, MergeEvent,
};
use crate::config::EngineConfig;
use crate::investigation::{InvestigationArena, InvestigationSnapshot};
use crate::models::{Alert, Update};
use crate::providers::{AlertSink, EmbeddingProvider, ItemRepository, Summarizer, VisionAnalyzer};
use crate::report::{ReportOutcome, Reporter};
use crate::significance::select_candidates;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// External services the engine calls out to.
#[derive(Clone)]
pub struct Collaborators {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub summarizer: Arc<dyn Summarizer>,
    pub vision: Option<Arc<dyn VisionAnalyzer>>,
    pub repository: Arc<dyn ItemRepository>,
    pub alerts: Arc<dyn AlertSink>,
}

/// Updates collected by one scan tick, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanBatch {
    pub fetched_at: DateTime<Utc>,
    pub updates: Vec<Update>,
}

/// The only mutable state of the pipeline.
#[derive(Debug, Default)]
pub struct EngineState {
    pub arena: InvestigationArena,
    pub deltas: DeltaTracker,
}

/// What happened while processing one batch.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BatchSummary {
    pub created: usize,
    pub folded: usize,
    pub touched: usize,
    pub embed_failures: usize,
    pub merges: Vec<MergeEvent>,
    pub pruned: Vec<String>,
    pub forgotten_items: usize,
    pub candidates: usize,
    pub alerts: Vec<Alert>,
    pub declined: usize,
    pub failed_reports: usize,
}

impl BatchSummary {
    pub fn meaningful_changes(&self) -> usize {
        self.created + self.folded
    }
}

pub struct Engine {
    config: EngineConfig,
    state: EngineState,
    embedder: Arc<dyn EmbeddingProvider>,
    reporter: Reporter,
}

impl Engine {
    pub fn new(config: EngineConfig, collaborators: Collaborators) -> Self {
        let reporter = Reporter::new(
            collaborators.summarizer,
            collaborators.vision,
            collaborators.repository,
            collaborators.alerts,
            config.clone(),
        );

        Self {
            config,
            state: EngineState::default(),
            embedder: collaborators.embedder,
            reporter,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn snapshot(&self) -> Vec<InvestigationSnapshot> {
        self.state.arena.snapshot()
    }

    /// Run one batch through every stage, in order: deltas and assignment
    /// per update, then merge, prune, significance and reports.
    ///
    /// `batch.fetched_at` is the clock for the whole batch.
    pub async fn process_batch(&mut self, batch: ScanBatch) -> BatchSummary {
        let now = batch.fetched_at;
        let mut summary = BatchSummary::default();

        for update in &batch.updates {
            match self.apply_update(update, now).await {
                Some(AssignmentOutcome::Created(_)) => summary.created += 1,
                Some(AssignmentOutcome::Folded(_)) => summary.folded += 1,
                Some(AssignmentOutcome::Touched(_)) => summary.touched += 1,
                None => summary.embed_failures += 1,
            }
        }

        summary.merges = merge_converged(&mut self.state.arena, &self.config);
        for event in &summary.merges {
            log_info!(
                "merged {} into {} (similarity {:.3})",
                event.absorbed_id,
                event.survivor_id,
                event.similarity
            );
        }

        summary.pruned = prune_expired(&mut self.state.arena, now, self.config.investigation_ttl())
            .into_iter()
            .map(|investigation| investigation.id)
            .collect();
        if !summary.pruned.is_empty() {
            log_info!("pruned {} inactive investigations", summary.pruned.len());
        }

        summary.forgotten_items = self
            .state
            .deltas
            .retain_recent(now, self.config.delta_retention());

        let candidates = select_candidates(&self.state.arena, &self.config, now);
        summary.candidates = candidates.len();

        for candidate in candidates {
            let Some(investigation) = self.state.arena.get_mut(candidate.index) else {
                continue;
            };
            log_debug!(
                "{} is significant ({:.1}), requesting analysis",
                investigation.id,
                candidate.significance
            );
            match self.reporter.report(investigation, now).await {
                ReportOutcome::Alerted(alert) => summary.alerts.push(alert),
                ReportOutcome::Failed(_) | ReportOutcome::NoEvidence => summary.failed_reports += 1,
                ReportOutcome::NoNews | ReportOutcome::Malformed | ReportOutcome::Repeated(_) => {
                    summary.declined += 1
                }
            }
        }

        summary
    }

    /// Delta bookkeeping plus assignment for one update.
    ///
    /// Returns `None` when the embedding call failed; the update is skipped
    /// but its delta has already been recorded.
    pub async fn apply_update(
        &mut self,
        update: &Update,
        now: DateTime<Utc>,
    ) -> Option<AssignmentOutcome> {
        let delta = self
            .state
            .deltas
            .observe(&update.id, update.score, update.comment_count, now);

        let embedding = match self.embedder.embed(&update.embedding_text()).await {
            Ok(embedding) => embedding,
            Err(err) => {
                log_warn!("embedding failed for item {}: {err:?}", update.id);
                return None;
            }
        };

        Some(assign_update(
            &mut self.state.arena,
            update,
            embedding,
            delta,
            &self.config,
            now,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::investigation::test_support::{at, update};
    use crate::models::Item;
    use crate::providers::mock::{
        CollectingAlertSink, MemoryRepository, MockEmbeddingProvider, ScriptedSummarizer,
    };

    fn engine(
        embedder: MockEmbeddingProvider,
        summarizer: ScriptedSummarizer,
        config: EngineConfig,
    ) -> (Engine, Arc<MemoryRepository>, Arc<CollectingAlertSink>) {
        let repository = Arc::new(MemoryRepository::new());
        let alerts = Arc::new(CollectingAlertSink::new());
        let engine = Engine::new(
            config,
            Collaborators {
                embedder: Arc::new(embedder),
                summarizer: Arc::new(summarizer),
                vision: None,
                repository: repository.clone(),
                alerts: alerts.clone(),
            },
        );
        (engine, repository, alerts)
    }

    #[tokio::test]
    async fn embedding_failure_skips_only_that_update() {
        let embedder = MockEmbeddingProvider::new()
            .with_vector("good", vec![1.0, 0.0])
            .fail_on("bad");
        let (mut engine, _, _) = engine(
            embedder,
            ScriptedSummarizer::new("NO_NEWS"),
            EngineConfig::default(),
        );

        let mut bad = update("x", 5, 0);
        bad.title = "bad".into();
        let mut good = update("y", 5, 0);
        good.title = "good".into();

        let summary = engine
            .process_batch(ScanBatch {
                fetched_at: at(0),
                updates: vec![bad, good],
            })
            .await;

        assert_eq!(summary.embed_failures, 1);
        assert_eq!(summary.created, 1);
        assert_eq!(engine.state().arena.len(), 1);
        // the failed update's delta was still recorded
        assert_eq!(engine.state().deltas.last_seen("x"), Some((5, 0)));
    }

    #[tokio::test]
    async fn stages_run_in_order_within_one_batch() {
        // two near-identical seeds created in the same batch are merged
        // before significance is computed on the survivor
        let embedder = MockEmbeddingProvider::new()
            .with_vector("first", vec![1.0, 0.0])
            .with_vector("second", vec![0.5, 0.5]);
        let mut config = EngineConfig::default();
        config.similarity_threshold = 0.95;
        config.merge_threshold_offset = -0.3;
        let (mut engine, repository, alerts) = engine(
            embedder,
            ScriptedSummarizer::new("NO_NEWS").reply("HEADLINE: merged story"),
            config,
        );

        let mut a = update("a", 30, 5);
        a.title = "first".into();
        let mut b = update("b", 30, 5);
        b.title = "second".into();
        repository.insert_item(Item::from_update(&a, at(0)));
        repository.insert_item(Item::from_update(&b, at(0)));

        let summary = engine
            .process_batch(ScanBatch {
                fetched_at: at(0),
                updates: vec![a, b],
            })
            .await;

        assert_eq!(summary.created, 2);
        assert_eq!(summary.merges.len(), 1);
        assert_eq!(summary.candidates, 1);
        assert_eq!(summary.alerts.len(), 1);
        assert_eq!(alerts.alerts().len(), 1);

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].thread_count, 2);
        assert!(snapshot[0].reported);
        assert_eq!(snapshot[0].latest_headline.as_deref(), Some("merged story"));
    }

    #[tokio::test]
    async fn never_expiring_ttl_keeps_investigations_alive() {
        let mut config = EngineConfig::default();
        config.investigation_ttl_secs = 100_000_000_000_000_000;
        let (mut engine, _, _) = engine(
            MockEmbeddingProvider::new(),
            ScriptedSummarizer::new("NO_NEWS"),
            config,
        );

        engine
            .process_batch(ScanBatch {
                fetched_at: at(0),
                updates: vec![update("a", 3, 0)],
            })
            .await;
        let later = engine
            .process_batch(ScanBatch {
                fetched_at: at(10 * 365 * 24 * 3600),
                updates: Vec::new(),
            })
            .await;

        assert!(later.pruned.is_empty());
        assert_eq!(engine.state().arena.len(), 1);
    }
}
