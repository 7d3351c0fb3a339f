//! Turns a significant investigation into (maybe) an alert.
//!
//! Evidence is gathered, folded into the rolling context, and sent to the
//! summarizer together with the headlines already published. State is only
//! committed when the reply carries a fresh headline; any other outcome
//! leaves the investigation exactly as it was, so it is retried on the next
//! qualifying batch.

pub mod context;
pub mod prompt;

pub use context::{gather_evidence, roll_context, select_deep_dive, Evidence};
pub use prompt::{build_prompt, parse_reply, ReportVerdict, HEADLINE_MARKER, NO_NEWS_SENTINEL};

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::investigation::Investigation;
use crate::models::Alert;
use crate::providers::{AlertSink, ItemRepository, Summarizer, VisionAnalyzer};
use crate::utils::text::normalize_headline;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Result of one report attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    Alerted(Alert),
    /// The summarizer answered with the no-news sentinel.
    NoNews,
    /// The reply had no recognizable headline.
    Malformed,
    /// The headline repeats one already published for this investigation.
    Repeated(String),
    /// None of the deep-dive items could be loaded.
    NoEvidence,
    /// The summarizer errored or timed out.
    Failed(String),
}

pub struct Reporter {
    summarizer: Arc<dyn Summarizer>,
    vision: Option<Arc<dyn VisionAnalyzer>>,
    repository: Arc<dyn ItemRepository>,
    alerts: Arc<dyn AlertSink>,
    config: EngineConfig,
}

impl Reporter {
    pub fn new(
        summarizer: Arc<dyn Summarizer>,
        vision: Option<Arc<dyn VisionAnalyzer>>,
        repository: Arc<dyn ItemRepository>,
        alerts: Arc<dyn AlertSink>,
        config: EngineConfig,
    ) -> Self {
        Self {
            summarizer,
            vision,
            repository,
            alerts,
            config,
        }
    }

    pub async fn report(&self, investigation: &mut Investigation, now: DateTime<Utc>) -> ReportOutcome {
        let evidence = gather_evidence(
            investigation,
            self.repository.as_ref(),
            self.vision.as_deref(),
            &self.config,
            now,
        )
        .await;

        if evidence.items_included == 0 {
            log_warn!("no deep-dive evidence for {}; skipping summarization", investigation.id);
            return ReportOutcome::NoEvidence;
        }

        let combined = roll_context(
            &investigation.cached_context,
            &evidence.block,
            self.config.context_window_chars,
        );
        let prompt = build_prompt(&investigation.id, &investigation.report_history, &combined);

        let call = self.summarizer.generate(&prompt);
        let reply = match tokio::time::timeout(self.config.summarize_timeout(), call).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(err)) => {
                log_warn!("summarizer failed for {}: {err:?}", investigation.id);
                return ReportOutcome::Failed(err.to_string());
            }
            Err(_) => {
                log_warn!(
                    "summarizer timeout (> {}s) for {}",
                    self.config.summarize_timeout_secs,
                    investigation.id
                );
                return ReportOutcome::Failed("timed out".to_string());
            }
        };

        let headline = match parse_reply(&reply) {
            ReportVerdict::Accepted(headline) => headline,
            ReportVerdict::Rejected => return ReportOutcome::NoNews,
            ReportVerdict::Malformed => {
                log_info!("unstructured summarizer reply for {}", investigation.id);
                return ReportOutcome::Malformed;
            }
        };

        let normalized = normalize_headline(&headline);
        if investigation
            .report_history
            .iter()
            .any(|previous| normalize_headline(previous) == normalized)
        {
            log_info!("repeated headline for {}: {headline}", investigation.id);
            return ReportOutcome::Repeated(headline);
        }

        investigation.reported = true;
        investigation.push_headline(headline.clone(), self.config.report_history_cap);
        investigation.cached_context = combined;

        let alert = Alert {
            headline,
            cluster_id: investigation.id.clone(),
            emitted_at: now,
        };
        if let Err(err) = self.alerts.emit(&alert).await {
            log_warn!("alert sink rejected alert for {}: {err:?}", investigation.id);
        }
        log_info!("alert for {}: {}", alert.cluster_id, alert.headline);

        ReportOutcome::Alerted(alert)
    }
}
