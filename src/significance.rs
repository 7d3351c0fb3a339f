//! Cheap activity-based gate in front of the expensive summarization call.
//!
//! Deliberately permissive: a false positive costs one summarizer call that
//! can still answer "no news", a false negative loses a real story.

use chrono::{DateTime, Utc};

use crate::config::{EngineConfig, SignificanceWeights};
use crate::investigation::{ClusterIndex, Investigation, InvestigationArena};

/// Score components for one investigation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignificanceScore {
    pub thread: f64,
    pub comments: f64,
    pub score: f64,
    pub recency: f64,
    pub total: f64,
}

/// An investigation that cleared the report threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub index: ClusterIndex,
    pub significance: f64,
}

/// Weighted sum of thread count, comments and score, plus a flat bonus
/// when the investigation moved within the recent-activity window.
pub fn compute_significance(
    investigation: &Investigation,
    weights: &SignificanceWeights,
    recent_window: chrono::Duration,
    now: DateTime<Utc>,
) -> SignificanceScore {
    let thread = investigation.thread_count as f64 * weights.thread;
    let comments = investigation.total_comments as f64 * weights.comments;
    let score = investigation.total_score as f64 * weights.score;
    let recency = if now - investigation.last_activity <= recent_window {
        weights.recent_activity_bonus
    } else {
        0.0
    };

    SignificanceScore {
        thread,
        comments,
        score,
        recency,
        total: thread + comments + score + recency,
    }
}

/// Unreported investigations whose score meets `report_threshold`,
/// highest first.
pub fn select_candidates(
    arena: &InvestigationArena,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> Vec<Candidate> {
    let recent_window = config.recent_activity_window();

    let mut candidates: Vec<Candidate> = arena
        .iter()
        .filter(|(_, investigation)| !investigation.reported)
        .filter_map(|(index, investigation)| {
            let significance =
                compute_significance(investigation, &config.weights, recent_window, now).total;
            (significance >= config.report_threshold).then_some(Candidate { index, significance })
        })
        .collect();

    candidates.sort_by(|a, b| b.significance.total_cmp(&a.significance));
    candidates
}
