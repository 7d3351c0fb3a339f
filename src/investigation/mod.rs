//! The investigation (topic cluster) entity.
//!
//! An investigation is the only long-lived mutable state in the engine. It is
//! created from a single meaningful update, grows as related updates fold
//! into it, may absorb a converged neighbour, and is pruned once it has gone
//! quiet for longer than the configured TTL.

pub mod arena;

pub use arena::{ClusterIndex, InvestigationArena};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

use crate::clustering::delta::Delta;
use crate::clustering::similarity::{ema_update, weighted_average};
use crate::models::Update;
use crate::utils::text::tail_chars;

#[derive(Debug, Clone, PartialEq)]
pub struct Investigation {
    pub id: String,
    pub centroid: Vec<f32>,
    pub member_ids: BTreeSet<String>,

    pub thread_count: u64,
    pub total_score: i64,
    pub total_comments: i64,

    pub best_member_id: String,
    pub best_member_score: i64,

    pub first_seen: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub last_active_member_id: String,

    pub reported: bool,
    pub report_history: VecDeque<String>,
    pub cached_context: String,
}

impl Investigation {
    /// Seed a new investigation from one update and its embedding.
    pub fn seed(
        id: String,
        embedding: Vec<f32>,
        update: &Update,
        delta: Delta,
        now: DateTime<Utc>,
    ) -> Self {
        let mut member_ids = BTreeSet::new();
        member_ids.insert(update.id.clone());

        Self {
            id,
            centroid: embedding,
            member_ids,
            thread_count: 1,
            total_score: delta.score.max(0),
            total_comments: delta.comments.max(0),
            best_member_id: update.id.clone(),
            best_member_score: update.score,
            first_seen: now,
            last_activity: now,
            last_active_member_id: update.id.clone(),
            reported: false,
            report_history: VecDeque::new(),
            cached_context: String::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.centroid.len()
    }

    /// Fold a matched, meaningful update into this investigation.
    ///
    /// Only the positive parts of the delta are accumulated so the metrics
    /// never shrink. Any new growth re-arms a reported investigation.
    pub fn fold(
        &mut self,
        embedding: &[f32],
        update: &Update,
        delta: Delta,
        alpha: f32,
        now: DateTime<Utc>,
    ) {
        ema_update(&mut self.centroid, embedding, alpha);

        if self.member_ids.insert(update.id.clone()) {
            self.thread_count += 1;
        }
        self.total_score += delta.score.max(0);
        self.total_comments += delta.comments.max(0);

        if update.score > self.best_member_score {
            self.best_member_score = update.score;
            self.best_member_id = update.id.clone();
        }

        self.record_activity(now, &update.id);
        self.reported = false;
    }

    /// Advance `last_activity`; never moves it backwards.
    pub fn record_activity(&mut self, at: DateTime<Utc>, member_id: &str) {
        if at >= self.last_activity {
            self.last_activity = at;
            self.last_active_member_id = member_id.to_string();
        }
    }

    /// Absorb `other` into `self`.
    ///
    /// The centroid becomes the thread-count weighted average of both sides,
    /// computed from the counts as they were before the merge. A reported
    /// survivor is re-armed when the absorbed side carries newer unreported
    /// activity.
    pub fn absorb(&mut self, other: Investigation, history_cap: usize, context_cap: usize) {
        self.centroid = weighted_average(
            &self.centroid,
            self.thread_count as f32,
            &other.centroid,
            other.thread_count as f32,
        );

        self.thread_count += other.thread_count;
        self.total_score += other.total_score;
        self.total_comments += other.total_comments;
        self.member_ids.extend(other.member_ids);

        if other.best_member_score > self.best_member_score {
            self.best_member_score = other.best_member_score;
            self.best_member_id = other.best_member_id;
        }
        if other.last_activity > self.last_activity {
            if !other.reported {
                self.reported = false;
            }
            self.last_activity = other.last_activity;
            self.last_active_member_id = other.last_active_member_id;
        }
        self.first_seen = self.first_seen.min(other.first_seen);

        for headline in other.report_history {
            self.push_headline(headline, history_cap);
        }

        if !other.cached_context.is_empty() {
            let combined = format!("{}\n{}", self.cached_context, other.cached_context);
            self.cached_context = tail_chars(&combined, context_cap).to_string();
        }
    }

    /// Append a headline, evicting the oldest entries beyond `cap`.
    pub fn push_headline(&mut self, headline: String, cap: usize) {
        self.report_history.push_back(headline);
        while self.report_history.len() > cap {
            self.report_history.pop_front();
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.last_activity > ttl
    }

    pub fn snapshot(&self) -> InvestigationSnapshot {
        InvestigationSnapshot {
            id: self.id.clone(),
            member_ids: self.member_ids.iter().cloned().collect(),
            thread_count: self.thread_count,
            total_score: self.total_score,
            total_comments: self.total_comments,
            best_member_id: self.best_member_id.clone(),
            first_seen: self.first_seen,
            last_activity: self.last_activity,
            reported: self.reported,
            latest_headline: self.report_history.back().cloned(),
        }
    }
}

/// Immutable view of an investigation published after every batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestigationSnapshot {
    pub id: String,
    pub member_ids: Vec<String>,
    pub thread_count: u64,
    pub total_score: i64,
    pub total_comments: i64,
    pub best_member_id: String,
    pub first_seen: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub reported: bool,
    pub latest_headline: Option<String>,
}
