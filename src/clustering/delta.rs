use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Score and comment change since the previous observation of an item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delta {
    pub score: i64,
    pub comments: i64,
}

impl Delta {
    /// Growth in either dimension counts as activity.
    pub fn is_meaningful(&self) -> bool {
        self.score > 0 || self.comments > 0
    }
}

/// Per-item last-seen score and comment count across scan cycles.
///
/// Never touches investigations. An item seen for the first time is
/// compared against zero, so its whole score counts as growth.
#[derive(Debug, Default)]
pub struct DeltaTracker {
    last_score: HashMap<String, i64>,
    last_comments: HashMap<String, i64>,
    last_observed: HashMap<String, DateTime<Utc>>,
}

impl DeltaTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the delta and overwrite the stored values unconditionally.
    pub fn observe(&mut self, item_id: &str, score: i64, comments: i64, now: DateTime<Utc>) -> Delta {
        let previous_score = self
            .last_score
            .insert(item_id.to_string(), score)
            .unwrap_or(0);
        let previous_comments = self
            .last_comments
            .insert(item_id.to_string(), comments)
            .unwrap_or(0);
        self.last_observed.insert(item_id.to_string(), now);

        Delta {
            score: score - previous_score,
            comments: comments - previous_comments,
        }
    }

    pub fn last_seen(&self, item_id: &str) -> Option<(i64, i64)> {
        let score = *self.last_score.get(item_id)?;
        let comments = self.last_comments.get(item_id).copied().unwrap_or(0);
        Some((score, comments))
    }

    /// Forget items not observed within `retention`. Returns how many went.
    pub fn retain_recent(&mut self, now: DateTime<Utc>, retention: Duration) -> usize {
        let stale: Vec<String> = self
            .last_observed
            .iter()
            .filter(|(_, seen)| now - **seen > retention)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &stale {
            self.last_score.remove(id);
            self.last_comments.remove(id);
            self.last_observed.remove(id);
        }
        stale.len()
    }

    pub fn len(&self) -> usize {
        self.last_score.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_score.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::investigation::test_support::at;

    #[test]
    fn first_sighting_counts_everything_as_growth() {
        let mut tracker = DeltaTracker::new();
        let delta = tracker.observe("a", 10, 2, at(0));
        assert_eq!(delta, Delta { score: 10, comments: 2 });
        assert!(delta.is_meaningful());
    }

    #[test]
    fn deltas_are_relative_to_the_latest_observation() {
        let mut tracker = DeltaTracker::new();
        tracker.observe("a", 10, 2, at(0));
        assert_eq!(tracker.observe("a", 15, 2, at(1)), Delta { score: 5, comments: 0 });
        assert_eq!(tracker.observe("a", 12, 4, at(2)), Delta { score: -3, comments: 2 });
        // negative movement is still recorded as the new baseline
        assert_eq!(tracker.last_seen("a"), Some((12, 4)));
        assert_eq!(tracker.observe("a", 12, 4, at(3)), Delta::default());
        assert!(!Delta::default().is_meaningful());
    }

    #[test]
    fn retention_drops_only_quiet_items() {
        let mut tracker = DeltaTracker::new();
        tracker.observe("old", 1, 0, at(0));
        tracker.observe("new", 1, 0, at(90));

        let removed = tracker.retain_recent(at(100), Duration::seconds(50));

        assert_eq!(removed, 1);
        assert_eq!(tracker.len(), 1);
        assert!(tracker.last_seen("old").is_none());
        assert!(tracker.last_seen("new").is_some());
    }
}
