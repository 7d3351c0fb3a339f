use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};

use crate::investigation::InvestigationSnapshot;

/// Remembers when each item was last polled so members of live
/// investigations that dropped out of the feed can be refreshed explicitly.
#[derive(Debug, Default)]
pub struct GapFiller {
    last_polled: HashMap<String, DateTime<Utc>>,
}

impl GapFiller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_polled<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>, at: DateTime<Utc>) {
        for id in ids {
            self.last_polled.insert(id.to_string(), at);
        }
    }

    pub fn last_polled(&self, id: &str) -> Option<DateTime<Utc>> {
        self.last_polled.get(id).copied()
    }

    /// Members of `live` investigations not polled for longer than
    /// `stale_after`, stalest first, at most `limit`.
    pub fn stale_members(
        &self,
        live: &[InvestigationSnapshot],
        now: DateTime<Utc>,
        stale_after: Duration,
        limit: usize,
    ) -> Vec<String> {
        let mut stale: Vec<(Option<DateTime<Utc>>, &str)> = live
            .iter()
            .flat_map(|snapshot| snapshot.member_ids.iter())
            .filter_map(|id| {
                let polled = self.last_polled(id);
                match polled {
                    Some(at) if now - at <= stale_after => None,
                    _ => Some((polled, id.as_str())),
                }
            })
            .collect();

        // never-polled ids sort first (None < Some)
        stale.sort();
        stale.dedup_by(|a, b| a.1 == b.1);
        stale
            .into_iter()
            .take(limit)
            .map(|(_, id)| id.to_string())
            .collect()
    }

    /// Forget items that belong to no live investigation and have not been
    /// polled within `keep_for`.
    pub fn forget_inactive(
        &mut self,
        live: &[InvestigationSnapshot],
        now: DateTime<Utc>,
        keep_for: Duration,
    ) -> usize {
        let members: HashSet<&str> = live
            .iter()
            .flat_map(|snapshot| snapshot.member_ids.iter().map(String::as_str))
            .collect();
        let before = self.last_polled.len();
        self.last_polled
            .retain(|id, at| members.contains(id.as_str()) || now - *at <= keep_for);
        before - self.last_polled.len()
    }

    pub fn len(&self) -> usize {
        self.last_polled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_polled.is_empty()
    }
}
