use chrono::{DateTime, Duration, Utc};

use crate::investigation::{Investigation, InvestigationArena};

/// Remove every investigation quiet for longer than `ttl`, reported or not.
pub fn prune_expired(
    arena: &mut InvestigationArena,
    now: DateTime<Utc>,
    ttl: Duration,
) -> Vec<Investigation> {
    let expired: Vec<_> = arena
        .iter()
        .filter(|(_, investigation)| investigation.is_expired(now, ttl))
        .map(|(index, _)| index)
        .collect();

    expired
        .into_iter()
        .filter_map(|index| arena.remove(index))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::investigation::test_support::{at, investigation};

    #[test]
    fn ttl_boundary_is_exclusive() {
        let ttl = Duration::minutes(60);
        let now = at(10_000);

        let mut arena = InvestigationArena::new();
        let mut stale = investigation("stale", vec![1.0], 1);
        stale.last_activity = now - ttl - Duration::seconds(1);
        let mut fresh = investigation("fresh", vec![1.0], 1);
        fresh.last_activity = now - ttl + Duration::seconds(1);
        arena.insert(stale);
        let kept = arena.insert(fresh);

        let pruned = prune_expired(&mut arena, now, ttl);

        assert_eq!(pruned.len(), 1);
        assert_eq!(pruned[0].id, "stale");
        assert_eq!(arena.indices(), vec![kept]);
    }

    #[test]
    fn reported_investigations_are_pruned_too() {
        let mut arena = InvestigationArena::new();
        let mut done = investigation("done", vec![1.0], 1);
        done.reported = true;
        arena.insert(done);

        let pruned = prune_expired(&mut arena, at(7_200), Duration::minutes(60));
        assert_eq!(pruned.len(), 1);
        assert!(arena.is_empty());
    }
}
