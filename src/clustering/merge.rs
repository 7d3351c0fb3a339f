use crate::clustering::similarity::cosine_similarity;
use crate::config::EngineConfig;
use crate::investigation::InvestigationArena;

/// One absorption performed by a merge pass.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeEvent {
    pub survivor_id: String,
    pub absorbed_id: String,
    pub similarity: f32,
}

/// Absorb investigations whose centroids have converged.
///
/// Pairs come from the indices live when the pass starts. Each pair is
/// re-checked against the live arena, so an investigation absorbed earlier
/// in the pass is skipped, while a survivor keeps absorbing with its updated
/// centroid (chained merges). Pairs already visited are not revisited after
/// a chain moves a centroid; a later pass picks those up.
///
/// The bar is `similarity_threshold + merge_threshold_offset`, strictly
/// exceeded. The investigation with fewer threads is absorbed; on equal
/// counts the one earlier in iteration order survives.
pub fn merge_converged(arena: &mut InvestigationArena, config: &EngineConfig) -> Vec<MergeEvent> {
    let threshold = config.merge_threshold();
    let snapshot = arena.indices();
    let mut events = Vec::new();

    for (position, &left) in snapshot.iter().enumerate() {
        for &right in &snapshot[position + 1..] {
            let (Some(a), Some(b)) = (arena.get(left), arena.get(right)) else {
                continue;
            };
            if a.dimension() != b.dimension() {
                continue;
            }

            let similarity = cosine_similarity(&a.centroid, &b.centroid);
            if similarity <= threshold {
                continue;
            }

            let (survivor, absorbed) = if b.thread_count > a.thread_count {
                (right, left)
            } else {
                (left, right)
            };

            let Some(absorbed_investigation) = arena.remove(absorbed) else {
                continue;
            };
            let absorbed_id = absorbed_investigation.id.clone();
            let Some(target) = arena.get_mut(survivor) else {
                continue;
            };
            target.absorb(
                absorbed_investigation,
                config.report_history_cap,
                config.context_window_chars,
            );

            events.push(MergeEvent {
                survivor_id: target.id.clone(),
                absorbed_id,
                similarity,
            });
        }
    }

    events
}
