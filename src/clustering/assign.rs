use chrono::{DateTime, Utc};

use crate::clustering::delta::Delta;
use crate::clustering::similarity::cosine_similarity;
use crate::config::EngineConfig;
use crate::investigation::{ClusterIndex, Investigation, InvestigationArena};
use crate::models::Update;

/// Highest-similarity live investigation for an embedding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestMatch {
    pub index: ClusterIndex,
    pub similarity: f32,
}

/// What the clusterer did with one update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOutcome {
    /// No investigation was close enough; a new one was seeded.
    Created(ClusterIndex),
    /// Matched and grew; centroid and metrics changed.
    Folded(ClusterIndex),
    /// Matched, but nothing grew. No structural change.
    Touched(ClusterIndex),
}

impl AssignmentOutcome {
    pub fn is_meaningful(&self) -> bool {
        matches!(self, Self::Created(_) | Self::Folded(_))
    }

    pub fn index(&self) -> ClusterIndex {
        match self {
            Self::Created(index) | Self::Folded(index) | Self::Touched(index) => *index,
        }
    }
}

/// Arg-max of cosine similarity over live centroids.
///
/// Uses strict `>` while scanning, so on an exact tie the investigation
/// that comes first in arena iteration order wins. Centroids whose
/// dimension differs from the embedding are never considered.
pub fn best_match(arena: &InvestigationArena, embedding: &[f32]) -> Option<BestMatch> {
    let mut best: Option<BestMatch> = None;

    for (index, investigation) in arena.iter() {
        if investigation.dimension() != embedding.len() {
            continue;
        }
        let similarity = cosine_similarity(&investigation.centroid, embedding);
        match best {
            Some(current) if similarity <= current.similarity => {}
            _ => best = Some(BestMatch { index, similarity }),
        }
    }

    best
}

/// Assign one update to an investigation, creating one when nothing matches.
///
/// An unmatched update always seeds a new investigation, whatever its
/// delta; the seed only counts the positive parts of the delta.
pub fn assign_update(
    arena: &mut InvestigationArena,
    update: &Update,
    embedding: Vec<f32>,
    delta: Delta,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> AssignmentOutcome {
    let matched = best_match(arena, &embedding)
        .filter(|candidate| candidate.similarity >= config.similarity_threshold)
        .map(|candidate| candidate.index);

    if let Some(index) = matched {
        if let Some(investigation) = arena.get_mut(index) {
            if !delta.is_meaningful() {
                return AssignmentOutcome::Touched(index);
            }
            investigation.fold(&embedding, update, delta, config.ema_alpha, now);
            return AssignmentOutcome::Folded(index);
        }
    }

    let id = arena.allocate_id();
    let investigation = Investigation::seed(id, embedding, update, delta, now);
    AssignmentOutcome::Created(arena.insert(investigation))
}
