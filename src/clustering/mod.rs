pub mod assign;
pub mod delta;
pub mod merge;
pub mod prune;
pub mod similarity;

pub use assign::{assign_update, best_match, AssignmentOutcome, BestMatch};
pub use delta::{Delta, DeltaTracker};
pub use merge::{merge_converged, MergeEvent};
pub use prune::prune_expired;
pub use similarity::cosine_similarity;
