use chrono::{DateTime, Utc};
use std::fmt::Write as _;

use crate::config::EngineConfig;
use crate::investigation::Investigation;
use crate::providers::{ItemRepository, VisionAnalyzer};
use crate::utils::text::{head_chars, tail_chars};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_warn;

/// One freshly assembled evidence block.
#[derive(Debug, Clone, PartialEq)]
pub struct Evidence {
    pub block: String,
    pub items_included: usize,
}

/// Members to deep-dive into: the best-scoring one first, then the others
/// in ascending id order, at most `cap` in total.
pub fn select_deep_dive(investigation: &Investigation, cap: usize) -> Vec<String> {
    if cap == 0 {
        return Vec::new();
    }

    let mut selected = Vec::with_capacity(cap);
    if investigation.member_ids.contains(&investigation.best_member_id) {
        selected.push(investigation.best_member_id.clone());
    }
    for member in &investigation.member_ids {
        if selected.len() >= cap {
            break;
        }
        if *member != investigation.best_member_id {
            selected.push(member.clone());
        }
    }
    selected
}

/// Fetch the deep-dive items and format them into one evidence block.
///
/// An item whose fetch fails is left out; a failed image description is
/// simply omitted.
pub async fn gather_evidence(
    investigation: &Investigation,
    repository: &dyn ItemRepository,
    vision: Option<&dyn VisionAnalyzer>,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> Evidence {
    let mut block = String::new();
    let _ = writeln!(
        block,
        "--- {} | {} threads, {} points, {} comments ---",
        now.to_rfc3339(),
        investigation.thread_count,
        investigation.total_score,
        investigation.total_comments,
    );

    let mut items_included = 0;
    for item_id in select_deep_dive(investigation, config.deep_dive_cap) {
        let item = match repository.get_item(&item_id).await {
            Ok(Some(item)) => item,
            Ok(None) => {
                log_warn!("deep-dive item {item_id} not found for {}", investigation.id);
                continue;
            }
            Err(err) => {
                log_warn!("deep-dive fetch failed for {item_id}: {err:?}");
                continue;
            }
        };

        let comments = match repository
            .get_comments(&item_id, config.deep_dive_comment_limit)
            .await
        {
            Ok(comments) => comments,
            Err(err) => {
                log_warn!("comment fetch failed for {item_id}: {err:?}");
                continue;
            }
        };

        let _ = writeln!(
            block,
            "# {} (by {}, score {}, {} comments)",
            item.title, item.author, item.score, item.comment_count
        );
        if !item.body.trim().is_empty() {
            let _ = writeln!(block, "{}", head_chars(item.body.trim(), config.item_body_chars));
        }

        if let (Some(analyzer), Some(image_ref)) = (vision, item.image_ref.as_deref()) {
            match analyzer.analyze(image_ref).await {
                Ok(caption) => {
                    let _ = writeln!(block, "[image] {}", caption.trim());
                }
                Err(err) => log_warn!("image analysis skipped for {item_id}: {err:?}"),
            }
        }

        for comment in comments {
            let _ = writeln!(block, "> {}: {}", comment.author, comment.body.trim());
        }

        items_included += 1;
    }

    Evidence {
        block,
        items_included,
    }
}

/// Append `block` to the rolling context.
///
/// When the existing context exceeds `cap` characters, only its most recent
/// `cap` characters are kept before the new block goes on the end.
pub fn roll_context(cached: &str, block: &str, cap: usize) -> String {
    let kept = tail_chars(cached, cap);
    if kept.is_empty() {
        block.to_string()
    } else {
        format!("{kept}\n{block}")
    }
}
