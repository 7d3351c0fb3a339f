use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A comment attached to an item, as returned by the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub item_id: String,
    pub author: String,
    pub body: String,
    pub score: i64,
    pub created_at: DateTime<Utc>,
}

/// One observation of an item during a scan cycle.
///
/// Produced by the feed source, consumed once by the engine and discarded.
/// `comments` carries whatever top comments the fetch layer scraped along
/// with the item; it may be empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Update {
    pub id: String,
    pub title: String,
    pub author: String,
    pub body: String,
    pub score: i64,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
    pub image_ref: Option<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Update {
    /// Text handed to the embedding provider.
    pub fn embedding_text(&self) -> String {
        format!("{} {}", self.title, self.body)
    }
}

/// The stored form of an item, read back by the context builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub title: String,
    pub author: String,
    pub body: String,
    pub score: i64,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
    pub image_ref: Option<String>,
    pub last_seen_at: DateTime<Utc>,
}

impl Item {
    pub fn from_update(update: &Update, seen_at: DateTime<Utc>) -> Self {
        Self {
            id: update.id.clone(),
            title: update.title.clone(),
            author: update.author.clone(),
            body: update.body.clone(),
            score: update.score,
            comment_count: update.comment_count,
            created_at: update.created_at,
            image_ref: update.image_ref.clone(),
            last_seen_at: seen_at,
        }
    }
}
