use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    helpers::{parse_datetime, to_i64},
    Database,
};
use crate::models::{Comment, Item, Update};
use crate::providers::ItemRepository;

fn item_from_row(row: &Row<'_>) -> Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        title: row.get(1)?,
        author: row.get(2)?,
        body: row.get(3)?,
        score: row.get(4)?,
        comment_count: row.get(5)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?, "items.created_at")?,
        image_ref: row.get(7)?,
        last_seen_at: parse_datetime(&row.get::<_, String>(8)?, "items.last_seen_at")?,
    })
}

impl Database {
    /// Upsert every update as an item and store the comments scraped with it.
    pub async fn upsert_updates(&self, updates: &[Update]) -> Result<usize> {
        let records = updates.to_vec();
        let seen_at = Utc::now().to_rfc3339();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut item_stmt = tx.prepare(
                    "INSERT INTO items (
                        id, title, author, body, score, comment_count, created_at, image_ref, last_seen_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    ON CONFLICT(id) DO UPDATE SET
                        title = excluded.title,
                        author = excluded.author,
                        body = excluded.body,
                        score = excluded.score,
                        comment_count = excluded.comment_count,
                        image_ref = COALESCE(excluded.image_ref, items.image_ref),
                        last_seen_at = excluded.last_seen_at",
                )?;
                let mut comment_stmt = tx.prepare(
                    "INSERT INTO comments (id, item_id, author, body, score, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(id) DO UPDATE SET
                        body = excluded.body,
                        score = excluded.score",
                )?;

                for update in &records {
                    item_stmt
                        .execute(params![
                            update.id,
                            update.title,
                            update.author,
                            update.body,
                            update.score,
                            update.comment_count,
                            update.created_at.to_rfc3339(),
                            update.image_ref,
                            seen_at,
                        ])
                        .with_context(|| format!("failed to upsert item {}", update.id))?;

                    for comment in &update.comments {
                        comment_stmt
                            .execute(params![
                                comment.id,
                                update.id,
                                comment.author,
                                comment.body,
                                comment.score,
                                comment.created_at.to_rfc3339(),
                            ])
                            .with_context(|| format!("failed to upsert comment {}", comment.id))?;
                    }
                }
            }
            tx.commit().context("failed to commit scanned items")?;
            Ok(records.len())
        })
        .await
    }

    pub async fn find_item(&self, id: &str) -> Result<Option<Item>> {
        let id = id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, author, body, score, comment_count, created_at, image_ref, last_seen_at
                 FROM items
                 WHERE id = ?1",
            )?;
            let raw = stmt
                .query_row(params![id], |row| Ok(item_from_row(row)))
                .optional()?;
            raw.transpose()
        })
        .await
    }

    /// Highest-scored comments first, oldest first among equals.
    pub async fn top_comments(&self, item_id: &str, limit: usize) -> Result<Vec<Comment>> {
        let item_id = item_id.to_string();
        let limit = to_i64(limit)?;
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, item_id, author, body, score, created_at
                 FROM comments
                 WHERE item_id = ?1
                 ORDER BY score DESC, created_at ASC
                 LIMIT ?2",
            )?;

            let mut rows = stmt.query(params![item_id, limit])?;
            let mut comments = Vec::new();
            while let Some(row) = rows.next()? {
                comments.push(Comment {
                    id: row.get(0)?,
                    item_id: row.get(1)?,
                    author: row.get(2)?,
                    body: row.get(3)?,
                    score: row.get(4)?,
                    created_at: parse_datetime(&row.get::<_, String>(5)?, "comments.created_at")?,
                });
            }
            Ok(comments)
        })
        .await
    }
}

#[async_trait]
impl ItemRepository for Database {
    async fn get_item(&self, id: &str) -> Result<Option<Item>> {
        self.find_item(id).await
    }

    async fn get_comments(&self, id: &str, limit: usize) -> Result<Vec<Comment>> {
        self.top_comments(id, limit).await
    }

    async fn record_updates(&self, updates: &[Update]) -> Result<()> {
        self.upsert_updates(updates).await.map(|_| ())
    }
}
