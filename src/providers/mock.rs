//! In-process collaborators for tests, demos and dry runs.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::{AlertSink, EmbeddingProvider, FeedSource, ItemRepository, Summarizer, VisionAnalyzer};
use crate::models::{Alert, Comment, Item, Update};

pub const MOCK_EMBEDDING_DIM: usize = 64;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Deterministic hashed bag-of-words embeddings.
///
/// Texts sharing vocabulary land close together. Vectors pinned with
/// [`MockEmbeddingProvider::with_vector`] win over hashing when the text
/// contains the marker; texts containing a [`MockEmbeddingProvider::fail_on`]
/// marker return an error.
#[derive(Debug, Default)]
pub struct MockEmbeddingProvider {
    pinned: Vec<(String, Vec<f32>)>,
    failing: Vec<String>,
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vector(mut self, marker: &str, vector: Vec<f32>) -> Self {
        self.pinned.push((marker.to_string(), vector));
        self
    }

    pub fn fail_on(mut self, marker: &str) -> Self {
        self.failing.push(marker.to_string());
        self
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(marker) = self.failing.iter().find(|marker| text.contains(marker.as_str())) {
            return Err(anyhow!("embedding backend rejected input containing '{marker}'"));
        }
        if let Some((_, vector)) = self
            .pinned
            .iter()
            .find(|(marker, _)| text.contains(marker.as_str()))
        {
            return Ok(vector.clone());
        }
        Ok(hashed_embedding(text))
    }
}

fn hashed_embedding(text: &str) -> Vec<f32> {
    let mut embedding = vec![0.0f32; MOCK_EMBEDDING_DIM];

    for token in text
        .split(|ch: char| !ch.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
    {
        let hash = fnv1a_64(token.to_ascii_lowercase().as_bytes());
        let index = (hash as usize) % MOCK_EMBEDDING_DIM;
        let sign = if ((hash >> 8) & 1) == 0 { 1.0 } else { -1.0 };
        embedding[index] += sign;
    }

    let norm = embedding.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for value in &mut embedding {
            *value /= norm;
        }
    }
    embedding
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash = 0xcbf29ce484222325u64;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Replays queued replies in order and records every prompt it was given.
///
/// Once the queue is empty it answers with `fallback`.
#[derive(Debug)]
pub struct ScriptedSummarizer {
    replies: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
    fallback: String,
    delay: Option<Duration>,
}

impl ScriptedSummarizer {
    pub fn new(fallback: &str) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            fallback: fallback.to_string(),
            delay: None,
        }
    }

    pub fn reply(self, text: &str) -> Self {
        lock(&self.replies).push_back(Ok(text.to_string()));
        self
    }

    pub fn fail(self, message: &str) -> Self {
        lock(&self.replies).push_back(Err(message.to_string()));
        self
    }

    /// Sleep before answering, to exercise call timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }
}

#[async_trait]
impl Summarizer for ScriptedSummarizer {
    async fn generate(&self, prompt: &str) -> Result<String> {
        lock(&self.prompts).push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = lock(&self.replies).pop_front();
        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Ok(self.fallback.clone()),
        }
    }
}

/// Describes every image with the same caption, or always fails.
#[derive(Debug, Clone)]
pub struct StaticVision {
    caption: Option<String>,
}

impl StaticVision {
    pub fn captioning(caption: &str) -> Self {
        Self {
            caption: Some(caption.to_string()),
        }
    }

    pub fn broken() -> Self {
        Self { caption: None }
    }
}

#[async_trait]
impl VisionAnalyzer for StaticVision {
    async fn analyze(&self, image_ref: &str) -> Result<String> {
        self.caption
            .clone()
            .ok_or_else(|| anyhow!("vision backend unavailable for {image_ref}"))
    }
}

/// HashMap-backed repository.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    items: Mutex<HashMap<String, Item>>,
    comments: Mutex<HashMap<String, Vec<Comment>>>,
    failing: Mutex<HashSet<String>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_item(&self, item: Item) {
        lock(&self.items).insert(item.id.clone(), item);
    }

    pub fn insert_comments(&self, item_id: &str, comments: Vec<Comment>) {
        lock(&self.comments)
            .entry(item_id.to_string())
            .or_default()
            .extend(comments);
    }

    /// Make reads of `item_id` fail.
    pub fn break_item(&self, item_id: &str) {
        lock(&self.failing).insert(item_id.to_string());
    }

    pub fn item_count(&self) -> usize {
        lock(&self.items).len()
    }
}

#[async_trait]
impl ItemRepository for MemoryRepository {
    async fn get_item(&self, id: &str) -> Result<Option<Item>> {
        if lock(&self.failing).contains(id) {
            return Err(anyhow!("item {id} unavailable"));
        }
        Ok(lock(&self.items).get(id).cloned())
    }

    async fn get_comments(&self, id: &str, limit: usize) -> Result<Vec<Comment>> {
        if lock(&self.failing).contains(id) {
            return Err(anyhow!("comments for {id} unavailable"));
        }
        Ok(lock(&self.comments)
            .get(id)
            .map(|comments| comments.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn record_updates(&self, updates: &[Update]) -> Result<()> {
        let now = Utc::now();
        for update in updates {
            self.insert_item(Item::from_update(update, now));
            if !update.comments.is_empty() {
                lock(&self.comments).insert(update.id.clone(), update.comments.clone());
            }
        }
        Ok(())
    }
}

/// Keeps every alert it receives.
#[derive(Debug, Default)]
pub struct CollectingAlertSink {
    alerts: Mutex<Vec<Alert>>,
}

impl CollectingAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        lock(&self.alerts).clone()
    }
}

#[async_trait]
impl AlertSink for CollectingAlertSink {
    async fn emit(&self, alert: &Alert) -> Result<()> {
        lock(&self.alerts).push(alert.clone());
        Ok(())
    }
}

/// Serves queued batches from `fetch_latest` and a fixed catalogue from
/// `fetch_items`. An empty queue yields empty batches.
#[derive(Debug, Default)]
pub struct ScriptedFeed {
    batches: Mutex<VecDeque<Result<Vec<Update>, String>>>,
    catalogue: Mutex<HashMap<String, Update>>,
    refetched: Mutex<Vec<Vec<String>>>,
}

impl ScriptedFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batch(self, updates: Vec<Update>) -> Self {
        lock(&self.batches).push_back(Ok(updates));
        self
    }

    pub fn failing_batch(self, message: &str) -> Self {
        lock(&self.batches).push_back(Err(message.to_string()));
        self
    }

    pub fn catalogue(self, update: Update) -> Self {
        lock(&self.catalogue).insert(update.id.clone(), update);
        self
    }

    /// Every id list passed to `fetch_items`, in call order.
    pub fn refetched(&self) -> Vec<Vec<String>> {
        lock(&self.refetched).clone()
    }
}

#[async_trait]
impl FeedSource for ScriptedFeed {
    async fn fetch_latest(&self) -> Result<Vec<Update>> {
        let next = lock(&self.batches).pop_front();
        match next {
            Some(Ok(updates)) => Ok(updates),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Ok(Vec::new()),
        }
    }

    async fn fetch_items(&self, ids: &[String]) -> Result<Vec<Update>> {
        lock(&self.refetched).push(ids.to_vec());
        let catalogue = lock(&self.catalogue);
        Ok(ids.iter().filter_map(|id| catalogue.get(id).cloned()).collect())
    }
}
