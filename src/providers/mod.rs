//! Boundaries to the collaborators this crate never implements itself:
//! embedding, text generation, vision, item storage, alert delivery and the
//! scan/fetch layer.
//!
//! Every method may fail; callers catch the error at the call site and skip
//! only the affected unit of work.

pub mod mock;

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use tokio::sync::mpsc;

use crate::models::{Alert, Comment, Item, Update};

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[async_trait]
pub trait VisionAnalyzer: Send + Sync {
    async fn analyze(&self, image_ref: &str) -> Result<String>;
}

/// Read path used by the context builder, plus the write path the scan loop
/// uses to store what it observed.
#[async_trait]
pub trait ItemRepository: Send + Sync {
    async fn get_item(&self, id: &str) -> Result<Option<Item>>;
    async fn get_comments(&self, id: &str, limit: usize) -> Result<Vec<Comment>>;
    async fn record_updates(&self, updates: &[Update]) -> Result<()>;
}

#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn emit(&self, alert: &Alert) -> Result<()>;
}

/// The scan/fetch collaborator producing raw update batches.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Latest items from the monitored feeds.
    async fn fetch_latest(&self) -> Result<Vec<Update>>;
    /// Explicit refresh of specific items (gap-filling).
    async fn fetch_items(&self, ids: &[String]) -> Result<Vec<Update>>;
}

/// Writes alerts to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn emit(&self, alert: &Alert) -> Result<()> {
        info!("ALERT [{}] {}", alert.cluster_id, alert.headline);
        Ok(())
    }
}

/// Forwards alerts into a channel for a UI or notifier to consume.
#[derive(Debug, Clone)]
pub struct ChannelAlertSink {
    sender: mpsc::UnboundedSender<Alert>,
}

impl ChannelAlertSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Alert>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl AlertSink for ChannelAlertSink {
    async fn emit(&self, alert: &Alert) -> Result<()> {
        self.sender
            .send(alert.clone())
            .map_err(|_| anyhow::anyhow!("alert receiver dropped"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::investigation::test_support::at;

    #[tokio::test]
    async fn channel_sink_delivers_alerts_in_order() {
        let (sink, mut receiver) = ChannelAlertSink::new();
        for n in 0..2 {
            let alert = Alert {
                headline: format!("h{n}"),
                cluster_id: "inv-000001".into(),
                emitted_at: at(n),
            };
            sink.emit(&alert).await.unwrap();
        }

        assert_eq!(receiver.recv().await.unwrap().headline, "h0");
        assert_eq!(receiver.recv().await.unwrap().headline, "h1");
    }

    #[tokio::test]
    async fn channel_sink_errors_once_receiver_is_gone() {
        let (sink, receiver) = ChannelAlertSink::new();
        drop(receiver);
        let alert = Alert {
            headline: "late".into(),
            cluster_id: "inv-000001".into(),
            emitted_at: at(0),
        };
        assert!(sink.emit(&alert).await.is_err());
    }
}
