use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sleuth::providers::mock::{
    MemoryRepository, MockEmbeddingProvider, ScriptedFeed, ScriptedSummarizer,
};
use sleuth::providers::ChannelAlertSink;
use sleuth::{Collaborators, EngineConfig, ScanController, Update};

fn hot_post(id: &str) -> Update {
    Update {
        id: id.to_string(),
        title: "Major outage hits the package registry".to_string(),
        author: "ops".to_string(),
        body: "Installs are failing everywhere since this morning.".to_string(),
        score: 200,
        comment_count: 20,
        created_at: Utc::now(),
        image_ref: None,
        comments: Vec::new(),
    }
}

#[tokio::test]
async fn first_tick_flows_through_to_an_alert_and_stop_drains() {
    let repository = Arc::new(MemoryRepository::new());
    let (alerts, mut alert_rx) = ChannelAlertSink::new();
    let collaborators = Collaborators {
        embedder: Arc::new(MockEmbeddingProvider::new()),
        summarizer: Arc::new(ScriptedSummarizer::new("HEADLINE: Package registry outage")),
        vision: None,
        repository: repository.clone(),
        alerts: Arc::new(alerts),
    };
    let feed = Arc::new(ScriptedFeed::new().batch(vec![hot_post("p1")]));

    let mut controller = ScanController::new();
    controller
        .start(EngineConfig::default(), collaborators, feed)
        .unwrap();
    assert!(controller.is_running());

    let mut snapshots = controller.subscribe().unwrap();
    tokio::time::timeout(Duration::from_secs(5), snapshots.changed())
        .await
        .expect("no snapshot published")
        .unwrap();
    let published = snapshots.borrow().clone();
    assert_eq!(published.len(), 1);
    assert!(published[0].reported);

    let alert = tokio::time::timeout(Duration::from_secs(5), alert_rx.recv())
        .await
        .expect("no alert delivered")
        .unwrap();
    assert_eq!(alert.headline, "Package registry outage");
    assert_eq!(alert.cluster_id, published[0].id);
    // the scan loop stored the item before the engine read it back
    assert_eq!(repository.item_count(), 1);

    let engine = controller.stop().await.unwrap().unwrap();
    assert!(!controller.is_running());
    assert_eq!(engine.state().arena.len(), 1);
}

#[tokio::test]
async fn controller_refuses_double_start_and_tolerates_idle_stop() {
    let mut controller = ScanController::new();
    assert!(controller.stop().await.unwrap().is_none());

    let collaborators = || Collaborators {
        embedder: Arc::new(MockEmbeddingProvider::new()),
        summarizer: Arc::new(ScriptedSummarizer::new("NO_NEWS")),
        vision: None,
        repository: Arc::new(MemoryRepository::new()),
        alerts: Arc::new(sleuth::providers::LogAlertSink),
    };

    controller
        .start(EngineConfig::default(), collaborators(), Arc::new(ScriptedFeed::new()))
        .unwrap();
    assert!(controller
        .start(EngineConfig::default(), collaborators(), Arc::new(ScriptedFeed::new()))
        .is_err());

    assert!(controller.stop().await.unwrap().is_some());
    assert!(controller.subscribe().is_none());
}
