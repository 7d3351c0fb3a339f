use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

use sleuth::providers::mock::{
    CollectingAlertSink, MemoryRepository, MockEmbeddingProvider, ScriptedSummarizer,
};
use sleuth::providers::ItemRepository;
use sleuth::{Collaborators, Engine, EngineConfig, ScanBatch, Update};

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

/// An update whose embedding is pinned by its marker title.
fn post(id: &str, marker: &str, score: i64, comments: i64) -> Update {
    Update {
        id: id.to_string(),
        title: marker.to_string(),
        author: "reporter".to_string(),
        body: format!("details about {id}"),
        score,
        comment_count: comments,
        created_at: at(0),
        image_ref: None,
        comments: Vec::new(),
    }
}

struct Harness {
    engine: Engine,
    repository: Arc<MemoryRepository>,
    summarizer: Arc<ScriptedSummarizer>,
    alerts: Arc<CollectingAlertSink>,
}

impl Harness {
    fn new(summarizer: ScriptedSummarizer) -> Self {
        let embedder = MockEmbeddingProvider::new()
            .with_vector("[alpha-1]", vec![1.0, 0.0, 0.0])
            .with_vector("[alpha-2]", vec![0.9, 0.1, 0.0])
            .with_vector("[alpha-3]", vec![0.95, 0.05, 0.0])
            .with_vector("[beta-1]", vec![0.0, 1.0, 0.0]);
        let repository = Arc::new(MemoryRepository::new());
        let summarizer = Arc::new(summarizer);
        let alerts = Arc::new(CollectingAlertSink::new());
        let engine = Engine::new(
            EngineConfig::default(),
            Collaborators {
                embedder: Arc::new(embedder),
                summarizer: summarizer.clone(),
                vision: None,
                repository: repository.clone(),
                alerts: alerts.clone(),
            },
        );
        Self {
            engine,
            repository,
            summarizer,
            alerts,
        }
    }

    async fn feed(&mut self, secs: i64, updates: Vec<Update>) -> sleuth::BatchSummary {
        self.repository.record_updates(&updates).await.unwrap();
        self.engine
            .process_batch(ScanBatch {
                fetched_at: at(secs),
                updates,
            })
            .await
    }
}

#[tokio::test]
async fn a_story_grows_gets_reported_follows_up_and_expires() {
    let mut h = Harness::new(
        ScriptedSummarizer::new("NO_NEWS")
            .reply("HEADLINE: Alpha story breaks")
            .reply("HEADLINE: Alpha story escalates"),
    );

    // two unrelated seeds, neither significant yet
    let first = h
        .feed(
            0,
            vec![
                post("a1", "[alpha-1]", 20, 4),
                post("b1", "[beta-1]", 3, 0),
            ],
        )
        .await;
    assert_eq!(first.created, 2);
    assert_eq!(first.candidates, 0);
    assert_eq!(h.engine.snapshot().len(), 2);

    // a new thread plus growth on the seed pushes alpha over the threshold
    let second = h
        .feed(
            60,
            vec![
                post("a2", "[alpha-2]", 30, 10),
                post("a1", "[alpha-1]", 25, 6),
            ],
        )
        .await;
    assert_eq!(second.folded, 2);
    assert_eq!(second.alerts.len(), 1);
    assert_eq!(second.alerts[0].headline, "Alpha story breaks");

    let alpha = h
        .engine
        .snapshot()
        .into_iter()
        .find(|s| s.member_ids.contains(&"a1".to_string()))
        .unwrap();
    assert_eq!(alpha.thread_count, 2);
    assert_eq!(alpha.total_score, 55);
    assert_eq!(alpha.total_comments, 16);
    assert!(alpha.reported);

    // growth re-arms the investigation; the follow-up prompt lists what was published
    let third = h.feed(120, vec![post("a3", "[alpha-3]", 40, 5)]).await;
    assert_eq!(third.alerts.len(), 1);
    assert_eq!(third.alerts[0].cluster_id, alpha.id);
    let prompts = h.summarizer.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].contains("1. Alpha story breaks"));
    assert_eq!(h.alerts.alerts().len(), 2);

    // an hour of silence later everything is gone
    let quiet = h.feed(120 + 3_601, Vec::new()).await;
    assert_eq!(quiet.pruned.len(), 2);
    assert!(h.engine.snapshot().is_empty());
}

#[tokio::test]
async fn replays_without_growth_only_touch_until_the_investigation_expires() {
    let mut h = Harness::new(ScriptedSummarizer::new("HEADLINE: should not happen"));

    h.feed(0, vec![post("b1", "[beta-1]", 3, 0)]).await;
    let replay = h.feed(30, vec![post("b1", "[beta-1]", 3, 0)]).await;

    assert_eq!(replay.touched, 1);
    assert_eq!(replay.meaningful_changes(), 0);
    assert!(h.summarizer.prompts().is_empty());

    // the unchanged replay did not refresh the TTL
    let later = h.feed(3_601, vec![post("b1", "[beta-1]", 3, 0)]).await;
    assert_eq!(later.pruned.len(), 1);
    assert_eq!(later.touched, 1);
    assert!(h.engine.snapshot().is_empty());

    // seen again after its investigation expired, the item seeds a fresh one
    let revived = h.feed(3_700, vec![post("b1", "[beta-1]", 3, 0)]).await;
    assert_eq!(revived.created, 1);
    let snapshot = h.engine.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].member_ids, vec!["b1".to_string()]);
    assert_eq!(snapshot[0].total_score, 0);
    assert!(h.summarizer.prompts().is_empty());
}
