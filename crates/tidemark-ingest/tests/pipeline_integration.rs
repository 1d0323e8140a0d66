use std::sync::Arc;

use async_trait::async_trait;

use tidemark_core::{
    config::{Config, SiteConfig},
    EventBatch, SubmissionPayload,
};
use tidemark_ingest::{
    AdmissionGuard, EventStore, IngestPipeline, MemoryEventStore, SiteGate,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn site(id: &str, domain: &str) -> SiteConfig {
    SiteConfig {
        id: id.to_string(),
        owner: Some("acme".to_string()),
        domains: vec![domain.to_string()],
        rate_per_sec: 100,
        burst: 100,
    }
}

fn hit(fingerprint: &str, ms: i64) -> SubmissionPayload {
    SubmissionPayload {
        fingerprint: fingerprint.to_string(),
        path: "/pricing".to_string(),
        timestamp_ms: Some(ms),
        ..Default::default()
    }
}

fn pipeline_with_store(
    guard: AdmissionGuard,
    sites: Vec<SiteConfig>,
    store: Arc<dyn EventStore>,
) -> IngestPipeline {
    let gate = SiteGate::new(sites, &Config::default(), store);
    IngestPipeline::new(guard, gate)
}

#[tokio::test]
async fn duplicate_hits_collapse_into_one_updated_row() {
    init_tracing();
    let store = Arc::new(MemoryEventStore::new());
    let pipeline = pipeline_with_store(
        AdmissionGuard::new(100, 100, Vec::new()),
        vec![site("site_1", "example.com")],
        store.clone(),
    );

    assert!(pipeline.submit("example.com", hit("fp", 0)).await);
    assert!(pipeline.submit("example.com", hit("fp", 5 * 60 * 1000)).await);
    pipeline.flush_all().await.unwrap();

    let batches = store.batches().await;
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 1, "one visit, not two rows");
    assert_eq!(batches[0].page_views[0], 2);
    assert!(!batches[0].is_new_visit[0]);
}

#[tokio::test]
async fn unknown_domain_is_dropped_without_error() {
    let store = Arc::new(MemoryEventStore::new());
    let pipeline = pipeline_with_store(
        AdmissionGuard::new(100, 100, Vec::new()),
        vec![site("site_1", "example.com")],
        store.clone(),
    );

    assert!(!pipeline.submit("stranger.dev", hit("fp", 0)).await);
    pipeline.flush_all().await.unwrap();
    assert!(store.batches().await.is_empty());
}

#[tokio::test]
async fn exhausted_admission_budget_never_reaches_site_gate() {
    let store = Arc::new(MemoryEventStore::new());
    // Global rate 0: allow() is always false, so even a registered domain
    // with a generous site limit sees nothing.
    let pipeline = pipeline_with_store(
        AdmissionGuard::new(0, 0, Vec::new()),
        vec![site("site_1", "example.com")],
        store.clone(),
    );

    assert!(!pipeline.submit("example.com", hit("fp", 0)).await);
    pipeline.flush_all().await.unwrap();
    assert!(store.batches().await.is_empty());
}

#[tokio::test]
async fn allow_list_blocks_unlisted_domains() {
    let store = Arc::new(MemoryEventStore::new());
    let pipeline = pipeline_with_store(
        AdmissionGuard::new(100, 100, vec!["allowed.com".to_string()]),
        vec![site("site_1", "example.com"), site("site_2", "allowed.com")],
        store.clone(),
    );

    assert!(!pipeline.submit("example.com", hit("fp", 0)).await);
    assert!(pipeline.submit("allowed.com", hit("fp", 0)).await);
}

#[tokio::test]
async fn site_rate_limit_throttles_independently() {
    let store = Arc::new(MemoryEventStore::new());
    let throttled = SiteConfig {
        id: "slow".to_string(),
        owner: None,
        domains: vec!["slow.com".to_string()],
        rate_per_sec: 1,
        burst: 1,
    };
    let pipeline = pipeline_with_store(
        AdmissionGuard::new(100, 100, Vec::new()),
        vec![site("fast", "fast.com"), throttled],
        store.clone(),
    );

    assert!(pipeline.submit("slow.com", hit("a", 0)).await);
    assert!(!pipeline.submit("slow.com", hit("b", 0)).await);
    // The other site's bucket is untouched.
    assert!(pipeline.submit("fast.com", hit("c", 0)).await);
}

struct FailingStore;

#[async_trait]
impl EventStore for FailingStore {
    async fn append(&self, _batch: EventBatch) -> anyhow::Result<()> {
        anyhow::bail!("store unavailable")
    }
}

#[tokio::test]
async fn append_failure_surfaces_and_batch_is_not_remerged() {
    init_tracing();
    let pipeline = pipeline_with_store(
        AdmissionGuard::new(100, 100, Vec::new()),
        vec![site("site_1", "example.com")],
        Arc::new(FailingStore),
    );

    assert!(pipeline.submit("example.com", hit("fp", 0)).await);
    assert!(pipeline.flush_all().await.is_err(), "append failure must surface");
    // The failed batch was swapped out and is gone; the next flush is empty
    // and therefore succeeds.
    assert!(pipeline.flush_all().await.is_ok());
}

#[tokio::test]
async fn events_route_to_their_own_site_buffer() {
    let store = Arc::new(MemoryEventStore::new());
    let pipeline = pipeline_with_store(
        AdmissionGuard::new(100, 100, Vec::new()),
        vec![site("site_1", "a.com"), site("site_2", "b.com")],
        store.clone(),
    );

    assert!(pipeline.submit("a.com", hit("fp", 1_000)).await);
    assert!(pipeline.submit("b.com", hit("fp", 2_000)).await);
    pipeline.flush_all().await.unwrap();

    let batches = store.batches().await;
    assert_eq!(batches.len(), 2);
    let mut sites: Vec<&str> = batches.iter().map(|b| b.site_ids[0].as_str()).collect();
    sites.sort_unstable();
    assert_eq!(sites, vec!["site_1", "site_2"]);
}
