use async_trait::async_trait;
use tokio::sync::Mutex;

use tidemark_core::EventBatch;

/// Append boundary of the external log-structured store.
///
/// `SessionAggregator::flush` is the sole caller on the write path. Retry
/// policy, if any, belongs to the implementation behind this trait. A
/// failed append propagates to the flush caller and the batch is not
/// re-merged into the live buffer.
#[async_trait]
pub trait EventStore: Send + Sync + 'static {
    async fn append(&self, batch: EventBatch) -> anyhow::Result<()>;
}

/// In-memory store for tests and embedded use: keeps every committed batch
/// in arrival order, which is exactly the total order `flush` establishes.
#[derive(Default)]
pub struct MemoryEventStore {
    batches: Mutex<Vec<EventBatch>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn batches(&self) -> Vec<EventBatch> {
        self.batches.lock().await.clone()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn append(&self, batch: EventBatch) -> anyhow::Result<()> {
        self.batches.lock().await.push(batch);
        Ok(())
    }
}
