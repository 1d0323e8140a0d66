pub mod admission;
pub mod aggregator;
pub mod pipeline;
pub mod ratelimit;
pub mod sites;
pub mod store;

pub use admission::AdmissionGuard;
pub use aggregator::SessionAggregator;
pub use pipeline::IngestPipeline;
pub use ratelimit::RateGate;
pub use sites::SiteGate;
pub use store::{EventStore, MemoryEventStore};
