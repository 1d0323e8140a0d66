pub mod batch;
pub mod config;
pub mod error;
pub mod event;
pub mod session;
pub mod summary;
pub mod timebucket;

pub use batch::EventBatch;
pub use error::SummaryError;
pub use event::{Event, SubmissionPayload};
pub use summary::{Calendar, Sum};
pub use timebucket::{time_buckets, Interval};
