use std::num::NonZeroU32;
use std::sync::Arc;

use dashmap::DashMap;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};

pub(crate) type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

pub(crate) fn direct_limiter(per_sec: u32, burst: u32) -> DirectLimiter {
    let rate = NonZeroU32::new(per_sec).unwrap_or(NonZeroU32::MIN);
    let burst = NonZeroU32::new(burst.max(1)).unwrap_or(NonZeroU32::MIN);
    RateLimiter::direct(Quota::per_second(rate).allow_burst(burst))
}

/// Per-key token-bucket limiters, lazily materialized.
///
/// The first `allow` call for an unseen key creates its limiter with the
/// given rate/burst and consumes one token; later calls reuse that limiter
/// and ignore the rate/burst arguments. Creation goes through the concurrent
/// map's entry API, so two racing first-calls agree on a single limiter.
#[derive(Default)]
pub struct RateGate {
    limiters: DashMap<String, Arc<DirectLimiter>>,
}

impl RateGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one token from `key`'s bucket. `per_sec == 0` always denies.
    pub fn allow(&self, key: &str, per_sec: u32, burst: u32) -> bool {
        if per_sec == 0 {
            return false;
        }
        let limiter = self
            .limiters
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(direct_limiter(per_sec, burst)))
            .clone();
        limiter.check().is_ok()
    }
}
