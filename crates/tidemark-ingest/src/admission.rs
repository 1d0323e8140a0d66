use std::collections::HashSet;

use tidemark_core::config::Config;

use crate::ratelimit::{direct_limiter, DirectLimiter};

/// The global gate applied before any per-site processing: one process-wide
/// request budget plus a static domain allow-list built at construction.
///
/// The two checks are independent; both must pass before a request reaches
/// the site gate.
pub struct AdmissionGuard {
    limiter: Option<DirectLimiter>,
    allowed: HashSet<String>,
}

impl AdmissionGuard {
    /// A rate of zero disables admission entirely: `allow` always denies.
    pub fn new(per_sec: u32, burst: u32, domains: impl IntoIterator<Item = String>) -> Self {
        Self {
            limiter: (per_sec > 0).then(|| direct_limiter(per_sec, burst)),
            allowed: domains
                .into_iter()
                .map(|d| d.to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.admission_rate_per_sec,
            config.admission_burst,
            config.allowed_domains.iter().cloned(),
        )
    }

    /// Consume one token from the global budget, independent of tenant.
    pub fn allow(&self) -> bool {
        match &self.limiter {
            Some(limiter) => limiter.check().is_ok(),
            None => false,
        }
    }

    /// O(1) membership check against the fixed allow-list. An empty list
    /// accepts every domain; per-site registration still applies downstream.
    pub fn accept(&self, domain: &str) -> bool {
        self.allowed.is_empty() || self.allowed.contains(&domain.to_ascii_lowercase())
    }
}
