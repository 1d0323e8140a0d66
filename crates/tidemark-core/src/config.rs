use std::time::Duration;

/// Process-wide knobs for the write path, loaded once at startup from
/// environment variables. Per-site registration comes from the embedding
/// layer as [`SiteConfig`] records, not from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Span during which repeated hits for one session key merge into a
    /// single visit. Default 900 s (15 minutes).
    pub session_window_secs: u64,
    /// Upper bound on live session-cache entries. Entries beyond this are
    /// subject to admission/eviction; a dropped session simply restarts as a
    /// new visit on its next hit.
    pub session_cache_capacity: u64,
    /// Interval of the periodic flush driver.
    pub flush_interval_ms: u64,
    /// Global request budget applied before any per-site work.
    pub admission_rate_per_sec: u32,
    pub admission_burst: u32,
    /// Static domain allow-list for the admission guard. Empty means every
    /// domain is accepted (per-site registration still applies).
    pub allowed_domains: Vec<String>,
}

/// Per-tenant site registration supplied by the configuration boundary.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Stable site identifier; also the rate-limiter key for this site.
    pub id: String,
    pub owner: Option<String>,
    /// Domains that resolve to this site at the gate.
    pub domains: Vec<String>,
    pub rate_per_sec: u32,
    pub burst: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            session_window_secs: std::env::var("TIDEMARK_SESSION_WINDOW_SECS")
                .unwrap_or_else(|_| "900".to_string())
                .parse()
                .map_err(|e| format!("invalid session window: {e}"))?,
            session_cache_capacity: std::env::var("TIDEMARK_SESSION_CACHE_CAPACITY")
                .unwrap_or_else(|_| "100000".to_string())
                .parse()
                .unwrap_or(100_000),
            flush_interval_ms: std::env::var("TIDEMARK_FLUSH_INTERVAL_MS")
                .unwrap_or_else(|_| "10000".to_string())
                .parse()
                .unwrap_or(10_000),
            admission_rate_per_sec: std::env::var("TIDEMARK_ADMISSION_RATE")
                .unwrap_or_else(|_| "500".to_string())
                .parse()
                .unwrap_or(500),
            admission_burst: std::env::var("TIDEMARK_ADMISSION_BURST")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .unwrap_or(1000),
            allowed_domains: std::env::var("TIDEMARK_ALLOWED_DOMAINS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        })
    }

    pub fn session_window(&self) -> Duration {
        Duration::from_secs(self.session_window_secs)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session_window_secs: 900,
            session_cache_capacity: 100_000,
            flush_interval_ms: 10_000,
            admission_rate_per_sec: 500,
            admission_burst: 1000,
            allowed_domains: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_session_window() {
        let config = Config::default();
        assert_eq!(config.session_window(), Duration::from_secs(900));
        assert_eq!(config.flush_interval(), Duration::from_millis(10_000));
    }
}
