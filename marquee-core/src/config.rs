//! Centralized configuration for Marquee.
//!
//! Every tunable the resolution pipeline reads is defined here: where the
//! upstream catalog lives, how long each kind of result stays fresh, how
//! strict title matching is, and how many items a page may yield.

use std::path::PathBuf;
use std::time::Duration;

use crate::{MarqueeError, Result};

/// Central configuration for all Marquee components.
///
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct MarqueeConfig {
    pub upstream: UpstreamConfig,
    pub cache: CacheConfig,
    pub matching: MatchingConfig,
    pub limits: LimitsConfig,
    /// Optional JSON file replacing the built-in selector table
    pub selectors_file: Option<PathBuf>,
}

/// Upstream catalog location and HTTP behavior.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Base URL of the catalog site, always ending in `/`
    pub base_url: String,
    /// Namespace tag prepended to source URLs to form entity ids
    pub id_prefix: String,
    /// Hosts besides the base URL's that an entity id may point at
    pub allowed_hosts: Vec<String>,
    /// User agent sent with every page request
    pub user_agent: String,
    /// Hard timeout for a single page request
    pub request_timeout: Duration,
    /// Extra attempts after a transient transport failure
    pub max_retries: u32,
    /// First backoff delay; doubles per attempt
    pub retry_base_delay: Duration,
    /// Upper bound for a single backoff delay
    pub retry_max_delay: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://cuevana.pro/".to_string(),
            id_prefix: "cuevanap_".to_string(),
            allowed_hosts: Vec::new(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36"
                .to_string(),
            request_timeout: Duration::from_secs(10),
            max_retries: 2,
            retry_base_delay: Duration::from_millis(250),
            retry_max_delay: Duration::from_secs(2),
        }
    }
}

/// Freshness windows and sizing for the resolution caches.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Catalog listings (popular, genre, search)
    pub catalog_ttl: Duration,
    /// Per-title detail metadata
    pub detail_ttl: Duration,
    /// Playable stream links
    pub stream_ttl: Duration,
    /// Number of independently locked shards per cache
    pub shards: usize,
    /// LRU capacity of each shard
    pub max_entries_per_shard: usize,
    /// Period of the background expiry sweep (None = sweep disabled)
    pub sweep_interval: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            catalog_ttl: Duration::from_secs(24 * 60 * 60),
            detail_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            stream_ttl: Duration::from_secs(60 * 60),
            shards: 16,
            max_entries_per_shard: 256,
            sweep_interval: Some(Duration::from_secs(600)),
        }
    }
}

/// Similarity thresholds used when resolving text against candidates.
#[derive(Debug, Clone)]
pub struct MatchingConfig {
    /// Default threshold for fuzzy matches and best-match selection
    pub fuzzy_threshold: f64,
    /// Stricter threshold used when comparing two titles directly
    pub title_threshold: f64,
    /// Looser threshold for filtering free-text search results
    pub search_threshold: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.8,
            title_threshold: 0.85,
            search_threshold: 0.6,
        }
    }
}

/// Result-count limits for scraped pages.
#[derive(Debug, Clone)]
pub struct LimitsConfig {
    /// Maximum items taken from a search results page
    pub search_limit: usize,
    /// Maximum items taken from a popular or genre listing page
    pub listing_limit: usize,
    /// Items the upstream shows per listing page; maps `skip` to a page number
    pub page_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            search_limit: 20,
            listing_limit: 30,
            page_size: 30,
        }
    }
}

impl MarqueeConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Unparsable values are ignored and the default is kept.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(base_url) = std::env::var("MARQUEE_BASE_URL") {
            config.upstream.base_url = with_trailing_slash(base_url.trim());
        }

        if let Ok(prefix) = std::env::var("MARQUEE_ID_PREFIX")
            && !prefix.is_empty()
        {
            config.upstream.id_prefix = prefix;
        }

        if let Ok(hosts) = std::env::var("MARQUEE_ALLOWED_HOSTS") {
            config.upstream.allowed_hosts = hosts
                .split(',')
                .map(|h| h.trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect();
        }

        if let Some(seconds) = parse_env::<u64>("MARQUEE_REQUEST_TIMEOUT") {
            config.upstream.request_timeout = Duration::from_secs(seconds);
        }

        if let Some(retries) = parse_env::<u32>("MARQUEE_MAX_RETRIES") {
            config.upstream.max_retries = retries;
        }

        if let Some(seconds) = parse_env::<u64>("MARQUEE_CATALOG_TTL") {
            config.cache.catalog_ttl = Duration::from_secs(seconds);
        }

        if let Some(seconds) = parse_env::<u64>("MARQUEE_DETAIL_TTL") {
            config.cache.detail_ttl = Duration::from_secs(seconds);
        }

        if let Some(seconds) = parse_env::<u64>("MARQUEE_STREAM_TTL") {
            config.cache.stream_ttl = Duration::from_secs(seconds);
        }

        if let Some(threshold) = parse_env::<f64>("MARQUEE_FUZZY_THRESHOLD") {
            config.matching.fuzzy_threshold = threshold;
        }

        if let Some(threshold) = parse_env::<f64>("MARQUEE_SEARCH_THRESHOLD") {
            config.matching.search_threshold = threshold;
        }

        if let Some(limit) = parse_env::<usize>("MARQUEE_SEARCH_LIMIT") {
            config.limits.search_limit = limit;
        }

        if let Some(limit) = parse_env::<usize>("MARQUEE_LISTING_LIMIT") {
            config.limits.listing_limit = limit;
        }

        if let Ok(path) = std::env::var("MARQUEE_SELECTORS_FILE")
            && !path.is_empty()
        {
            config.selectors_file = Some(PathBuf::from(path));
        }

        config
    }

    /// Creates a configuration for tests: short windows, no retries, no sweep.
    pub fn for_testing() -> Self {
        Self {
            upstream: UpstreamConfig {
                base_url: "https://catalog.test/".to_string(),
                request_timeout: Duration::from_secs(1),
                max_retries: 0,
                retry_base_delay: Duration::from_millis(1),
                retry_max_delay: Duration::from_millis(5),
                ..Default::default()
            },
            cache: CacheConfig {
                shards: 4,
                max_entries_per_shard: 32,
                sweep_interval: None,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Checks values the pipeline cannot work around at request time.
    ///
    /// # Errors
    ///
    /// - `MarqueeError::Configuration` - If the base URL is not an absolute
    ///   http(s) URL, a threshold lies outside `[0, 1]`, or a size is zero
    pub fn validate(&self) -> Result<()> {
        let base = url::Url::parse(&self.upstream.base_url).map_err(|e| {
            MarqueeError::Configuration {
                reason: format!("base URL '{}': {e}", self.upstream.base_url),
            }
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(MarqueeError::Configuration {
                reason: format!("base URL must be http(s), got '{}'", base.scheme()),
            });
        }
        if self.upstream.id_prefix.is_empty() {
            return Err(MarqueeError::Configuration {
                reason: "id prefix must not be empty".to_string(),
            });
        }

        for (name, value) in [
            ("fuzzy_threshold", self.matching.fuzzy_threshold),
            ("title_threshold", self.matching.title_threshold),
            ("search_threshold", self.matching.search_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(MarqueeError::Configuration {
                    reason: format!("{name} must be within [0, 1], got {value}"),
                });
            }
        }

        if self.cache.shards == 0 || self.cache.max_entries_per_shard == 0 {
            return Err(MarqueeError::Configuration {
                reason: "cache shards and per-shard capacity must be non-zero".to_string(),
            });
        }
        if self.limits.page_size == 0 {
            return Err(MarqueeError::Configuration {
                reason: "page size must be non-zero".to_string(),
            });
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn with_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}
