//! Resolution pipeline: cache lookup, scrape on miss, cache population.
//!
//! The three `resolve_*` operations are the front end's only entry points.
//! Their error boundary is explicit: validation failures are returned to the
//! caller, every other failure is logged and replaced by the empty envelope.

use std::sync::{Arc, Weak};
use std::time::Duration;

use marquee_core::{LimitsConfig, MarqueeConfig, MatchingConfig};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{CacheStatistics, ResolutionCache};
use crate::envelope::{
    CatalogRequest, CatalogResponse, MetaRequest, MetaResponse, StreamRequest, StreamResponse,
};
use crate::errors::{CatalogError, ErrorCategory};
use crate::matcher::rank_search_results;
use crate::normalize::normalize;
use crate::providers::{HtmlScraper, Scraper};
use crate::types::{ContentDetail, ContentEntity, ContentKind, IdScheme, ResolutionKey, StreamLink};

/// Statistics for each of the pipeline's caches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineCacheStatistics {
    /// Search and listing pages
    pub catalog: CacheStatistics,
    /// Title metadata
    pub detail: CacheStatistics,
    /// Playable links
    pub streams: CacheStatistics,
}

/// What a catalog request asks for, after trimming empty filters.
#[derive(Debug, Clone, Copy)]
enum CatalogQuery<'a> {
    Search(&'a str),
    Genre(&'a str),
    Popular,
}

/// Entry point for catalog, metadata and stream resolution.
///
/// `Send + Sync`; share it across tasks behind an `Arc`.
#[derive(Debug)]
pub struct ResolutionPipeline {
    scraper: Arc<dyn Scraper>,
    ids: IdScheme,
    catalog_cache: ResolutionCache<Vec<ContentEntity>>,
    detail_cache: ResolutionCache<ContentDetail>,
    stream_cache: ResolutionCache<Vec<StreamLink>>,
    matching: MatchingConfig,
    limits: LimitsConfig,
    sweep_interval: Option<Duration>,
}

impl ResolutionPipeline {
    /// Builds a pipeline over `scraper` with caches sized and timed by `config`.
    pub fn new(scraper: Arc<dyn Scraper>, config: &MarqueeConfig) -> Self {
        let cache = &config.cache;
        Self {
            scraper,
            ids: IdScheme::from_upstream(&config.upstream),
            catalog_cache: ResolutionCache::new("catalog", cache.catalog_ttl, cache),
            detail_cache: ResolutionCache::new("detail", cache.detail_ttl, cache),
            stream_cache: ResolutionCache::new("streams", cache.stream_ttl, cache),
            matching: config.matching.clone(),
            limits: config.limits.clone(),
            sweep_interval: cache.sweep_interval,
        }
    }

    /// Builds the production pipeline over the HTML scraper.
    ///
    /// # Errors
    ///
    /// - `MarqueeError::Configuration` - If the configuration fails validation
    ///   or the selector table does not compile
    /// - `MarqueeError::Io` - If the selector file cannot be read
    pub fn from_config(config: &MarqueeConfig) -> marquee_core::Result<Self> {
        config.validate()?;
        let scraper = HtmlScraper::from_config(config)?;
        Ok(Self::new(Arc::new(scraper), config))
    }

    /// Scheme the pipeline accepts ids under.
    pub fn ids(&self) -> &IdScheme {
        &self.ids
    }

    /// Resolves a catalog page: search results, a genre listing or the
    /// popular listing, in that order of precedence.
    ///
    /// # Errors
    ///
    /// - `CatalogError::InvalidKind` - If the kind is not `movie` or `series`
    pub async fn resolve_catalog(
        &self,
        request: &CatalogRequest,
    ) -> Result<CatalogResponse, CatalogError> {
        let kind: ContentKind = request.kind.parse()?;
        let max_age = self.catalog_cache.freshness_window();

        let query = match (non_blank(&request.search), non_blank(&request.genre)) {
            (Some(search), _) => CatalogQuery::Search(search),
            (None, Some(genre)) => CatalogQuery::Genre(genre),
            (None, None) => CatalogQuery::Popular,
        };

        // Search results are cached whole and paged locally; listings are
        // cached per requested window.
        let key = match query {
            CatalogQuery::Search(q) => format!("search:{}", normalize(q)),
            CatalogQuery::Genre(g) => format!("genre:{}@{}", normalize(g), request.skip),
            CatalogQuery::Popular => format!("popular@{}", request.skip),
        };
        let key = ResolutionKey::title(kind, key);

        let entities = match self.catalog_cache.get(&key) {
            Some(cached) => cached,
            None => {
                let fetched = match self.fetch_catalog(kind, &query, request.skip).await {
                    Ok(entities) => entities,
                    Err(e) => self.degrade("catalog", &key, e)?,
                };
                if !fetched.is_empty() {
                    self.catalog_cache.put(key.clone(), fetched.clone());
                }
                fetched
            }
        };

        let metas: Vec<ContentEntity> = match query {
            CatalogQuery::Search(_) => entities
                .into_iter()
                .skip(request.skip)
                .take(self.limits.search_limit)
                .collect(),
            _ => entities,
        };

        info!("Resolved catalog {} with {} entities", key, metas.len());
        Ok(CatalogResponse::new(metas, max_age))
    }

    async fn fetch_catalog(
        &self,
        kind: ContentKind,
        query: &CatalogQuery<'_>,
        skip: usize,
    ) -> Result<Vec<ContentEntity>, CatalogError> {
        let page_size = self.limits.page_size.max(1);
        let page = u32::try_from((skip / page_size).saturating_add(1)).unwrap_or(u32::MAX);
        let offset = skip % page_size;
        let limit = self.limits.listing_limit;
        let window = offset.saturating_add(limit);

        let listing = match query {
            CatalogQuery::Search(q) => {
                let hits = self.scraper.search(kind, q, self.limits.search_limit).await?;
                return Ok(rank_search_results(
                    q,
                    hits,
                    self.matching.search_threshold,
                ));
            }
            CatalogQuery::Genre(genre) => {
                self.scraper
                    .list_by_genre(kind, genre, page, window)
                    .await?
            }
            CatalogQuery::Popular => self.scraper.list_popular(kind, page, window).await?,
        };

        Ok(listing.into_iter().skip(offset).take(limit).collect())
    }

    /// Resolves full metadata for one title id.
    ///
    /// # Errors
    ///
    /// - `CatalogError::InvalidKind` - If the kind is not `movie` or `series`
    /// - `CatalogError::MissingIdentifier` - If the id is blank
    /// - `CatalogError::UnknownNamespace` - If the id is not one of ours
    pub async fn resolve_metadata(
        &self,
        request: &MetaRequest,
    ) -> Result<MetaResponse, CatalogError> {
        let kind: ContentKind = request.kind.parse()?;
        let source_url = self.ids.source_url(&request.id)?;
        let key = ResolutionKey::title(kind, request.id.trim());
        let max_age = self.detail_cache.freshness_window();

        if let Some(detail) = self.detail_cache.get(&key) {
            return Ok(MetaResponse::found(detail, max_age));
        }

        match self.scraper.fetch_detail(kind, source_url).await {
            Ok(detail) => {
                info!("Resolved metadata for {}: {}", key, detail.entity.title);
                self.detail_cache.put(key, detail.clone());
                Ok(MetaResponse::found(detail, max_age))
            }
            Err(e) => {
                self.degrade::<()>("metadata", &key, e)?;
                Ok(MetaResponse::empty())
            }
        }
    }

    /// Resolves playable links for a movie or one episode of a series.
    ///
    /// # Errors
    ///
    /// - `CatalogError::InvalidKind` - If the kind is not `movie` or `series`
    /// - `CatalogError::MissingIdentifier` - If the id is blank
    /// - `CatalogError::UnknownNamespace` - If the id is not one of ours
    /// - `CatalogError::InvalidEpisode` - If only one of season/episode is
    ///   given, or either is given for a movie
    pub async fn resolve_streams(
        &self,
        request: &StreamRequest,
    ) -> Result<StreamResponse, CatalogError> {
        let kind: ContentKind = request.kind.parse()?;
        let source_url = self.ids.source_url(&request.id)?;
        let episode = episode_coordinates(kind, request.season, request.episode)?;
        let id = request.id.trim();
        let key = match episode {
            Some((season, number)) => ResolutionKey::episode(kind, id, season, number),
            None => ResolutionKey::title(kind, id),
        };
        let max_age = self.stream_cache.freshness_window();

        if let Some(streams) = self.stream_cache.get(&key) {
            return Ok(StreamResponse::new(streams, max_age));
        }

        match self.scraper.fetch_streams(kind, source_url, episode).await {
            Ok(streams) => {
                info!("Resolved {} streams for {}", streams.len(), key);
                // An empty answer is not cached so a later call can still succeed.
                if !streams.is_empty() {
                    self.stream_cache.put(key, streams.clone());
                }
                Ok(StreamResponse::new(streams, max_age))
            }
            Err(e) => {
                self.degrade::<()>("streams", &key, e)?;
                Ok(StreamResponse::empty())
            }
        }
    }

    /// Maps a failure at the boundary: validation errors pass through,
    /// everything else becomes the empty value.
    fn degrade<T: Default>(
        &self,
        operation: &str,
        key: &ResolutionKey,
        error: CatalogError,
    ) -> Result<T, CatalogError> {
        match error.category() {
            ErrorCategory::Validation => Err(error),
            ErrorCategory::Transport | ErrorCategory::Extraction => {
                warn!("Degrading {} for {} to empty result: {}", operation, key, error);
                Ok(T::default())
            }
        }
    }

    /// Empties all three caches.
    pub fn clear_caches(&self) {
        self.catalog_cache.clear();
        self.detail_cache.clear();
        self.stream_cache.clear();
        info!("Resolution caches cleared");
    }

    /// Removes stale entries from all caches, returning how many went.
    pub fn purge_expired(&self) -> usize {
        self.catalog_cache.purge_expired()
            + self.detail_cache.purge_expired()
            + self.stream_cache.purge_expired()
    }

    /// Statistics for each of the three caches.
    pub fn cache_statistics(&self) -> PipelineCacheStatistics {
        PipelineCacheStatistics {
            catalog: self.catalog_cache.statistics(),
            detail: self.detail_cache.statistics(),
            streams: self.stream_cache.statistics(),
        }
    }

    /// Starts the sweeper at the configured interval, if one is set.
    pub fn spawn_configured_sweeper(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        self.sweep_interval
            .map(|interval| self.spawn_cache_sweeper(interval))
    }

    /// Starts a background task purging stale entries every `interval`.
    ///
    /// The task holds only a weak reference and exits once the pipeline is
    /// dropped.
    pub fn spawn_cache_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let pipeline: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(pipeline) = pipeline.upgrade() else {
                    break;
                };
                let removed = pipeline.purge_expired();
                if removed > 0 {
                    debug!("Cache sweep removed {} expired entries", removed);
                }
            }
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Validates season/episode coordinates against the kind.
fn episode_coordinates(
    kind: ContentKind,
    season: Option<u32>,
    episode: Option<u32>,
) -> Result<Option<(u32, u32)>, CatalogError> {
    match (season, episode) {
        (None, None) => Ok(None),
        (Some(_), Some(_)) if kind == ContentKind::Movie => Err(CatalogError::InvalidEpisode {
            reason: "movies have no episodes".to_string(),
        }),
        (Some(season), Some(episode)) => Ok(Some((season, episode))),
        _ => Err(CatalogError::InvalidEpisode {
            reason: "season and episode must be given together".to_string(),
        }),
    }
}
