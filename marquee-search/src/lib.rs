//! Marquee Search - Catalog resolution pipeline

#![deny(missing_docs)]
#![deny(clippy::missing_errors_doc)]
#![deny(clippy::missing_panics_doc)]
#![warn(clippy::too_many_lines)]
//!
//! Resolves free-text searches, catalog ids and season/episode pairs against
//! a third-party HTML catalog. Scraped markup is turned into typed entities,
//! matched by title similarity, and cached per kind with freshness windows
//! so repeated lookups skip the upstream.

pub mod cache;
pub mod envelope;
pub mod errors;
pub mod extract;
pub mod matcher;
pub mod normalize;
pub mod pipeline;
pub mod providers;
pub mod similarity;
pub mod types;

// Re-export main types
pub use cache::{CacheEntry, CacheStatistics, ResolutionCache};
pub use envelope::{
    CatalogRequest, CatalogResponse, MetaRequest, MetaResponse, StreamRequest, StreamResponse,
};
pub use errors::{CatalogError, ErrorCategory};
pub use extract::{Extractor, SelectorTable};
pub use matcher::{
    TITLE_MATCH_THRESHOLD, all_matches, all_matches_by, best_match, best_match_by, match_titles,
    match_titles_with, rank_search_results,
};
pub use normalize::normalize;
pub use pipeline::{PipelineCacheStatistics, ResolutionPipeline};
pub use providers::{HtmlScraper, HttpPageFetcher, PageFetcher, RetryPolicy, Scraper};
pub use similarity::{DEFAULT_FUZZY_THRESHOLD, edit_distance, fuzzy_match, similarity};
pub use types::{
    ContentDetail, ContentEntity, ContentKind, EpisodeRef, IdScheme, ResolutionKey, StreamLink,
};

/// Convenience type alias for Results with CatalogError.
pub type Result<T> = std::result::Result<T, CatalogError>;
