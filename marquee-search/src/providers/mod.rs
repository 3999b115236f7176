//! Scraper implementations for upstream catalogs.

use async_trait::async_trait;

use crate::errors::CatalogError;
use crate::types::{ContentDetail, ContentEntity, ContentKind, StreamLink};

pub mod fetch;
pub mod html;
#[cfg(test)]
pub mod mock;

pub use fetch::{HttpPageFetcher, PageFetcher, RetryPolicy, RetryingFetcher};
pub use html::{HtmlScraper, UrlLayout};
#[cfg(test)]
pub use mock::{MockScraper, StaticPageFetcher};

/// Trait for upstream catalog scrapers.
///
/// Implementations fetch pages and turn them into entities. Items that fail
/// extraction are dropped inside the implementation; only whole-call
/// failures (the page itself could not be fetched) surface as errors.
#[async_trait]
pub trait Scraper: Send + Sync + std::fmt::Debug {
    /// Free-text search, at most `limit` results in upstream order.
    ///
    /// # Errors
    /// - `CatalogError::Timeout` / `ConnectionFailed` / `HttpStatus` /
    ///   `TransportFailed` - The results page could not be fetched
    async fn search(
        &self,
        kind: ContentKind,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ContentEntity>, CatalogError>;

    /// One page of a genre listing (pages are 1-based).
    ///
    /// # Errors
    /// - Transport errors as for [`Scraper::search`]
    async fn list_by_genre(
        &self,
        kind: ContentKind,
        genre: &str,
        page: u32,
        limit: usize,
    ) -> Result<Vec<ContentEntity>, CatalogError>;

    /// One page of the popular listing (pages are 1-based).
    ///
    /// # Errors
    /// - Transport errors as for [`Scraper::search`]
    async fn list_popular(
        &self,
        kind: ContentKind,
        page: u32,
        limit: usize,
    ) -> Result<Vec<ContentEntity>, CatalogError>;

    /// Metadata from a title's detail page.
    ///
    /// # Errors
    /// - Transport errors as for [`Scraper::search`]
    /// - `CatalogError::MissingField` - The page carries no title, as with an
    ///   interstitial or challenge page
    async fn fetch_detail(
        &self,
        kind: ContentKind,
        source_url: &str,
    ) -> Result<ContentDetail, CatalogError>;

    /// Playable links for a movie, or for one episode when `episode` is
    /// `Some((season, episode))`.
    ///
    /// # Errors
    /// - Transport errors as for [`Scraper::search`]
    async fn fetch_streams(
        &self,
        kind: ContentKind,
        source_url: &str,
        episode: Option<(u32, u32)>,
    ) -> Result<Vec<StreamLink>, CatalogError>;
}
