//! Test doubles for the scraper and fetcher seams.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::Scraper;
use super::fetch::PageFetcher;
use crate::errors::CatalogError;
use crate::types::{ContentDetail, ContentEntity, ContentKind, StreamLink};

/// Serves canned pages by exact URL; anything else answers 404.
#[derive(Debug, Default)]
pub struct StaticPageFetcher {
    pages: Mutex<HashMap<String, String>>,
    /// URL -> (error, remaining failures)
    failures: Mutex<HashMap<String, (CatalogError, usize)>>,
    fetches: Mutex<HashMap<String, usize>>,
}

impl StaticPageFetcher {
    /// An empty page set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `body` for `url`.
    pub fn insert(&self, url: &str, body: &str) {
        self.pages.lock().insert(url.to_string(), body.to_string());
    }

    /// Makes the next `times` fetches of `url` fail with `status`.
    pub fn fail_times(&self, url: &str, status: u16, times: usize) {
        let error = CatalogError::HttpStatus {
            url: url.to_string(),
            status,
        };
        self.fail_with(url, error, times);
    }

    /// Makes the next `times` fetches of `url` fail with `error`.
    pub fn fail_with(&self, url: &str, error: CatalogError, times: usize) {
        self.failures.lock().insert(url.to_string(), (error, times));
    }

    /// How many times `url` was requested.
    pub fn fetch_count(&self, url: &str) -> usize {
        self.fetches.lock().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl PageFetcher for StaticPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, CatalogError> {
        *self.fetches.lock().entry(url.to_string()).or_insert(0) += 1;

        if let Some((error, remaining)) = self.failures.lock().get_mut(url)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(error.clone());
        }

        self.pages
            .lock()
            .get(url)
            .cloned()
            .ok_or_else(|| CatalogError::HttpStatus {
                url: url.to_string(),
                status: 404,
            })
    }
}

/// Scraper returning configured values and counting calls.
#[derive(Debug, Default)]
pub struct MockScraper {
    listing: Mutex<Vec<ContentEntity>>,
    details: Mutex<HashMap<String, ContentDetail>>,
    streams: Mutex<HashMap<(String, Option<(u32, u32)>), Vec<StreamLink>>>,
    failure: Mutex<Option<CatalogError>>,
    /// (page, limit) of the most recent listing call
    last_page: Mutex<Option<(u32, usize)>>,
    /// Listing calls of any kind
    pub listing_calls: AtomicUsize,
    /// Detail fetches
    pub detail_calls: AtomicUsize,
    /// Stream fetches
    pub stream_calls: AtomicUsize,
}

impl MockScraper {
    /// A scraper with nothing configured; unknown details answer 404.
    pub fn new() -> Self {
        Self::default()
    }

    /// Listing returned by search, genre and popular calls.
    pub fn set_listing(&self, entities: Vec<ContentEntity>) {
        *self.listing.lock() = entities;
    }

    /// Detail returned for `source_url`.
    pub fn set_detail(&self, source_url: &str, detail: ContentDetail) {
        self.details.lock().insert(source_url.to_string(), detail);
    }

    /// Links returned for `source_url` and the given episode.
    pub fn set_streams(
        &self,
        source_url: &str,
        episode: Option<(u32, u32)>,
        links: Vec<StreamLink>,
    ) {
        self.streams
            .lock()
            .insert((source_url.to_string(), episode), links);
    }

    /// Every call fails with `error` until cleared with `None`.
    pub fn set_failure(&self, error: Option<CatalogError>) {
        *self.failure.lock() = error;
    }

    /// Page and limit of the most recent listing call.
    pub fn last_page(&self) -> Option<(u32, usize)> {
        *self.last_page.lock()
    }

    fn check_failure(&self) -> Result<(), CatalogError> {
        match self.failure.lock().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn listing(&self, page: u32, limit: usize) -> Result<Vec<ContentEntity>, CatalogError> {
        self.listing_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_page.lock() = Some((page, limit));
        self.check_failure()?;
        Ok(self.listing.lock().iter().take(limit).cloned().collect())
    }
}

#[async_trait]
impl Scraper for MockScraper {
    async fn search(
        &self,
        _kind: ContentKind,
        _query: &str,
        limit: usize,
    ) -> Result<Vec<ContentEntity>, CatalogError> {
        self.listing(1, limit)
    }

    async fn list_by_genre(
        &self,
        _kind: ContentKind,
        _genre: &str,
        page: u32,
        limit: usize,
    ) -> Result<Vec<ContentEntity>, CatalogError> {
        self.listing(page, limit)
    }

    async fn list_popular(
        &self,
        _kind: ContentKind,
        page: u32,
        limit: usize,
    ) -> Result<Vec<ContentEntity>, CatalogError> {
        self.listing(page, limit)
    }

    async fn fetch_detail(
        &self,
        _kind: ContentKind,
        source_url: &str,
    ) -> Result<ContentDetail, CatalogError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        self.details
            .lock()
            .get(source_url)
            .cloned()
            .ok_or_else(|| CatalogError::HttpStatus {
                url: source_url.to_string(),
                status: 404,
            })
    }

    async fn fetch_streams(
        &self,
        _kind: ContentKind,
        source_url: &str,
        episode: Option<(u32, u32)>,
    ) -> Result<Vec<StreamLink>, CatalogError> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        Ok(self
            .streams
            .lock()
            .get(&(source_url.to_string(), episode))
            .cloned()
            .unwrap_or_default())
    }
}
