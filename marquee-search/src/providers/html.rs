//! HTML catalog scraper.
//!
//! Fetches listing, detail and watch pages through a [`PageFetcher`] and runs
//! the [`Extractor`] over every matching node. Parsed documents never live
//! across an `.await`: each page is fetched first, then handed to a
//! synchronous parse step.

use async_trait::async_trait;
use marquee_core::{MarqueeConfig, MarqueeError};
use scraper::Html;
use tracing::{debug, warn};
use url::Url;

use super::Scraper;
use super::fetch::{HttpPageFetcher, PageFetcher, RetryPolicy, RetryingFetcher};
use crate::errors::CatalogError;
use crate::extract::{Extractor, SelectorTable};
use crate::normalize::normalize;
use crate::types::{ContentDetail, ContentEntity, ContentKind, EpisodeRef, IdScheme, StreamLink};

/// Upstream URL layout, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlLayout {
    /// Popular movie listing
    pub movie_listing: String,
    /// Popular series listing
    pub series_listing: String,
    /// Genre listings live at `<genre_listing><slug>/`
    pub genre_listing: String,
    /// Pages past the first live at `<listing><page_segment><n>/`
    pub page_segment: String,
    /// Appended to the search query string for series
    pub series_search_suffix: String,
}

impl Default for UrlLayout {
    fn default() -> Self {
        Self {
            movie_listing: "peliculas/".to_string(),
            series_listing: "series/".to_string(),
            genre_listing: "genero/".to_string(),
            page_segment: "page/".to_string(),
            series_search_suffix: "&type=tv".to_string(),
        }
    }
}

/// Scraper for an HTML catalog site.
#[derive(Debug)]
pub struct HtmlScraper<F> {
    fetcher: F,
    extractor: Extractor,
    layout: UrlLayout,
}

impl HtmlScraper<RetryingFetcher<HttpPageFetcher>> {
    /// Builds the production scraper: reqwest fetcher with retries and the
    /// selector table from `config.selectors_file` (built-in table if unset).
    ///
    /// # Errors
    ///
    /// - `MarqueeError::Configuration` - If the base URL, a selector or the
    ///   HTTP client is invalid
    /// - `MarqueeError::Io` - If the selector file cannot be read
    pub fn from_config(config: &MarqueeConfig) -> marquee_core::Result<Self> {
        let table = match &config.selectors_file {
            Some(path) => SelectorTable::from_json_file(path)?,
            None => SelectorTable::default(),
        };

        let base_url = Url::parse(&config.upstream.base_url).map_err(|e| {
            MarqueeError::Configuration {
                reason: format!("base URL '{}': {e}", config.upstream.base_url),
            }
        })?;

        let extractor = Extractor::new(
            &table,
            base_url,
            IdScheme::from_upstream(&config.upstream),
        )
        .map_err(|e| MarqueeError::Configuration {
            reason: e.to_string(),
        })?;

        let fetcher = RetryingFetcher::new(
            HttpPageFetcher::new(&config.upstream)?,
            RetryPolicy::from_config(&config.upstream),
        );

        Ok(Self::new(fetcher, extractor))
    }
}

impl<F: PageFetcher> HtmlScraper<F> {
    /// Scraper over `fetcher`, extracting with `extractor` under the default layout.
    pub fn new(fetcher: F, extractor: Extractor) -> Self {
        Self {
            fetcher,
            extractor,
            layout: UrlLayout::default(),
        }
    }

    /// Replaces the URL layout.
    pub fn with_layout(mut self, layout: UrlLayout) -> Self {
        self.layout = layout;
        self
    }

    /// The underlying page fetcher.
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Scheme used to mint entity ids.
    pub fn ids(&self) -> &IdScheme {
        self.extractor.ids()
    }

    fn search_url(&self, kind: ContentKind, query: &str) -> String {
        let suffix = match kind {
            ContentKind::Movie => "",
            ContentKind::Series => self.layout.series_search_suffix.as_str(),
        };
        format!(
            "{}?s={}{}",
            self.extractor.base_url(),
            urlencoding::encode(query.trim()),
            suffix
        )
    }

    fn popular_url(&self, kind: ContentKind, page: u32) -> String {
        let listing = match kind {
            ContentKind::Movie => &self.layout.movie_listing,
            ContentKind::Series => &self.layout.series_listing,
        };
        self.paged(format!("{}{listing}", self.extractor.base_url()), page)
    }

    fn genre_url(&self, genre: &str, page: u32) -> String {
        self.paged(
            format!(
                "{}{}{}/",
                self.extractor.base_url(),
                self.layout.genre_listing,
                genre_slug(genre)
            ),
            page,
        )
    }

    fn paged(&self, listing_url: String, page: u32) -> String {
        if page > 1 {
            format!("{listing_url}{}{page}/", self.layout.page_segment)
        } else {
            listing_url
        }
    }

    async fn fetch_listing(
        &self,
        url: &str,
        kind: ContentKind,
        search: bool,
        limit: usize,
    ) -> Result<Vec<ContentEntity>, CatalogError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let body = self.fetcher.fetch(url).await?;
        let entities = self.parse_listing(&body, kind, search, limit);
        debug!("Extracted {} {} entities from {}", entities.len(), kind, url);
        Ok(entities)
    }

    fn parse_listing(
        &self,
        body: &str,
        kind: ContentKind,
        search: bool,
        limit: usize,
    ) -> Vec<ContentEntity> {
        let document = Html::parse_document(body);
        let mut entities: Vec<ContentEntity> = Vec::new();

        for node in document.select(self.extractor.listing_items(kind, search)) {
            if entities.len() >= limit {
                break;
            }
            match self.extractor.entity(node, kind) {
                // Nested containers can match twice; keep the outermost.
                Ok(entity) if entities.iter().any(|e| e.id == entity.id) => {}
                Ok(entity) => entities.push(entity),
                Err(e) => warn!("Dropping {} listing item: {}", kind, e),
            }
        }

        entities
    }

    fn parse_detail(
        &self,
        body: &str,
        kind: ContentKind,
        source_url: &str,
    ) -> Result<ContentDetail, CatalogError> {
        let document = Html::parse_document(body);
        let mut detail = self
            .extractor
            .detail(document.root_element(), kind, source_url)?;

        if kind == ContentKind::Series {
            detail.episodes = self.episodes_in(&document);
        }
        Ok(detail)
    }

    fn parse_episodes(&self, body: &str) -> Vec<EpisodeRef> {
        self.episodes_in(&Html::parse_document(body))
    }

    fn episodes_in(&self, document: &Html) -> Vec<EpisodeRef> {
        let mut episodes: Vec<EpisodeRef> = Vec::new();
        for node in document.select(self.extractor.episode_items()) {
            match self.extractor.episode(node) {
                Ok(ep)
                    if episodes
                        .iter()
                        .any(|e| (e.season, e.episode) == (ep.season, ep.episode)) => {}
                Ok(ep) => episodes.push(ep),
                Err(e) => warn!("Dropping episode entry: {}", e),
            }
        }
        episodes
    }

    fn parse_streams(&self, body: &str) -> Vec<StreamLink> {
        let document = Html::parse_document(body);
        let mut streams: Vec<StreamLink> = Vec::new();
        for node in document.select(self.extractor.stream_items()) {
            match self.extractor.stream(node) {
                Ok(link) if streams.iter().any(|s| s.url == link.url) => {}
                Ok(link) => streams.push(link),
                Err(e) => warn!("Dropping stream entry: {}", e),
            }
        }
        streams
    }
}

#[async_trait]
impl<F: PageFetcher> Scraper for HtmlScraper<F> {
    async fn search(
        &self,
        kind: ContentKind,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ContentEntity>, CatalogError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let url = self.search_url(kind, query);
        self.fetch_listing(&url, kind, true, limit).await
    }

    async fn list_by_genre(
        &self,
        kind: ContentKind,
        genre: &str,
        page: u32,
        limit: usize,
    ) -> Result<Vec<ContentEntity>, CatalogError> {
        let url = self.genre_url(genre, page);
        self.fetch_listing(&url, kind, false, limit).await
    }

    async fn list_popular(
        &self,
        kind: ContentKind,
        page: u32,
        limit: usize,
    ) -> Result<Vec<ContentEntity>, CatalogError> {
        let url = self.popular_url(kind, page);
        self.fetch_listing(&url, kind, false, limit).await
    }

    async fn fetch_detail(
        &self,
        kind: ContentKind,
        source_url: &str,
    ) -> Result<ContentDetail, CatalogError> {
        let body = self.fetcher.fetch(source_url).await?;
        self.parse_detail(&body, kind, source_url)
    }

    async fn fetch_streams(
        &self,
        _kind: ContentKind,
        source_url: &str,
        episode: Option<(u32, u32)>,
    ) -> Result<Vec<StreamLink>, CatalogError> {
        let watch_url = match episode {
            None => source_url.to_string(),
            Some((season, number)) => {
                let body = self.fetcher.fetch(source_url).await?;
                let found = self
                    .parse_episodes(&body)
                    .into_iter()
                    .find(|e| e.season == season && e.episode == number);
                match found {
                    Some(ep) => ep.url,
                    None => {
                        debug!("No S{season}E{number} listed on {source_url}");
                        return Ok(Vec::new());
                    }
                }
            }
        };

        let body = self.fetcher.fetch(&watch_url).await?;
        Ok(self.parse_streams(&body))
    }
}

/// URL slug for a genre name: `"Ciencia Ficción"` becomes `"ciencia-ficcion"`.
pub fn genre_slug(genre: &str) -> String {
    normalize(genre)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::StaticPageFetcher;

    const BASE: &str = "https://catalog.test/";

    fn scraper(pages: StaticPageFetcher) -> HtmlScraper<StaticPageFetcher> {
        let extractor = Extractor::new(
            &SelectorTable::default(),
            Url::parse(BASE).unwrap(),
            IdScheme::new("cuevanap_"),
        )
        .unwrap();
        HtmlScraper::new(pages, extractor)
    }

    fn listing_page(titles: &[Option<&str>]) -> String {
        let items: String = titles
            .iter()
            .enumerate()
            .map(|(i, title)| {
                let heading = title.map(|t| format!("<h2>{t}</h2>")).unwrap_or_default();
                format!(
                    r#"<div class="movie-item"><a href="/pelicula/{i}"><img src="/p/{i}.jpg"></a>{heading}</div>"#
                )
            })
            .collect();
        format!("<html><body><section>{items}</section></body></html>")
    }

    #[test]
    fn test_url_layout() {
        let scraper = scraper(StaticPageFetcher::new());

        assert_eq!(
            scraper.search_url(ContentKind::Movie, " dune part two "),
            "https://catalog.test/?s=dune%20part%20two"
        );
        assert_eq!(
            scraper.search_url(ContentKind::Series, "dark"),
            "https://catalog.test/?s=dark&type=tv"
        );
        assert_eq!(
            scraper.popular_url(ContentKind::Series, 1),
            "https://catalog.test/series/"
        );
        assert_eq!(
            scraper.popular_url(ContentKind::Movie, 3),
            "https://catalog.test/peliculas/page/3/"
        );
        assert_eq!(
            scraper.genre_url("Ciencia Ficción", 2),
            "https://catalog.test/genero/ciencia-ficcion/page/2/"
        );
    }

    #[tokio::test]
    async fn test_listing_drops_items_missing_title() {
        let pages = StaticPageFetcher::new();
        pages.insert(
            "https://catalog.test/peliculas/",
            &listing_page(&[Some("A"), Some("B"), None, Some("D"), Some("E")]),
        );
        let scraper = scraper(pages);

        let entities = scraper
            .list_popular(ContentKind::Movie, 1, 30)
            .await
            .unwrap();

        let titles: Vec<&str> = entities.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "D", "E"]);
        assert_eq!(entities[0].id, "cuevanap_https://catalog.test/pelicula/0");
    }

    #[tokio::test]
    async fn test_listing_respects_limit() {
        let pages = StaticPageFetcher::new();
        pages.insert(
            "https://catalog.test/?s=a",
            &listing_page(&[Some("A1"), Some("A2"), Some("A3")]),
        );
        let scraper = scraper(pages);

        let entities = scraper.search(ContentKind::Movie, "a", 2).await.unwrap();
        assert_eq!(entities.len(), 2);

        let none = scraper.search(ContentKind::Movie, "   ", 2).await.unwrap();
        assert!(none.is_empty());
        assert_eq!(scraper.fetcher().fetch_count("https://catalog.test/?s="), 0);
    }

    #[tokio::test]
    async fn test_search_does_not_duplicate_nested_matches() {
        let pages = StaticPageFetcher::new();
        pages.insert(
            "https://catalog.test/?s=dune",
            r#"<article><div class="movie-item"><a href="/pelicula/dune">
                 <h2>Dune</h2></a></div></article>"#,
        );
        let scraper = scraper(pages);

        let entities = scraper.search(ContentKind::Movie, "dune", 20).await.unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].title, "Dune");
    }

    #[tokio::test]
    async fn test_series_detail_lists_episodes() {
        let pages = StaticPageFetcher::new();
        pages.insert(
            "https://catalog.test/serie/dark",
            r#"<html><body><h1>Dark</h1><span class="year">2017</span>
                 <ul>
                   <li class="episode-item"><a href="/serie/dark/1x1">1x01</a></li>
                   <li class="episode-item"><a href="/serie/dark/1x2">1x02</a></li>
                   <li class="episode-item"><a href="/serie/dark/1x2-alt">1x02</a></li>
                 </ul></body></html>"#,
        );
        let scraper = scraper(pages);

        let detail = scraper
            .fetch_detail(ContentKind::Series, "https://catalog.test/serie/dark")
            .await
            .unwrap();

        assert_eq!(detail.entity.title, "Dark");
        assert_eq!(detail.entity.year, Some(2017));
        assert_eq!(detail.episodes.len(), 2);
        assert_eq!(detail.episodes[1].url, "https://catalog.test/serie/dark/1x2");
    }

    #[tokio::test]
    async fn test_untitled_detail_page_is_an_extraction_failure() {
        let pages = StaticPageFetcher::new();
        pages.insert(
            "https://catalog.test/pelicula/dune",
            "<html><body><p>Checking your browser...</p></body></html>",
        );
        let scraper = scraper(pages);

        let result = scraper
            .fetch_detail(ContentKind::Movie, "https://catalog.test/pelicula/dune")
            .await;

        assert!(matches!(result, Err(CatalogError::MissingField { field: "title" })));
    }

    #[tokio::test]
    async fn test_episode_streams_follow_episode_page() {
        let pages = StaticPageFetcher::new();
        pages.insert(
            "https://catalog.test/serie/dark",
            r#"<li class="episode-item"><a href="/serie/dark/1x1">1x01</a></li>
               <li class="episode-item"><a href="/serie/dark/1x2">1x02</a></li>"#,
        );
        pages.insert(
            "https://catalog.test/serie/dark/1x2",
            r#"<a class="server-item" href="https://player.test/e/12">Player</a>
               <a class="server-item" href="https://player.test/e/12">Player</a>
               <span class="server-item">no link</span>"#,
        );
        let scraper = scraper(pages);

        let streams = scraper
            .fetch_streams(
                ContentKind::Series,
                "https://catalog.test/serie/dark",
                Some((1, 2)),
            )
            .await
            .unwrap();
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].label, "📺 Player");

        let missing = scraper
            .fetch_streams(
                ContentKind::Series,
                "https://catalog.test/serie/dark",
                Some((4, 1)),
            )
            .await
            .unwrap();
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_is_returned() {
        let scraper = scraper(StaticPageFetcher::new());

        let result = scraper
            .fetch_streams(ContentKind::Movie, "https://catalog.test/pelicula/x", None)
            .await;
        assert!(matches!(result, Err(CatalogError::HttpStatus { status: 404, .. })));
    }

    #[test]
    fn test_genre_slug() {
        assert_eq!(genre_slug("Acción"), "accion");
        assert_eq!(genre_slug("  Ciencia  Ficción "), "ciencia-ficcion");
        assert_eq!(genre_slug("Sci-Fi & Fantasy"), "sci-fi-fantasy");
    }

    #[test]
    fn test_from_config_rejects_bad_base_url() {
        let mut config = MarqueeConfig::for_testing();
        config.upstream.base_url = "not a url".to_string();
        let err = HtmlScraper::from_config(&config).unwrap_err();
        assert!(err.is_user_error());
    }
}
