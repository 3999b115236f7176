//! Markup-to-entity extraction.
//!
//! An [`Extractor`] is the compiled form of a [`SelectorTable`]. It works on
//! one node at a time; looping over a page's items and deciding what to do
//! with a failed item is the scraper's job.

pub mod fields;
pub mod rules;

use scraper::{ElementRef, Selector};
use url::Url;

pub use rules::{SelectorTable, Strategy};

use crate::errors::CatalogError;
use crate::types::{ContentDetail, ContentEntity, ContentKind, EpisodeRef, IdScheme, StreamLink};
use rules::{compile_selector, kind_selector};

struct CompiledListing {
    movie_items: Selector,
    series_items: Selector,
    movie_search_items: Selector,
    series_search_items: Selector,
    title: Vec<Strategy>,
    link: Vec<Strategy>,
    poster: Vec<Strategy>,
    year: Vec<Strategy>,
}

struct CompiledDetail {
    title: Vec<Strategy>,
    description: Vec<Strategy>,
    poster: Vec<Strategy>,
    year: Vec<Strategy>,
    rating: Vec<Strategy>,
    runtime: Vec<Strategy>,
    genres: Vec<Strategy>,
}

struct CompiledStreams {
    items: Selector,
    url: Vec<Strategy>,
    server: Vec<Strategy>,
}

struct CompiledEpisodes {
    items: Selector,
    link: Vec<Strategy>,
    title: Vec<Strategy>,
    season: Vec<Strategy>,
    episode: Vec<Strategy>,
    code: Vec<Strategy>,
}

/// Compiled extraction rules bound to one catalog's base URL and id scheme.
pub struct Extractor {
    base_url: Url,
    ids: IdScheme,
    listing: CompiledListing,
    detail: CompiledDetail,
    streams: CompiledStreams,
    episodes: CompiledEpisodes,
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("base_url", &self.base_url.as_str())
            .field("id_prefix", &self.ids.prefix())
            .finish_non_exhaustive()
    }
}

impl Extractor {
    /// Compiles `table` for the catalog at `base_url`.
    ///
    /// # Errors
    ///
    /// - `CatalogError::InvalidSelector` - If any selector in the table does not parse
    pub fn new(table: &SelectorTable, base_url: Url, ids: IdScheme) -> Result<Self, CatalogError> {
        let listing = &table.listing;
        let detail = &table.detail;
        let episodes = &table.episodes;

        Ok(Self {
            base_url,
            ids,
            listing: CompiledListing {
                movie_items: compile_selector(kind_selector(&listing.items, ContentKind::Movie))?,
                series_items: compile_selector(kind_selector(&listing.items, ContentKind::Series))?,
                movie_search_items: compile_selector(kind_selector(
                    &listing.search_items,
                    ContentKind::Movie,
                ))?,
                series_search_items: compile_selector(kind_selector(
                    &listing.search_items,
                    ContentKind::Series,
                ))?,
                title: Strategy::parse_all(&listing.title)?,
                link: Strategy::parse_all(&listing.link)?,
                poster: Strategy::parse_all(&listing.poster)?,
                year: Strategy::parse_all(&listing.year)?,
            },
            detail: CompiledDetail {
                title: Strategy::parse_all(&detail.title)?,
                description: Strategy::parse_all(&detail.description)?,
                poster: Strategy::parse_all(&detail.poster)?,
                year: Strategy::parse_all(&detail.year)?,
                rating: Strategy::parse_all(&detail.rating)?,
                runtime: Strategy::parse_all(&detail.runtime)?,
                genres: Strategy::parse_all(&detail.genres)?,
            },
            streams: CompiledStreams {
                items: compile_selector(&table.streams.items)?,
                url: Strategy::parse_all(&table.streams.url)?,
                server: Strategy::parse_all(&table.streams.server)?,
            },
            episodes: CompiledEpisodes {
                items: compile_selector(&episodes.items)?,
                link: Strategy::parse_all(&episodes.link)?,
                title: Strategy::parse_all(&episodes.title)?,
                season: Strategy::parse_all(&episodes.season)?,
                episode: Strategy::parse_all(&episodes.episode)?,
                code: Strategy::parse_all(&episodes.code)?,
            },
        })
    }

    /// Base URL relative links are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Scheme used to mint entity ids.
    pub fn ids(&self) -> &IdScheme {
        &self.ids
    }

    /// Container selector for items on a listing (or search results) page.
    pub fn listing_items(&self, kind: ContentKind, search: bool) -> &Selector {
        match (kind, search) {
            (ContentKind::Movie, false) => &self.listing.movie_items,
            (ContentKind::Series, false) => &self.listing.series_items,
            (ContentKind::Movie, true) => &self.listing.movie_search_items,
            (ContentKind::Series, true) => &self.listing.series_search_items,
        }
    }

    /// Container selector for server entries on a watch page.
    pub fn stream_items(&self) -> &Selector {
        &self.streams.items
    }

    /// Container selector for episode entries on a series page.
    pub fn episode_items(&self) -> &Selector {
        &self.episodes.items
    }

    /// Builds a listing entity from one item node.
    ///
    /// # Errors
    ///
    /// - `CatalogError::MissingField` - If the title or a usable link is absent
    pub fn entity(&self, node: ElementRef<'_>, kind: ContentKind) -> Result<ContentEntity, CatalogError> {
        let title = first_value(node, &self.listing.title)
            .ok_or(CatalogError::MissingField { field: "title" })?;
        let source_url = first_value(node, &self.listing.link)
            .and_then(|href| self.resolve_url(&href))
            .ok_or(CatalogError::MissingField { field: "link" })?;

        Ok(ContentEntity {
            kind,
            id: self.ids.entity_id(&source_url),
            title,
            poster_url: first_value(node, &self.listing.poster)
                .and_then(|src| self.resolve_url(&src)),
            year: first_value(node, &self.listing.year).and_then(|y| fields::parse_year(&y)),
            source_url,
        })
    }

    /// Builds title metadata from a detail page's root element.
    ///
    /// Only the title is mandatory; every other field that cannot be
    /// extracted is left empty. Episodes are filled in separately by
    /// [`Extractor::episode`].
    ///
    /// # Errors
    ///
    /// - `CatalogError::MissingField` - If the page carries no title
    pub fn detail(
        &self,
        root: ElementRef<'_>,
        kind: ContentKind,
        source_url: &str,
    ) -> Result<ContentDetail, CatalogError> {
        let rules = &self.detail;
        let title = first_value(root, &rules.title)
            .ok_or(CatalogError::MissingField { field: "title" })?;

        Ok(ContentDetail {
            entity: ContentEntity {
                kind,
                id: self.ids.entity_id(source_url),
                title,
                poster_url: first_value(root, &rules.poster).and_then(|src| self.resolve_url(&src)),
                year: first_value(root, &rules.year).and_then(|y| fields::parse_year(&y)),
                source_url: source_url.to_string(),
            },
            description: first_value(root, &rules.description),
            rating: first_value(root, &rules.rating).and_then(|r| fields::parse_rating(&r)),
            runtime_minutes: first_value(root, &rules.runtime)
                .and_then(|r| fields::parse_runtime(&r)),
            genres: all_values(root, &rules.genres),
            episodes: Vec::new(),
        })
    }

    /// Builds a stream link from one server entry.
    ///
    /// # Errors
    ///
    /// - `CatalogError::MissingField` - If the entry carries no usable URL
    pub fn stream(&self, node: ElementRef<'_>) -> Result<StreamLink, CatalogError> {
        let url = first_value(node, &self.streams.url)
            .and_then(|u| self.resolve_url(&u))
            .ok_or(CatalogError::MissingField { field: "url" })?;

        let server_name = first_value(node, &self.streams.server)
            .or_else(|| Url::parse(&url).ok()?.host_str().map(str::to_string))
            .unwrap_or_default();

        Ok(StreamLink {
            label: format!("📺 {server_name}"),
            url,
            server_name,
        })
    }

    /// Builds an episode reference from one entry on a series page.
    ///
    /// # Errors
    ///
    /// - `CatalogError::MissingField` - If the link or the season/episode
    ///   numbers cannot be found
    pub fn episode(&self, node: ElementRef<'_>) -> Result<EpisodeRef, CatalogError> {
        let rules = &self.episodes;

        let url = first_value(node, &rules.link)
            .and_then(|href| self.resolve_url(&href))
            .ok_or(CatalogError::MissingField { field: "link" })?;

        let explicit = first_value(node, &rules.season)
            .and_then(|s| fields::parse_number(&s))
            .zip(first_value(node, &rules.episode).and_then(|e| fields::parse_number(&e)));
        let (season, episode) = explicit
            .or_else(|| {
                rules
                    .code
                    .iter()
                    .flat_map(|strategy| strategy.values(node))
                    .find_map(|text| fields::parse_episode_code(&text))
            })
            .ok_or(CatalogError::MissingField { field: "episode" })?;

        Ok(EpisodeRef {
            season,
            episode,
            title: first_value(node, &rules.title),
            url,
        })
    }

    /// Resolves `href` against the base URL; only http(s) results are kept.
    fn resolve_url(&self, href: &str) -> Option<String> {
        let resolved = self.base_url.join(href.trim()).ok()?;
        matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
    }
}

/// First non-empty value across strategies, in strategy order.
fn first_value(node: ElementRef<'_>, strategies: &[Strategy]) -> Option<String> {
    strategies.iter().find_map(|s| s.first_value(node))
}

/// All values of the first strategy that finds any, de-duplicated in order.
fn all_values(node: ElementRef<'_>, strategies: &[Strategy]) -> Vec<String> {
    for strategy in strategies {
        let mut values: Vec<String> = Vec::new();
        for value in strategy.values(node) {
            if !values.contains(&value) {
                values.push(value);
            }
        }
        if !values.is_empty() {
            return values;
        }
    }
    Vec::new()
}
