//! Declarative extraction table.
//!
//! Each field lists lookup strategies in preference order; the first one that
//! yields a non-empty value wins. A strategy is written as:
//!
//! - `css` - trimmed text of the first matching descendant with text
//! - `css@attr` - attribute of the first matching descendant carrying it
//! - `@attr` - attribute of the item node itself
//! - `.` - text of the item node itself
//!
//! The table is plain data: it deserializes from JSON, and any field left
//! out keeps its built-in default, so an upstream markup change is a config
//! edit rather than a code change.

use std::path::Path;

use marquee_core::MarqueeError;
use scraper::{ElementRef, Selector};
use serde::{Deserialize, Serialize};

use crate::errors::CatalogError;
use crate::types::ContentKind;

/// Container selectors, one per content kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KindSelectors {
    /// Selector for movie items
    pub movie: String,
    /// Selector for series items
    pub series: String,
}

impl KindSelectors {
    fn new(movie: &str, series: &str) -> Self {
        Self {
            movie: movie.to_string(),
            series: series.to_string(),
        }
    }
}

/// Rules for one item on a popular, genre or search listing page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingRules {
    /// Item containers on popular and genre listings
    pub items: KindSelectors,
    /// Item containers on search results
    pub search_items: KindSelectors,
    /// Title, mandatory
    pub title: Vec<String>,
    /// Link to the detail page, mandatory
    pub link: Vec<String>,
    /// Poster image
    pub poster: Vec<String>,
    /// Release year
    pub year: Vec<String>,
}

impl Default for ListingRules {
    fn default() -> Self {
        Self {
            items: KindSelectors::new(".movie-item, .film-item", ".series-item, .tv-item"),
            search_items: KindSelectors::new(
                ".movie-item, .film-item, article",
                ".series-item, .tv-item, article",
            ),
            title: strategies(&["h2", ".title", ".name"]),
            link: strategies(&["a@href", "@href"]),
            poster: strategies(&["img@src", "img@data-src"]),
            year: strategies(&[".year", ".date"]),
        }
    }
}

/// Rules for a title's detail page, applied to the whole document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailRules {
    /// Title, mandatory
    pub title: Vec<String>,
    /// Synopsis
    pub description: Vec<String>,
    /// Poster image
    pub poster: Vec<String>,
    /// Release year
    pub year: Vec<String>,
    /// Rating on a 0-10 scale
    pub rating: Vec<String>,
    /// Runtime text such as `2h 10m`
    pub runtime: Vec<String>,
    /// Genre names, all matches kept
    pub genres: Vec<String>,
}

impl Default for DetailRules {
    fn default() -> Self {
        Self {
            title: strategies(&["h1", ".title", ".movie-title"]),
            description: strategies(&[".description", ".synopsis", ".plot", "p"]),
            poster: strategies(&[
                "img.poster@src",
                "img.poster@data-src",
                "img.thumbnail@src",
                "img.thumbnail@data-src",
            ]),
            year: strategies(&[".year", ".release-year"]),
            rating: strategies(&["[data-rating]@data-rating", ".rating", ".score"]),
            runtime: strategies(&[".runtime", ".duration"]),
            genres: strategies(&[".genre", ".tag", "[data-genre]"]),
        }
    }
}

/// Rules for one video-server entry on a watch page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamRules {
    /// Server entry containers
    pub items: String,
    /// Playable URL, mandatory
    pub url: Vec<String>,
    /// Server name shown in the label
    pub server: Vec<String>,
}

impl Default for StreamRules {
    fn default() -> Self {
        Self {
            items: ".server-item, .stream-link, .player-link".to_string(),
            url: strategies(&["@href", "@data-url", "a@href", "iframe@src"]),
            server: strategies(&[".server-name", "."]),
        }
    }
}

/// Rules for one episode entry on a series page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EpisodeRules {
    /// Episode entry containers
    pub items: String,
    /// Link to the episode's watch page, mandatory
    pub link: Vec<String>,
    /// Episode title
    pub title: Vec<String>,
    /// Season number
    pub season: Vec<String>,
    /// Episode number within the season
    pub episode: Vec<String>,
    /// Text carrying both numbers, e.g. `S01E03` or `1x03`
    pub code: Vec<String>,
}

impl Default for EpisodeRules {
    fn default() -> Self {
        Self {
            items: ".episode-item, .episodio, li[data-episode]".to_string(),
            link: strategies(&["a@href", "@href"]),
            title: strategies(&[".episode-title", ".title", "h3"]),
            season: strategies(&["@data-season"]),
            episode: strategies(&["@data-episode"]),
            code: strategies(&[".episode-number", ".num", "a", "."]),
        }
    }
}

/// The full extraction table for one upstream catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorTable {
    /// Listing page rules
    pub listing: ListingRules,
    /// Detail page rules
    pub detail: DetailRules,
    /// Watch page rules
    pub streams: StreamRules,
    /// Series episode list rules
    pub episodes: EpisodeRules,
}

impl SelectorTable {
    /// Loads a table from a JSON file; omitted sections keep their defaults.
    ///
    /// # Errors
    ///
    /// - `MarqueeError::Io` - If the file cannot be read
    /// - `MarqueeError::Configuration` - If the file is not a valid table
    pub fn from_json_file(path: &Path) -> marquee_core::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| MarqueeError::Configuration {
            reason: format!("selector table {}: {e}", path.display()),
        })
    }
}

fn strategies(notations: &[&str]) -> Vec<String> {
    notations.iter().map(|s| (*s).to_string()).collect()
}

/// One compiled lookup strategy.
#[derive(Debug, Clone)]
pub struct Strategy {
    /// `None` targets the item node itself
    selector: Option<Selector>,
    /// `None` reads text instead of an attribute
    attr: Option<String>,
}

impl Strategy {
    /// Compiles a strategy written in the table notation.
    ///
    /// # Errors
    ///
    /// - `CatalogError::InvalidSelector` - If the CSS part does not parse
    pub fn parse(notation: &str) -> Result<Self, CatalogError> {
        let notation = notation.trim();
        if notation == "." {
            return Ok(Self {
                selector: None,
                attr: None,
            });
        }

        // '@' can also appear inside an attribute selector value, so only a
        // trailing bare name counts as the attribute part.
        let (css, attr) = match notation.rsplit_once('@') {
            Some((css, attr)) if is_attribute_name(attr) => (css.trim(), Some(attr.to_string())),
            _ => (notation, None),
        };

        let selector = if css.is_empty() {
            None
        } else {
            Some(compile_selector(css)?)
        };

        if selector.is_none() && attr.is_none() {
            return Err(CatalogError::InvalidSelector {
                selector: notation.to_string(),
                reason: "empty strategy".to_string(),
            });
        }

        Ok(Self { selector, attr })
    }

    /// Compiles an ordered strategy list.
    ///
    /// # Errors
    ///
    /// - `CatalogError::InvalidSelector` - If any entry fails to compile
    pub fn parse_all(notations: &[String]) -> Result<Vec<Self>, CatalogError> {
        notations.iter().map(|s| Self::parse(s)).collect()
    }

    /// Every non-empty value this strategy finds under `node`, in document order.
    pub fn values<'a>(&'a self, node: ElementRef<'a>) -> Box<dyn Iterator<Item = String> + 'a> {
        match &self.selector {
            Some(selector) => Box::new(
                node.select(selector)
                    .filter_map(move |target| self.read(target)),
            ),
            None => Box::new(self.read(node).into_iter()),
        }
    }

    /// First non-empty value this strategy finds under `node`.
    pub fn first_value(&self, node: ElementRef<'_>) -> Option<String> {
        self.values(node).next()
    }

    fn read(&self, target: ElementRef<'_>) -> Option<String> {
        let value = match &self.attr {
            Some(attr) => target.value().attr(attr)?.trim().to_string(),
            None => element_text(target),
        };
        (!value.is_empty()).then_some(value)
    }
}

/// Compiles a container selector.
///
/// # Errors
///
/// - `CatalogError::InvalidSelector` - If `css` does not parse
pub fn compile_selector(css: &str) -> Result<Selector, CatalogError> {
    Selector::parse(css).map_err(|e| CatalogError::InvalidSelector {
        selector: css.to_string(),
        reason: format!("{e:?}"),
    })
}

/// Picks the container selector for a kind.
pub fn kind_selector<'a>(selectors: &'a KindSelectors, kind: ContentKind) -> &'a str {
    match kind {
        ContentKind::Movie => &selectors.movie,
        ContentKind::Series => &selectors.series,
    }
}

/// All text under an element with whitespace runs collapsed.
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn first(html: &str, notation: &str) -> Option<String> {
        let fragment = Html::parse_fragment(html);
        let strategy = Strategy::parse(notation).unwrap();
        strategy.first_value(fragment.root_element())
    }

    #[test]
    fn test_text_and_attribute_strategies() {
        let html = r#"<div><h2>  Dune  <small>Part Two</small></h2><img data-src="/p.jpg"></div>"#;

        assert_eq!(first(html, "h2"), Some("Dune Part Two".to_string()));
        assert_eq!(first(html, "img@data-src"), Some("/p.jpg".to_string()));
        assert_eq!(first(html, "img@src"), None);
        assert_eq!(first(html, ".missing"), None);
    }

    #[test]
    fn test_skips_empty_matches() {
        let html = r#"<div><p> </p><p>Second paragraph</p></div>"#;
        assert_eq!(first(html, "p"), Some("Second paragraph".to_string()));
    }

    #[test]
    fn test_attribute_selector_containing_at_sign() {
        let strategy = Strategy::parse("a[title='a@b']").unwrap();
        assert!(strategy.attr.is_none());
        assert!(strategy.selector.is_some());

        let strategy = Strategy::parse("a[title='a@b']@href").unwrap();
        assert_eq!(strategy.attr.as_deref(), Some("href"));
    }

    #[test]
    fn test_invalid_strategies() {
        assert!(matches!(
            Strategy::parse("div[[["),
            Err(CatalogError::InvalidSelector { .. })
        ));
        assert!(matches!(
            Strategy::parse("   "),
            Err(CatalogError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn test_default_table_compiles() {
        let table = SelectorTable::default();
        for notations in [
            &table.listing.title,
            &table.listing.link,
            &table.listing.poster,
            &table.detail.genres,
            &table.streams.url,
            &table.episodes.code,
        ] {
            assert!(Strategy::parse_all(notations).is_ok());
        }
        assert!(compile_selector(&table.listing.items.movie).is_ok());
        assert!(compile_selector(&table.streams.items).is_ok());
        assert!(compile_selector(&table.episodes.items).is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selectors.json");
        std::fs::write(&path, r#"{ "listing": { "title": [".card-title"] } }"#).unwrap();

        let table = SelectorTable::from_json_file(&path).unwrap();
        assert_eq!(table.listing.title, vec![".card-title".to_string()]);
        assert_eq!(table.listing.link, ListingRules::default().link);
        assert_eq!(table.streams.items, StreamRules::default().items);
    }

    #[test]
    fn test_bad_json_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selectors.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = SelectorTable::from_json_file(&path).unwrap_err();
        assert!(err.is_user_error());

        let missing = SelectorTable::from_json_file(&dir.path().join("absent.json"));
        assert!(matches!(missing, Err(MarqueeError::Io(_))));
    }
}
