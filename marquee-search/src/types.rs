//! Data types for catalog resolution.

use std::fmt;
use std::str::FromStr;

use marquee_core::UpstreamConfig;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::CatalogError;

/// Content category served by the catalog.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// A feature film
    Movie,
    /// A show made of seasons and episodes
    Series,
}

impl ContentKind {
    /// Lowercase name used on the wire and in cache keys.
    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Movie => "movie",
            ContentKind::Series => "series",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "movie" => Ok(ContentKind::Movie),
            "series" => Ok(ContentKind::Series),
            _ => Err(CatalogError::InvalidKind {
                kind: s.to_string(),
            }),
        }
    }
}

/// A catalog item as it appears in a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentEntity {
    /// Whether the item is a movie or a series
    pub kind: ContentKind,
    /// Namespace prefix followed by `source_url`
    pub id: String,
    /// Display title
    pub title: String,
    /// Absolute poster image URL
    pub poster_url: Option<String>,
    /// Release year
    pub year: Option<u16>,
    /// Absolute URL of the item's detail page
    pub source_url: String,
}

/// Full metadata for one title. Every field past the entity is best-effort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDetail {
    /// The title as it appears in listings
    #[serde(flatten)]
    pub entity: ContentEntity,
    /// Synopsis
    pub description: Option<String>,
    /// Rating on a 0-10 scale
    pub rating: Option<f32>,
    /// Running time of a movie
    pub runtime_minutes: Option<u32>,
    /// Genre names in page order
    pub genres: Vec<String>,
    /// Episode pages listed on a series page; empty for movies
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub episodes: Vec<EpisodeRef>,
}

/// One episode link discovered on a series page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeRef {
    /// Season number
    pub season: u32,
    /// Episode number within the season
    pub episode: u32,
    /// Episode title, when listed
    pub title: Option<String>,
    /// Absolute URL of the episode's watch page
    pub url: String,
}

/// A playable link offered by one of the upstream's video servers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamLink {
    /// Playable URL
    pub url: String,
    /// Display title shown by the front end
    pub label: String,
    /// Video server the link is hosted on
    pub server_name: String,
}

/// Cache address of one resolution result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolutionKey {
    /// Kind the id was requested under
    pub kind: ContentKind,
    /// Entity id as supplied by the caller
    pub id: String,
    /// Season, for episode keys only
    pub season: Option<u32>,
    /// Episode, for episode keys only
    pub episode: Option<u32>,
}

impl ResolutionKey {
    /// Key for a whole title (metadata, movie streams, catalog listings).
    pub fn title(kind: ContentKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            season: None,
            episode: None,
        }
    }

    /// Key for a single episode of a series.
    pub fn episode(kind: ContentKind, id: impl Into<String>, season: u32, episode: u32) -> Self {
        Self {
            kind,
            id: id.into(),
            season: Some(season),
            episode: Some(episode),
        }
    }
}

impl fmt::Display for ResolutionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)?;
        if let (Some(season), Some(episode)) = (self.season, self.episode) {
            write!(f, ":s{season}e{episode}")?;
        }
        Ok(())
    }
}

/// Builds and reverses entity ids: `<prefix><absolute source url>`.
///
/// The id carries the page URL itself, so resolving an id back to a fetchable
/// page needs no lookup table. Only URLs on one of the scheme's hosts resolve;
/// a scheme built with [`IdScheme::new`] alone mints ids but resolves none.
#[derive(Debug, Clone)]
pub struct IdScheme {
    prefix: String,
    hosts: Vec<String>,
}

impl IdScheme {
    /// A scheme minting ids under `prefix`; add hosts to resolve them.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            hosts: Vec::new(),
        }
    }

    /// The scheme for a configured catalog: its prefix, its base URL's host
    /// and any extra allowed hosts.
    pub fn from_upstream(upstream: &UpstreamConfig) -> Self {
        let base_host = Url::parse(&upstream.base_url)
            .ok()
            .and_then(|base| base.host_str().map(str::to_string));

        Self::new(upstream.id_prefix.as_str())
            .with_hosts(base_host.into_iter().chain(upstream.allowed_hosts.iter().cloned()))
    }

    /// Adds hosts whose URLs [`IdScheme::source_url`] accepts.
    pub fn with_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for host in hosts {
            let host = host.into().trim().to_ascii_lowercase();
            if !host.is_empty() && !self.hosts.contains(&host) {
                self.hosts.push(host);
            }
        }
        self
    }

    /// Namespace tag prepended to every id.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The id for the page at `source_url`.
    pub fn entity_id(&self, source_url: &str) -> String {
        format!("{}{}", self.prefix, source_url)
    }

    /// Recovers the source URL from an id.
    ///
    /// # Errors
    ///
    /// - `CatalogError::MissingIdentifier` - If the id is blank
    /// - `CatalogError::UnknownNamespace` - If the id lacks this catalog's
    ///   prefix, or what follows it is not an http(s) URL on one of the
    ///   scheme's hosts
    pub fn source_url<'a>(&self, id: &'a str) -> Result<&'a str, CatalogError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(CatalogError::MissingIdentifier);
        }
        let foreign = || CatalogError::UnknownNamespace { id: id.to_string() };

        let raw = id
            .strip_prefix(self.prefix.as_str())
            .filter(|rest| !rest.is_empty())
            .ok_or_else(foreign)?;
        let url = Url::parse(raw).map_err(|_| foreign())?;

        let on_catalog_host = matches!(url.scheme(), "http" | "https")
            && url
                .host_str()
                .is_some_and(|host| self.hosts.iter().any(|h| h.eq_ignore_ascii_case(host)));
        if !on_catalog_host {
            return Err(foreign());
        }
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("movie".parse::<ContentKind>().unwrap(), ContentKind::Movie);
        assert_eq!(" Series ".parse::<ContentKind>().unwrap(), ContentKind::Series);
        assert!(matches!(
            "anime".parse::<ContentKind>(),
            Err(CatalogError::InvalidKind { .. })
        ));
    }

    fn scheme() -> IdScheme {
        IdScheme::new("cuevanap_").with_hosts(["cuevana.pro", "Player.Test"])
    }

    #[test]
    fn test_id_scheme_round_trip() {
        let scheme = scheme();
        let id = scheme.entity_id("https://cuevana.pro/pelicula/dune");

        assert_eq!(id, "cuevanap_https://cuevana.pro/pelicula/dune");
        assert_eq!(
            scheme.source_url(&id).unwrap(),
            "https://cuevana.pro/pelicula/dune"
        );
        assert_eq!(
            scheme.source_url("cuevanap_http://player.test/e/1").unwrap(),
            "http://player.test/e/1"
        );
    }

    #[test]
    fn test_id_scheme_rejects_foreign_ids() {
        let scheme = scheme();

        assert!(matches!(
            scheme.source_url("tt0133093"),
            Err(CatalogError::UnknownNamespace { .. })
        ));
        assert!(matches!(
            scheme.source_url("cuevanap_"),
            Err(CatalogError::UnknownNamespace { .. })
        ));
        assert!(matches!(
            scheme.source_url("  "),
            Err(CatalogError::MissingIdentifier)
        ));
    }

    #[test]
    fn test_id_scheme_rejects_payloads_off_the_catalog() {
        let scheme = scheme();

        for id in [
            "cuevanap_foo",
            "cuevanap_/pelicula/dune",
            "cuevanap_ftp://cuevana.pro/pelicula/dune",
            "cuevanap_http://169.254.169.254/latest/meta-data/",
            "cuevanap_https://cuevana.pro@10.0.0.1/admin",
            "cuevanap_https://cuevana.pro.evil.test/pelicula/dune",
        ] {
            assert!(
                matches!(scheme.source_url(id), Err(CatalogError::UnknownNamespace { .. })),
                "{id} should be rejected"
            );
        }

        let minting_only = IdScheme::new("cuevanap_");
        assert!(minting_only
            .source_url("cuevanap_https://cuevana.pro/pelicula/dune")
            .is_err());
    }

    #[test]
    fn test_id_scheme_from_upstream() {
        let upstream = UpstreamConfig {
            base_url: "https://catalog.test/".to_string(),
            allowed_hosts: vec!["mirror.test".to_string()],
            ..Default::default()
        };
        let scheme = IdScheme::from_upstream(&upstream);

        assert_eq!(scheme.prefix(), "cuevanap_");
        assert!(scheme.source_url("cuevanap_https://catalog.test/pelicula/a").is_ok());
        assert!(scheme.source_url("cuevanap_https://mirror.test/pelicula/a").is_ok());
        assert!(scheme.source_url("cuevanap_https://other.test/pelicula/a").is_err());
    }

    #[test]
    fn test_resolution_key_identity() {
        let movie = ResolutionKey::title(ContentKind::Movie, "cuevanap_x");
        let episode = ResolutionKey::episode(ContentKind::Series, "cuevanap_x", 1, 2);

        assert_ne!(movie, episode);
        assert_eq!(movie.to_string(), "movie:cuevanap_x");
        assert_eq!(episode.to_string(), "series:cuevanap_x:s1e2");
        assert_eq!(
            episode,
            ResolutionKey::episode(ContentKind::Series, "cuevanap_x", 1, 2)
        );
    }

    #[test]
    fn test_detail_serializes_flat() {
        let detail = ContentDetail {
            entity: ContentEntity {
                kind: ContentKind::Movie,
                id: "cuevanap_https://c.test/p/1".to_string(),
                title: "Dune".to_string(),
                poster_url: None,
                year: Some(2021),
                source_url: "https://c.test/p/1".to_string(),
            },
            description: None,
            rating: Some(8.0),
            runtime_minutes: Some(155),
            genres: vec!["Sci-Fi".to_string()],
            episodes: Vec::new(),
        };

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["kind"], "movie");
        assert_eq!(json["title"], "Dune");
        assert_eq!(json["runtimeMinutes"], 155);
        assert_eq!(json["sourceUrl"], "https://c.test/p/1");
        assert!(json.get("episodes").is_none());
    }
}
