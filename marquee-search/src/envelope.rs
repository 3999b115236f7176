//! Request and response envelopes exchanged with the front end.
//!
//! Requests carry `kind` as a raw string (also accepted under the `type`
//! key) so an unknown kind surfaces as `CatalogError::InvalidKind` from the
//! pipeline instead of a deserialization failure.

use std::time::Duration;

use serde::{Deserialize, Serialize, Serializer};

use crate::types::{ContentDetail, ContentEntity, StreamLink};

/// Asks for one page of a catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRequest {
    /// `movie` or `series`
    #[serde(alias = "type")]
    pub kind: String,
    /// Genre to list; ignored when `search` is set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    /// Free-text query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Number of leading items to skip
    #[serde(default)]
    pub skip: usize,
}

/// Asks for full metadata of one title.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaRequest {
    /// `movie` or `series`
    #[serde(alias = "type")]
    pub kind: String,
    /// Entity id minted by this catalog
    #[serde(default)]
    pub id: String,
}

/// Asks for playable links of a movie or one episode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRequest {
    /// `movie` or `series`
    #[serde(alias = "type")]
    pub kind: String,
    /// Entity id minted by this catalog
    #[serde(default)]
    pub id: String,
    /// Season number, series only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
    /// Episode number within the season, series only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
}

/// Ordered catalog page plus how long the front end may cache it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogResponse {
    /// Entities in display order
    pub metas: Vec<ContentEntity>,
    /// How long the page may be reused, in seconds
    pub cache_max_age_seconds: u64,
}

impl CatalogResponse {
    /// A page of entities reusable for `max_age`.
    pub fn new(metas: Vec<ContentEntity>, max_age: Duration) -> Self {
        Self {
            metas,
            cache_max_age_seconds: max_age.as_secs(),
        }
    }
}

/// Metadata for one title; serializes `meta` as `{}` when nothing was found.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaResponse {
    /// The title's metadata, if it could be resolved
    #[serde(serialize_with = "meta_or_empty_object")]
    pub meta: Option<ContentDetail>,
    /// How long the metadata may be reused, in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_max_age_seconds: Option<u64>,
}

impl MetaResponse {
    /// Resolved metadata reusable for `max_age`.
    pub fn found(meta: ContentDetail, max_age: Duration) -> Self {
        Self {
            meta: Some(meta),
            cache_max_age_seconds: Some(max_age.as_secs()),
        }
    }

    /// Nothing was found; carries no cache hint.
    pub fn empty() -> Self {
        Self {
            meta: None,
            cache_max_age_seconds: None,
        }
    }
}

/// Playable links; the cache hint is omitted when there are none.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamResponse {
    /// Playable links in page order
    pub streams: Vec<StreamLink>,
    /// How long the links may be reused, in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_max_age_seconds: Option<u64>,
}

impl StreamResponse {
    /// Links reusable for `max_age`; an empty list gets no cache hint.
    pub fn new(streams: Vec<StreamLink>, max_age: Duration) -> Self {
        let cache_max_age_seconds = (!streams.is_empty()).then(|| max_age.as_secs());
        Self {
            streams,
            cache_max_age_seconds,
        }
    }

    /// No links; carries no cache hint.
    pub fn empty() -> Self {
        Self {
            streams: Vec::new(),
            cache_max_age_seconds: None,
        }
    }
}

fn meta_or_empty_object<S: Serializer>(
    meta: &Option<ContentDetail>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match meta {
        Some(detail) => detail.serialize(serializer),
        None => serde_json::Map::new().serialize(serializer),
    }
}
