//! CLI command implementations

use anyhow::Context;
use clap::Subcommand;
use marquee_core::MarqueeConfig;
use marquee_search::{
    CatalogRequest, MetaRequest, ResolutionPipeline, StreamRequest, all_matches, best_match,
    match_titles_with,
};
use serde::Serialize;
use tracing::{debug, info};

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a catalog page (search, genre or popular listing)
    Catalog {
        /// Content kind: movie or series
        #[arg(short, long, default_value = "movie")]
        kind: String,
        /// Genre name to list
        #[arg(short, long)]
        genre: Option<String>,
        /// Free-text search; takes precedence over --genre
        #[arg(short, long)]
        search: Option<String>,
        /// Number of items to skip
        #[arg(long, default_value = "0")]
        skip: usize,
    },
    /// Resolve metadata for one title id
    Meta {
        #[arg(short, long, default_value = "movie")]
        kind: String,
        /// Catalog id (prefix + source URL)
        id: String,
    },
    /// Resolve playable links for a movie or an episode
    Streams {
        #[arg(short, long, default_value = "movie")]
        kind: String,
        /// Catalog id (prefix + source URL)
        id: String,
        #[arg(long)]
        season: Option<u32>,
        #[arg(long)]
        episode: Option<u32>,
    },
    /// Score candidate titles against a query without touching the network
    Match {
        query: String,
        /// Candidate titles
        #[arg(required = true)]
        candidates: Vec<String>,
        /// Minimum similarity; defaults to the configured fuzzy threshold
        #[arg(short, long)]
        threshold: Option<f64>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MatchReport<'a> {
    query: &'a str,
    threshold: f64,
    best: Option<&'a str>,
    matches: Vec<ScoredCandidate<'a>>,
    same_title: Vec<&'a str>,
}

#[derive(Serialize)]
struct ScoredCandidate<'a> {
    title: &'a str,
    score: f64,
}

/// Handle the CLI command
///
/// # Errors
/// Returns the configuration error, or the validation error the pipeline
/// rejected the request with
pub async fn handle_command(command: Commands) -> anyhow::Result<()> {
    let config = MarqueeConfig::from_env();
    debug!("Upstream catalog at {}", config.upstream.base_url);

    match command {
        Commands::Catalog {
            kind,
            genre,
            search,
            skip,
        } => {
            let pipeline = pipeline(&config)?;
            info!("Resolving {} catalog (skip {})", kind, skip);
            let request = CatalogRequest {
                kind,
                genre,
                search,
                skip,
            };
            print_json(&pipeline.resolve_catalog(&request).await?)
        }
        Commands::Meta { kind, id } => {
            let pipeline = pipeline(&config)?;
            info!("Resolving {} metadata for {}", kind, id);
            print_json(&pipeline.resolve_metadata(&MetaRequest { kind, id }).await?)
        }
        Commands::Streams {
            kind,
            id,
            season,
            episode,
        } => {
            let pipeline = pipeline(&config)?;
            info!("Resolving {} streams for {}", kind, id);
            let request = StreamRequest {
                kind,
                id,
                season,
                episode,
            };
            print_json(&pipeline.resolve_streams(&request).await?)
        }
        Commands::Match {
            query,
            candidates,
            threshold,
        } => {
            let threshold = threshold.unwrap_or(config.matching.fuzzy_threshold);
            debug!("Scoring {} candidates at threshold {}", candidates.len(), threshold);
            let report = MatchReport {
                query: &query,
                threshold,
                best: best_match(&query, &candidates, threshold).map(String::as_str),
                matches: all_matches(&query, &candidates, threshold)
                    .into_iter()
                    .map(|(title, score)| ScoredCandidate {
                        title: title.as_str(),
                        score,
                    })
                    .collect(),
                same_title: candidates
                    .iter()
                    .filter(|c| {
                        match_titles_with(&query, c, false, config.matching.title_threshold)
                    })
                    .map(String::as_str)
                    .collect(),
            };
            print_json(&report)
        }
    }
}

fn pipeline(config: &MarqueeConfig) -> anyhow::Result<ResolutionPipeline> {
    ResolutionPipeline::from_config(config)
        .map_err(|e| anyhow::anyhow!(e.user_message()))
        .context("Failed to build resolution pipeline")
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
