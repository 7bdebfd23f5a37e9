pub mod provider;
pub mod tmdb;

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("provider error: {0}")]
    Provider(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("not found")]
    NotFound,
    #[error("no indexer configured for {0}")]
    NotConfigured(String),
}

/// Series-level metadata as reported by an indexer.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SeriesMetadata {
    pub name: String,
    pub overview: Option<String>,
    pub network: Option<String>,
    pub genres: Vec<String>,
    pub status: Option<String>,
    pub first_aired: Option<NaiveDate>,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub imdb_id: Option<String>,
}

/// One episode in an indexer's episode list.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EpisodeInfo {
    pub season_number: u32,
    pub episode_number: u32,
    pub title: Option<String>,
    pub overview: Option<String>,
    pub air_date: Option<NaiveDate>,
}

/// Extra identifiers and ratings from a cross-reference source.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CrossReferenceInfo {
    pub imdb_id: Option<String>,
    pub rating: Option<f64>,
}

/// Parse the `YYYY-MM-DD` dates indexers use; empty strings mean "unknown".
pub fn parse_air_date(raw: Option<&str>) -> Option<NaiveDate> {
    raw.filter(|s| !s.is_empty())
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}
