//! TMDB (The Movie Database) indexer client.
//!
//! Uses TMDB API v3: https://developer.themoviedb.org/docs

use showrunner_core::{IndexerKind, ShowId};
use tracing::debug;

use crate::provider::{CrossReference, Indexer};
use crate::{
    CrossReferenceInfo, EpisodeInfo, MetadataError, SeriesMetadata, parse_air_date,
};

const BASE_URL: &str = "https://api.themoviedb.org/3";
const IMAGE_BASE: &str = "https://image.tmdb.org/t/p";

pub struct TmdbClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl TmdbClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url,
            client: reqwest::Client::new(),
        }
    }

    async fn get_json(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<serde_json::Value, MetadataError> {
        let mut all_params = vec![("api_key", self.api_key.as_str())];
        all_params.extend_from_slice(params);

        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, "TMDB request");

        let resp = self
            .client
            .get(&url)
            .query(&all_params)
            .send()
            .await
            .map_err(|e| MetadataError::Network(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(MetadataError::NotFound);
        }

        if !resp.status().is_success() {
            return Err(MetadataError::Provider(format!(
                "TMDB returned {}",
                resp.status()
            )));
        }

        resp.json()
            .await
            .map_err(|e| MetadataError::Provider(format!("parse JSON: {e}")))
    }
}

#[async_trait::async_trait]
impl Indexer for TmdbClient {
    fn kind(&self) -> IndexerKind {
        IndexerKind::Tmdb
    }

    fn name(&self) -> &str {
        "tmdb"
    }

    async fn get_series(&self, id: u64, language: &str) -> Result<SeriesMetadata, MetadataError> {
        let data = self
            .get_json(
                &format!("/tv/{id}"),
                &[("language", language), ("append_to_response", "external_ids")],
            )
            .await?;

        parse_series(&data)
    }

    async fn get_episodes(
        &self,
        id: u64,
        language: &str,
    ) -> Result<Vec<EpisodeInfo>, MetadataError> {
        let series = self
            .get_json(&format!("/tv/{id}"), &[("language", language)])
            .await?;

        let mut episodes = Vec::new();
        for season in season_numbers(&series) {
            let data = self
                .get_json(
                    &format!("/tv/{id}/season/{season}"),
                    &[("language", language)],
                )
                .await?;
            episodes.extend(parse_season(&data));
        }
        debug!(series_id = id, episodes = episodes.len(), "TMDB episode list loaded");
        Ok(episodes)
    }
}

#[async_trait::async_trait]
impl CrossReference for TmdbClient {
    fn name(&self) -> &str {
        "tmdb"
    }

    async fn lookup(
        &self,
        show: ShowId,
        _series: &SeriesMetadata,
    ) -> Result<CrossReferenceInfo, MetadataError> {
        if show.indexer != IndexerKind::Tmdb {
            return Err(MetadataError::NotFound);
        }
        let data = self
            .get_json(
                &format!("/tv/{}", show.id),
                &[("append_to_response", "external_ids")],
            )
            .await?;

        Ok(CrossReferenceInfo {
            imdb_id: non_empty(data["external_ids"]["imdb_id"].as_str()),
            rating: data["vote_average"].as_f64(),
        })
    }
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.filter(|s| !s.is_empty()).map(|s| s.to_string())
}

fn parse_series(data: &serde_json::Value) -> Result<SeriesMetadata, MetadataError> {
    let name = non_empty(data["name"].as_str())
        .ok_or_else(|| MetadataError::Provider("series has no name".into()))?;

    Ok(SeriesMetadata {
        name,
        overview: non_empty(data["overview"].as_str()),
        network: data["networks"]
            .as_array()
            .and_then(|ns| ns.first())
            .and_then(|n| non_empty(n["name"].as_str())),
        genres: data["genres"]
            .as_array()
            .map(|gs| {
                gs.iter()
                    .filter_map(|g| g["name"].as_str().map(|s| s.to_string()))
                    .collect()
            })
            .unwrap_or_default(),
        status: non_empty(data["status"].as_str()),
        first_aired: parse_air_date(data["first_air_date"].as_str()),
        poster_url: data["poster_path"]
            .as_str()
            .map(|p| format!("{IMAGE_BASE}/original{p}")),
        backdrop_url: data["backdrop_path"]
            .as_str()
            .map(|p| format!("{IMAGE_BASE}/original{p}")),
        imdb_id: non_empty(data["external_ids"]["imdb_id"].as_str()),
    })
}

fn season_numbers(series: &serde_json::Value) -> Vec<u32> {
    series["seasons"]
        .as_array()
        .map(|ss| {
            ss.iter()
                .filter_map(|s| s["season_number"].as_u64())
                .map(|n| n as u32)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_season(data: &serde_json::Value) -> Vec<EpisodeInfo> {
    let episodes = data["episodes"].as_array().cloned().unwrap_or_default();

    episodes
        .iter()
        .filter_map(|ep| {
            Some(EpisodeInfo {
                season_number: ep["season_number"].as_u64()? as u32,
                episode_number: ep["episode_number"].as_u64()? as u32,
                title: non_empty(ep["name"].as_str()),
                overview: non_empty(ep["overview"].as_str()),
                air_date: parse_air_date(ep["air_date"].as_str()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_series_from_json() {
        let json = serde_json::json!({
            "name": "Breaking Bad",
            "overview": "A high school chemistry teacher...",
            "first_air_date": "2008-01-20",
            "status": "Ended",
            "poster_path": "/bb.jpg",
            "networks": [{ "name": "AMC" }],
            "genres": [{ "name": "Drama" }, { "name": "Crime" }],
            "external_ids": { "imdb_id": "tt0903747" },
            "seasons": [{ "season_number": 0 }, { "season_number": 1 }, { "season_number": 2 }]
        });

        let meta = parse_series(&json).unwrap();
        assert_eq!(meta.name, "Breaking Bad");
        assert_eq!(meta.network.as_deref(), Some("AMC"));
        assert_eq!(meta.genres, vec!["Drama", "Crime"]);
        assert_eq!(meta.status.as_deref(), Some("Ended"));
        assert_eq!(meta.imdb_id.as_deref(), Some("tt0903747"));
        assert_eq!(
            meta.first_aired,
            chrono::NaiveDate::from_ymd_opt(2008, 1, 20)
        );
        assert!(meta.poster_url.unwrap().ends_with("/original/bb.jpg"));
        assert!(meta.backdrop_url.is_none());
        assert_eq!(season_numbers(&json), vec![0, 1, 2]);
    }

    #[test]
    fn series_without_a_name_is_an_error() {
        let json = serde_json::json!({ "name": "", "overview": "?" });
        assert!(matches!(parse_series(&json), Err(MetadataError::Provider(_))));
    }

    #[test]
    fn parse_season_skips_malformed_entries() {
        let json = serde_json::json!({
            "episodes": [
                { "season_number": 1, "episode_number": 1, "name": "Pilot", "air_date": "2008-01-20" },
                { "season_number": 1, "episode_number": 2, "name": "", "air_date": "" },
                { "name": "no numbers" }
            ]
        });

        let eps = parse_season(&json);
        assert_eq!(eps.len(), 2);
        assert_eq!(eps[0].title.as_deref(), Some("Pilot"));
        assert_eq!(eps[0].air_date, chrono::NaiveDate::from_ymd_opt(2008, 1, 20));
        assert_eq!(eps[1].title, None);
        assert_eq!(eps[1].air_date, None);
    }
}
