use anyhow::Result;
use reqwest::Client;
use serde::Deserialize;

use crate::constants::TMDB_API;
use crate::models::media::MediaKind;
use crate::models::metadata::{MetadataMatch, MetadataSource};

#[derive(Debug, Deserialize)]
struct TmdbPage {
    results: Vec<TmdbResult>,
}

#[derive(Debug, Deserialize)]
struct TmdbResult {
    id: i64,
    // Movies use `title`/`release_date`, TV uses `name`/`first_air_date`.
    title: Option<String>,
    name: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    vote_average: Option<f64>,
}

/// TMDB v3 client covering movies and all TV-shaped kinds (series, anime,
/// dorama).
#[derive(Clone)]
pub struct TmdbClient {
    client: Client,
    api_key: String,
    language: String,
    base_url: String,
}

impl TmdbClient {
    #[must_use]
    pub fn new(client: Client, api_key: String, language: String) -> Self {
        Self {
            client,
            api_key,
            language,
            base_url: TMDB_API.to_string(),
        }
    }

    pub async fn search_movies(&self, query: &str) -> Result<Vec<MetadataMatch>> {
        self.search("search/movie", query, MediaKind::Movies).await
    }

    /// TV search; the caller decides whether results are series, anime or
    /// dorama — TMDB does not distinguish.
    pub async fn search_tv(&self, query: &str, kind: MediaKind) -> Result<Vec<MetadataMatch>> {
        self.search("search/tv", query, kind).await
    }

    async fn search(
        &self,
        endpoint: &str,
        query: &str,
        kind: MediaKind,
    ) -> Result<Vec<MetadataMatch>> {
        let url = format!(
            "{}/{}?api_key={}&language={}&query={}",
            self.base_url,
            endpoint,
            self.api_key,
            self.language,
            urlencoding::encode(query)
        );

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("TMDB API error: {status} - {body}");
        }

        let page: TmdbPage = response.json().await?;
        Ok(page.results.into_iter().map(|r| map_result(r, kind)).collect())
    }
}

fn map_result(result: TmdbResult, kind: MediaKind) -> MetadataMatch {
    let title = result
        .title
        .or(result.name)
        .unwrap_or_else(|| "Untitled".to_string());

    let release_year = result
        .release_date
        .or(result.first_air_date)
        .as_deref()
        .and_then(|date| date.get(..4))
        .and_then(|year| year.parse().ok());

    MetadataMatch {
        external_id: result.id.to_string(),
        source: MetadataSource::Tmdb,
        kind,
        title,
        description: result.overview.filter(|s| !s.is_empty()),
        cover_url: result
            .poster_path
            .map(|path| format!("https://image.tmdb.org/t/p/w500{path}")),
        release_year,
        // TMDB votes are 0-10.
        score: result.vote_average.map(|v| (v / 2.0) as f32),
        page_count: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_tv_result() {
        let result = TmdbResult {
            id: 70593,
            title: None,
            name: Some("Mr. Queen".to_string()),
            overview: Some("A chef wakes up in the Joseon era.".to_string()),
            poster_path: Some("/abc.jpg".to_string()),
            release_date: None,
            first_air_date: Some("2020-12-12".to_string()),
            vote_average: Some(8.6),
        };

        let m = map_result(result, MediaKind::Dorama);
        assert_eq!(m.title, "Mr. Queen");
        assert_eq!(m.kind, MediaKind::Dorama);
        assert_eq!(m.release_year, Some(2020));
        assert!((m.score.unwrap() - 4.3).abs() < 0.01);
        assert_eq!(
            m.cover_url.as_deref(),
            Some("https://image.tmdb.org/t/p/w500/abc.jpg")
        );
    }

    #[test]
    fn test_map_movie_result_missing_fields() {
        let result = TmdbResult {
            id: 1,
            title: Some("Untitled Project".to_string()),
            name: None,
            overview: Some(String::new()),
            poster_path: None,
            release_date: Some("bad".to_string()),
            first_air_date: None,
            vote_average: None,
        };

        let m = map_result(result, MediaKind::Movies);
        assert_eq!(m.release_year, None);
        assert_eq!(m.description, None);
        assert_eq!(m.score, None);
    }
}
