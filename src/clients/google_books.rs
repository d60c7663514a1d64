use anyhow::Result;
use reqwest::Client;
use serde::Deserialize;

use crate::constants::GOOGLE_BOOKS_API;
use crate::models::media::MediaKind;
use crate::models::metadata::{MetadataMatch, MetadataSource};

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
struct Volume {
    id: String,
    #[serde(rename = "volumeInfo")]
    volume_info: VolumeInfo,
}

#[derive(Debug, Deserialize)]
struct VolumeInfo {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    description: Option<String>,
    #[serde(rename = "publishedDate")]
    published_date: Option<String>,
    #[serde(rename = "pageCount")]
    page_count: Option<i32>,
    #[serde(rename = "averageRating")]
    average_rating: Option<f32>,
    #[serde(rename = "imageLinks")]
    image_links: Option<ImageLinks>,
}

#[derive(Debug, Deserialize)]
struct ImageLinks {
    thumbnail: Option<String>,
}

#[derive(Clone)]
pub struct GoogleBooksClient {
    client: Client,
    api_key: String,
    max_results: u32,
    base_url: String,
}

impl GoogleBooksClient {
    #[must_use]
    pub fn new(client: Client, api_key: String, max_results: u32) -> Self {
        Self {
            client,
            api_key,
            max_results: max_results.clamp(1, 40),
            base_url: GOOGLE_BOOKS_API.to_string(),
        }
    }

    pub async fn search_volumes(&self, query: &str) -> Result<Vec<MetadataMatch>> {
        let mut url = format!(
            "{}/volumes?q={}&maxResults={}",
            self.base_url,
            urlencoding::encode(query),
            self.max_results
        );
        if !self.api_key.is_empty() {
            url.push_str(&format!("&key={}", self.api_key));
        }

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Google Books API error: {status} - {body}");
        }

        let volumes: VolumesResponse = response.json().await?;
        Ok(volumes.items.into_iter().map(map_volume).collect())
    }
}

fn map_volume(volume: Volume) -> MetadataMatch {
    let info = volume.volume_info;

    let title = match (info.title, info.authors.first()) {
        (Some(title), Some(author)) => format!("{title} ({author})"),
        (Some(title), None) => title,
        (None, _) => "Untitled".to_string(),
    };

    MetadataMatch {
        external_id: volume.id,
        source: MetadataSource::GoogleBooks,
        kind: MediaKind::Books,
        title,
        description: info.description,
        cover_url: info.image_links.and_then(|links| links.thumbnail),
        release_year: info
            .published_date
            .as_deref()
            .and_then(|date| date.get(..4))
            .and_then(|year| year.parse().ok()),
        // Google Books ratings are already on a 0-5 scale.
        score: info.average_rating,
        page_count: info.page_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_volume_carries_page_count() {
        let volume = Volume {
            id: "zyTCAlFPjgYC".to_string(),
            volume_info: VolumeInfo {
                title: Some("The Google Story".to_string()),
                authors: vec!["David A. Vise".to_string()],
                description: Some("How Google grew.".to_string()),
                published_date: Some("2005-11-15".to_string()),
                page_count: Some(207),
                average_rating: Some(3.5),
                image_links: Some(ImageLinks {
                    thumbnail: Some("http://books.google.com/thumb".to_string()),
                }),
            },
        };

        let m = map_volume(volume);
        assert_eq!(m.kind, MediaKind::Books);
        assert_eq!(m.page_count, Some(207));
        assert_eq!(m.release_year, Some(2005));
        assert_eq!(m.score, Some(3.5));
        assert!(m.title.contains("David A. Vise"));
    }
}
