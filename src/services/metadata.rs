//! Multi-source metadata aggregation.
//!
//! Dispatches a search to the source responsible for the requested media
//! kind: IGDB for games, Google Books for books, TMDB for everything
//! TV- or film-shaped.

use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use crate::clients::google_books::GoogleBooksClient;
use crate::clients::igdb::{IgdbClient, IgdbStatus};
use crate::clients::tmdb::TmdbClient;
use crate::models::media::MediaKind;
use crate::models::metadata::{MetadataMatch, MetadataSource};

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Search query must not be empty")]
    EmptyQuery,

    #[error("External API error: {source_name} - {message}")]
    ExternalApi { source_name: String, message: String },
}

impl MetadataError {
    fn external(source: MetadataSource, err: &anyhow::Error) -> Self {
        Self::ExternalApi {
            source_name: source.as_str().to_string(),
            message: err.to_string(),
        }
    }
}

pub struct MetadataService {
    igdb: Arc<IgdbClient>,
    tmdb: Arc<TmdbClient>,
    books: Arc<GoogleBooksClient>,
}

impl MetadataService {
    #[must_use]
    pub const fn new(
        igdb: Arc<IgdbClient>,
        tmdb: Arc<TmdbClient>,
        books: Arc<GoogleBooksClient>,
    ) -> Self {
        Self { igdb, tmdb, books }
    }

    /// Search the source serving `kind`.
    pub async fn search(
        &self,
        kind: MediaKind,
        query: &str,
    ) -> Result<Vec<MetadataMatch>, MetadataError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(MetadataError::EmptyQuery);
        }

        let source = MetadataSource::for_kind(kind);
        let results = match kind {
            MediaKind::Games => self.igdb.search_games(query).await,
            MediaKind::Books => self.books.search_volumes(query).await,
            MediaKind::Movies => self.tmdb.search_movies(query).await,
            MediaKind::Anime | MediaKind::Series | MediaKind::Dorama => {
                self.tmdb.search_tv(query, kind).await
            }
        };

        results.map_err(|e| MetadataError::external(source, &e))
    }

    /// Global search across every source at once, for the app's combined
    /// search screen. Sources that error are dropped rather than failing
    /// the whole request.
    pub async fn search_all(&self, query: &str) -> Result<Vec<MetadataMatch>, MetadataError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(MetadataError::EmptyQuery);
        }

        let (games, movies, tv, books) = futures::join!(
            self.igdb.search_games(query),
            self.tmdb.search_movies(query),
            self.tmdb.search_tv(query, MediaKind::Series),
            self.books.search_volumes(query),
        );

        let mut results = Vec::new();
        for (source, outcome) in [
            (MetadataSource::Igdb, games),
            (MetadataSource::Tmdb, movies),
            (MetadataSource::Tmdb, tv),
            (MetadataSource::GoogleBooks, books),
        ] {
            match outcome {
                Ok(matches) => results.extend(matches),
                Err(err) => warn!("{source} search failed: {err}"),
            }
        }

        Ok(results)
    }

    /// Throttle and token state for /api/igdb/status.
    pub async fn igdb_status(&self) -> IgdbStatus {
        self.igdb.status().await
    }
}
