use serde::{Deserialize, Serialize};

use super::media::MediaKind;

/// A search hit from one of the external metadata sources, normalized to
/// the shape the clients attach to a new library entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataMatch {
    /// Identifier within the source service (IGDB id, TMDB id, Google
    /// Books volume id).
    pub external_id: String,
    pub source: MetadataSource,
    pub kind: MediaKind,
    pub title: String,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub release_year: Option<i32>,
    /// Source-native score normalized to [0, 5].
    pub score: Option<f32>,
    /// Page count for book results, feeds the reading progress fields.
    pub page_count: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataSource {
    Igdb,
    Tmdb,
    GoogleBooks,
}

impl MetadataSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Igdb => "igdb",
            Self::Tmdb => "tmdb",
            Self::GoogleBooks => "google_books",
        }
    }

    /// Which source serves a given media kind.
    #[must_use]
    pub const fn for_kind(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Games => Self::Igdb,
            MediaKind::Books => Self::GoogleBooks,
            MediaKind::Anime | MediaKind::Series | MediaKind::Movies | MediaKind::Dorama => {
                Self::Tmdb
            }
        }
    }
}

impl std::fmt::Display for MetadataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_dispatch() {
        assert_eq!(MetadataSource::for_kind(MediaKind::Games), MetadataSource::Igdb);
        assert_eq!(
            MetadataSource::for_kind(MediaKind::Books),
            MetadataSource::GoogleBooks
        );
        assert_eq!(MetadataSource::for_kind(MediaKind::Anime), MetadataSource::Tmdb);
        assert_eq!(MetadataSource::for_kind(MediaKind::Dorama), MetadataSource::Tmdb);
    }
}
