use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kinds of media a user can track in their library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Games,
    Anime,
    Series,
    Books,
    Movies,
    Dorama,
}

impl MediaKind {
    pub const ALL: [Self; 6] = [
        Self::Games,
        Self::Anime,
        Self::Series,
        Self::Books,
        Self::Movies,
        Self::Dorama,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Games => "games",
            Self::Anime => "anime",
            Self::Series => "series",
            Self::Books => "books",
            Self::Movies => "movies",
            Self::Dorama => "dorama",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "games" | "game" => Some(Self::Games),
            "anime" => Some(Self::Anime),
            "series" => Some(Self::Series),
            "books" | "book" => Some(Self::Books),
            "movies" | "movie" => Some(Self::Movies),
            "dorama" => Some(Self::Dorama),
            _ => None,
        }
    }

    /// Page progress only makes sense for books.
    #[must_use]
    pub const fn tracks_pages(self) -> bool {
        matches!(self, Self::Books)
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the user stands with an entry. Transitions are unconstrained:
/// any status may follow any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaStatus {
    Completed,
    InProgress,
    Dropped,
    Planned,
}

impl MediaStatus {
    pub const ALL: [Self; 4] = [
        Self::Completed,
        Self::InProgress,
        Self::Dropped,
        Self::Planned,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::InProgress => "in_progress",
            Self::Dropped => "dropped",
            Self::Planned => "planned",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "completed" => Some(Self::Completed),
            "in_progress" | "in-progress" => Some(Self::InProgress),
            "dropped" => Some(Self::Dropped),
            "planned" => Some(Self::Planned),
            _ => None,
        }
    }
}

impl std::fmt::Display for MediaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single tracked entry in a user's library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaEntry {
    pub id: i64,
    pub user_id: i32,
    pub title: String,
    pub kind: MediaKind,
    pub status: MediaStatus,
    pub rating: Option<f32>,
    pub hours_spent: f32,
    pub current_page: Option<i32>,
    pub total_pages: Option<i32>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub cover_url: Option<String>,
    pub external_id: Option<String>,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const MAX_TITLE_LEN: usize = 512;
pub const MAX_TAGS: usize = 32;

/// User-supplied fields for creating or replacing an entry. Validation
/// happens here so every write path enforces the same invariants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaDraft {
    pub title: String,
    pub kind: MediaKind,
    pub status: MediaStatus,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub hours_spent: f32,
    #[serde(default)]
    pub current_page: Option<i32>,
    #[serde(default)]
    pub total_pages: Option<i32>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub finished_at: Option<String>,
}

impl MediaDraft {
    /// Checks the library invariants. Returns the first violation as a
    /// human-readable message.
    pub fn validate(&self) -> Result<(), String> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err("title must not be empty".to_string());
        }
        if title.len() > MAX_TITLE_LEN {
            return Err(format!("title exceeds {MAX_TITLE_LEN} characters"));
        }

        if let Some(rating) = self.rating
            && !(0.0..=5.0).contains(&rating)
        {
            return Err(format!("rating must be within [0, 5], got {rating}"));
        }

        if self.hours_spent < 0.0 {
            return Err("hours_spent must not be negative".to_string());
        }

        if let Some(current) = self.current_page {
            if current < 0 {
                return Err("current_page must not be negative".to_string());
            }
            if let Some(total) = self.total_pages
                && current > total
            {
                return Err(format!(
                    "current_page ({current}) must not exceed total_pages ({total})"
                ));
            }
        }

        if let Some(total) = self.total_pages
            && total < 0
        {
            return Err("total_pages must not be negative".to_string());
        }

        if self.tags.len() > MAX_TAGS {
            return Err(format!("at most {MAX_TAGS} tags are allowed"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> MediaDraft {
        MediaDraft {
            title: "Chrono Trigger".to_string(),
            kind: MediaKind::Games,
            status: MediaStatus::Completed,
            rating: Some(5.0),
            hours_spent: 23.5,
            current_page: None,
            total_pages: None,
            tags: vec!["jrpg".to_string()],
            notes: None,
            cover_url: None,
            external_id: None,
            started_at: None,
            finished_at: None,
        }
    }

    #[test]
    fn test_valid_draft() {
        assert!(draft().validate().is_ok());
    }

    #[test]
    fn test_rating_bounds() {
        let mut d = draft();
        d.rating = Some(5.5);
        assert!(d.validate().is_err());

        d.rating = Some(-0.1);
        assert!(d.validate().is_err());

        d.rating = Some(0.0);
        assert!(d.validate().is_ok());
    }

    #[test]
    fn test_page_progress_invariant() {
        let mut d = draft();
        d.kind = MediaKind::Books;
        d.current_page = Some(120);
        d.total_pages = Some(100);
        assert!(d.validate().is_err());

        d.current_page = Some(100);
        assert!(d.validate().is_ok());

        d.current_page = Some(-1);
        assert!(d.validate().is_err());
    }

    #[test]
    fn test_empty_title_rejected() {
        let mut d = draft();
        d.title = "   ".to_string();
        assert!(d.validate().is_err());
    }

    #[test]
    fn test_negative_hours_rejected() {
        let mut d = draft();
        d.hours_spent = -1.0;
        assert!(d.validate().is_err());
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in MediaKind::ALL {
            assert_eq!(MediaKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(MediaKind::parse("podcast"), None);
    }

    #[test]
    fn test_status_round_trip() {
        for status in MediaStatus::ALL {
            assert_eq!(MediaStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(
            MediaStatus::parse("in-progress"),
            Some(MediaStatus::InProgress)
        );
        assert_eq!(MediaStatus::parse("paused"), None);
    }
}
