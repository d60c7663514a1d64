use super::ApiError;
use crate::models::media::{MediaKind, MediaStatus};

pub fn validate_media_id(id: i64) -> Result<i64, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid media id: {id}. Id must be a positive integer"
        )));
    }
    Ok(id)
}

pub fn validate_search_query(query: &str) -> Result<&str, ApiError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Search query cannot be empty"));
    }
    if trimmed.len() > 256 {
        return Err(ApiError::validation(
            "Search query must be 256 characters or less",
        ));
    }
    Ok(trimmed)
}

pub fn parse_kind(value: &str) -> Result<MediaKind, ApiError> {
    MediaKind::parse(value).ok_or_else(|| {
        ApiError::validation(format!(
            "Unknown media kind: '{value}'. Expected one of games, anime, series, books, movies, dorama"
        ))
    })
}

pub fn parse_status(value: &str) -> Result<MediaStatus, ApiError> {
    MediaStatus::parse(value).ok_or_else(|| {
        ApiError::validation(format!(
            "Unknown status: '{value}'. Expected one of completed, in_progress, dropped, planned"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_media_id() {
        assert!(validate_media_id(1).is_ok());
        assert!(validate_media_id(0).is_err());
        assert!(validate_media_id(-5).is_err());
    }

    #[test]
    fn test_validate_search_query() {
        assert!(validate_search_query("Disco Elysium").is_ok());
        assert!(validate_search_query("  trimmed  ").is_ok());
        assert!(validate_search_query("").is_err());
        assert!(validate_search_query("   ").is_err());
        assert!(validate_search_query(&"x".repeat(300)).is_err());
    }

    #[test]
    fn test_parse_kind() {
        assert!(parse_kind("games").is_ok());
        assert!(parse_kind("dorama").is_ok());
        assert!(parse_kind("vinyl").is_err());
    }

    #[test]
    fn test_parse_status() {
        assert!(parse_status("planned").is_ok());
        assert!(parse_status("in_progress").is_ok());
        assert!(parse_status("paused").is_err());
    }
}
