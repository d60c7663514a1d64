//! Domain service for the media library.
//!
//! Abstracts library operations behind a trait so handlers never touch the
//! database directly and tests can mock the layer.

use crate::db::{LibraryStats, MediaFilter};
use crate::domain::{MediaId, UserId};
use crate::models::media::{MediaDraft, MediaEntry};
use thiserror::Error;

/// Domain errors for library operations.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Media entry not found: {0}")]
    NotFound(MediaId),

    #[error("Invalid media entry: {0}")]
    Invalid(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for MediaError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

/// Library operations, always scoped to the authenticated user. Entries
/// owned by other users are indistinguishable from missing ones.
#[async_trait::async_trait]
pub trait MediaService: Send + Sync {
    /// Validates and stores a new entry.
    ///
    /// # Errors
    ///
    /// - [`MediaError::Invalid`] when an invariant is violated
    /// - [`MediaError::Database`] on connection failures
    async fn add_entry(&self, user: UserId, draft: MediaDraft) -> Result<MediaEntry, MediaError>;

    async fn get_entry(&self, user: UserId, id: MediaId) -> Result<MediaEntry, MediaError>;

    async fn list_entries(
        &self,
        user: UserId,
        filter: MediaFilter,
    ) -> Result<Vec<MediaEntry>, MediaError>;

    /// Replaces the user-editable fields of an entry.
    async fn update_entry(
        &self,
        user: UserId,
        id: MediaId,
        draft: MediaDraft,
    ) -> Result<MediaEntry, MediaError>;

    async fn remove_entry(&self, user: UserId, id: MediaId) -> Result<(), MediaError>;

    /// Aggregates for the stats screens: counts per kind/status, total
    /// hours, mean rating.
    async fn stats(&self, user: UserId) -> Result<LibraryStats, MediaError>;
}
