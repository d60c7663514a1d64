use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::entities::{media_entries, prelude::*};
use crate::models::media::{MediaDraft, MediaEntry, MediaKind, MediaStatus};

/// Filters for listing a user's library.
#[derive(Debug, Clone, Default)]
pub struct MediaFilter {
    pub kind: Option<MediaKind>,
    pub status: Option<MediaStatus>,
    /// Case-insensitive substring match over titles.
    pub title: Option<String>,
}

/// Aggregates backing the library statistics endpoint.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct LibraryStats {
    pub total_entries: u64,
    pub by_kind: HashMap<String, u64>,
    pub by_status: HashMap<String, u64>,
    pub total_hours: f64,
    pub mean_rating: Option<f32>,
}

pub struct MediaRepository {
    conn: DatabaseConnection,
}

impl MediaRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(model: media_entries::Model) -> MediaEntry {
        MediaEntry {
            id: model.id,
            user_id: model.user_id,
            // Unknown strings should never occur past validation; fall back
            // rather than failing the whole listing.
            kind: MediaKind::parse(&model.kind).unwrap_or(MediaKind::Games),
            status: MediaStatus::parse(&model.status).unwrap_or(MediaStatus::Planned),
            title: model.title,
            rating: model.rating,
            hours_spent: model.hours_spent,
            current_page: model.current_page,
            total_pages: model.total_pages,
            tags: model
                .tags
                .and_then(|s| serde_json::from_str(&s).ok())
                .unwrap_or_default(),
            notes: model.notes,
            cover_url: model.cover_url,
            external_id: model.external_id,
            started_at: model.started_at,
            finished_at: model.finished_at,
            created_at: parse_timestamp(&model.created_at),
            updated_at: parse_timestamp(&model.updated_at),
        }
    }

    fn draft_to_active(user_id: i32, draft: &MediaDraft, now: &str) -> media_entries::ActiveModel {
        media_entries::ActiveModel {
            user_id: Set(user_id),
            title: Set(draft.title.trim().to_string()),
            kind: Set(draft.kind.as_str().to_string()),
            status: Set(draft.status.as_str().to_string()),
            rating: Set(draft.rating),
            hours_spent: Set(draft.hours_spent),
            current_page: Set(draft.current_page),
            total_pages: Set(draft.total_pages),
            tags: Set(serde_json::to_string(&draft.tags).ok()),
            notes: Set(draft.notes.clone()),
            cover_url: Set(draft.cover_url.clone()),
            external_id: Set(draft.external_id.clone()),
            started_at: Set(draft.started_at.clone()),
            finished_at: Set(draft.finished_at.clone()),
            updated_at: Set(now.to_string()),
            ..Default::default()
        }
    }

    pub async fn insert(&self, user_id: i32, draft: &MediaDraft) -> Result<MediaEntry> {
        let now = Utc::now().to_rfc3339();
        let mut active = Self::draft_to_active(user_id, draft, &now);
        active.created_at = Set(now);

        let model = active.insert(&self.conn).await?;
        Ok(Self::map_model(model))
    }

    /// Fetch one entry, scoped to its owner. Foreign ids resolve to None.
    pub async fn get(&self, user_id: i32, id: i64) -> Result<Option<MediaEntry>> {
        let model = MediaEntries::find_by_id(id)
            .filter(media_entries::Column::UserId.eq(user_id))
            .one(&self.conn)
            .await?;

        Ok(model.map(Self::map_model))
    }

    pub async fn list(&self, user_id: i32, filter: &MediaFilter) -> Result<Vec<MediaEntry>> {
        let mut query = MediaEntries::find()
            .filter(media_entries::Column::UserId.eq(user_id))
            .order_by_desc(media_entries::Column::UpdatedAt);

        if let Some(kind) = filter.kind {
            query = query.filter(media_entries::Column::Kind.eq(kind.as_str()));
        }
        if let Some(status) = filter.status {
            query = query.filter(media_entries::Column::Status.eq(status.as_str()));
        }
        if let Some(title) = &filter.title {
            query = query.filter(media_entries::Column::Title.contains(title));
        }

        let rows = query.all(&self.conn).await?;
        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    /// Replace the user-editable fields of an entry. Returns the updated
    /// entry, or None when the entry does not exist for this user.
    pub async fn update(
        &self,
        user_id: i32,
        id: i64,
        draft: &MediaDraft,
    ) -> Result<Option<MediaEntry>> {
        let existing = MediaEntries::find_by_id(id)
            .filter(media_entries::Column::UserId.eq(user_id))
            .one(&self.conn)
            .await?;

        let Some(existing) = existing else {
            return Ok(None);
        };

        let now = Utc::now().to_rfc3339();
        let mut active = Self::draft_to_active(user_id, draft, &now);
        active.id = Set(existing.id);
        active.created_at = Set(existing.created_at);

        let model = active.update(&self.conn).await?;
        Ok(Some(Self::map_model(model)))
    }

    pub async fn delete(&self, user_id: i32, id: i64) -> Result<bool> {
        let result = MediaEntries::delete_many()
            .filter(media_entries::Column::Id.eq(id))
            .filter(media_entries::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    pub async fn count_for_user(&self, user_id: i32) -> Result<u64> {
        let count = MediaEntries::find()
            .filter(media_entries::Column::UserId.eq(user_id))
            .count(&self.conn)
            .await?;
        Ok(count)
    }

    pub async fn count_all(&self) -> Result<u64> {
        Ok(MediaEntries::find().count(&self.conn).await?)
    }

    /// Library aggregates for the stats endpoint. Single pass over the
    /// user's rows; libraries are small enough that SQL group-by per
    /// dimension is not worth the round trips.
    pub async fn stats(&self, user_id: i32) -> Result<LibraryStats> {
        let rows = MediaEntries::find()
            .filter(media_entries::Column::UserId.eq(user_id))
            .all(&self.conn)
            .await?;

        let mut stats = LibraryStats {
            total_entries: rows.len() as u64,
            ..Default::default()
        };

        let mut rating_sum = 0.0f64;
        let mut rating_count = 0u32;

        for row in rows {
            *stats.by_kind.entry(row.kind).or_insert(0) += 1;
            *stats.by_status.entry(row.status).or_insert(0) += 1;
            stats.total_hours += f64::from(row.hours_spent);
            if let Some(rating) = row.rating {
                rating_sum += f64::from(rating);
                rating_count += 1;
            }
        }

        if rating_count > 0 {
            stats.mean_rating = Some((rating_sum / f64::from(rating_count)) as f32);
        }

        Ok(stats)
    }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}
