//! `SeaORM` implementation of the `MediaService` trait.

use std::sync::Arc;

use crate::db::{LibraryStats, MediaFilter, Store};
use crate::domain::events::NotificationEvent;
use crate::domain::{MediaId, UserId};
use crate::models::media::{MediaDraft, MediaEntry};
use crate::services::media_service::{MediaError, MediaService};

pub struct SeaOrmMediaService {
    store: Arc<Store>,
    event_bus: tokio::sync::broadcast::Sender<NotificationEvent>,
}

impl SeaOrmMediaService {
    #[must_use]
    pub const fn new(
        store: Arc<Store>,
        event_bus: tokio::sync::broadcast::Sender<NotificationEvent>,
    ) -> Self {
        Self { store, event_bus }
    }

    fn validated(draft: MediaDraft) -> Result<MediaDraft, MediaError> {
        draft.validate().map_err(MediaError::Invalid)?;
        Ok(draft)
    }
}

#[async_trait::async_trait]
impl MediaService for SeaOrmMediaService {
    async fn add_entry(&self, user: UserId, draft: MediaDraft) -> Result<MediaEntry, MediaError> {
        let draft = Self::validated(draft)?;

        let entry = self
            .store
            .add_media(user.value(), &draft)
            .await
            .map_err(|e| MediaError::Database(e.to_string()))?;

        let _ = self.event_bus.send(NotificationEvent::MediaAdded {
            user_id: user.value(),
            title: entry.title.clone(),
            kind: entry.kind.to_string(),
        });

        Ok(entry)
    }

    async fn get_entry(&self, user: UserId, id: MediaId) -> Result<MediaEntry, MediaError> {
        self.store
            .get_media(user.value(), id.value())
            .await
            .map_err(|e| MediaError::Database(e.to_string()))?
            .ok_or(MediaError::NotFound(id))
    }

    async fn list_entries(
        &self,
        user: UserId,
        filter: MediaFilter,
    ) -> Result<Vec<MediaEntry>, MediaError> {
        self.store
            .list_media(user.value(), &filter)
            .await
            .map_err(|e| MediaError::Database(e.to_string()))
    }

    async fn update_entry(
        &self,
        user: UserId,
        id: MediaId,
        draft: MediaDraft,
    ) -> Result<MediaEntry, MediaError> {
        let draft = Self::validated(draft)?;

        self.store
            .update_media(user.value(), id.value(), &draft)
            .await
            .map_err(|e| MediaError::Database(e.to_string()))?
            .ok_or(MediaError::NotFound(id))
    }

    async fn remove_entry(&self, user: UserId, id: MediaId) -> Result<(), MediaError> {
        let entry = self
            .store
            .get_media(user.value(), id.value())
            .await
            .map_err(|e| MediaError::Database(e.to_string()))?
            .ok_or(MediaError::NotFound(id))?;

        let removed = self
            .store
            .remove_media(user.value(), id.value())
            .await
            .map_err(|e| MediaError::Database(e.to_string()))?;

        if !removed {
            return Err(MediaError::NotFound(id));
        }

        let _ = self.event_bus.send(NotificationEvent::MediaRemoved {
            user_id: user.value(),
            title: entry.title,
        });

        Ok(())
    }

    async fn stats(&self, user: UserId) -> Result<LibraryStats, MediaError> {
        self.store
            .media_stats(user.value())
            .await
            .map_err(|e| MediaError::Database(e.to_string()))
    }
}
