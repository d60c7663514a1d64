use serde::{Deserialize, Serialize};

use crate::db::{LibraryStats, WebhookBacklog};
use crate::models::media::{MediaEntry, MediaKind, MediaStatus};
use crate::models::subscription::Subscription;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MediaEntryDto {
    pub id: i64,
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
    pub created_at: String,
    pub updated_at: String,
}

impl From<MediaEntry> for MediaEntryDto {
    fn from(entry: MediaEntry) -> Self {
        Self {
            id: entry.id,
            title: entry.title,
            kind: entry.kind,
            status: entry.status,
            rating: entry.rating,
            hours_spent: entry.hours_spent,
            current_page: entry.current_page,
            total_pages: entry.total_pages,
            tags: entry.tags,
            notes: entry.notes,
            cover_url: entry.cover_url,
            external_id: entry.external_id,
            started_at: entry.started_at,
            finished_at: entry.finished_at,
            created_at: entry.created_at.to_rfc3339(),
            updated_at: entry.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubscriptionDto {
    pub tier: String,
    pub status: String,
    pub provider: Option<String>,
    pub premium: bool,
    pub current_period_end: Option<String>,
}

impl From<Subscription> for SubscriptionDto {
    fn from(sub: Subscription) -> Self {
        Self {
            premium: sub.is_premium(),
            tier: sub.tier.to_string(),
            status: sub.status.to_string(),
            provider: sub.provider.map(|p| p.to_string()),
            current_period_end: sub.current_period_end.map(|dt| dt.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CheckoutDto {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct PreferenceDto {
    pub preference_id: String,
    pub init_point: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: String,
    pub uptime: u64,
    pub total_users: usize,
    pub total_entries: u64,
    pub webhook_backlog: WebhookBacklog,
    pub stripe_enabled: bool,
    pub mercadopago_enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct StatsDto {
    #[serde(flatten)]
    pub stats: LibraryStats,
}

#[derive(Debug, Serialize)]
pub struct LogDto {
    pub id: i64,
    pub event_type: String,
    pub level: String,
    pub message: String,
    pub details: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct LogResponse {
    pub logs: Vec<LogDto>,
    pub total_pages: u64,
}

#[derive(Debug, Deserialize)]
pub struct ListMediaQuery {
    pub kind: Option<String>,
    pub status: Option<String>,
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}
