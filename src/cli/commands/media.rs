//! Library inspection command handlers

use crate::config::Config;
use crate::db::{MediaFilter, Store};
use crate::models::media::{MediaKind, MediaStatus};

pub async fn cmd_media_list(
    config: &Config,
    username: &str,
    kind: Option<&str>,
    status: Option<&str>,
) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;

    let Some(user) = store.get_user_by_username(username).await? else {
        println!("User '{username}' not found.");
        return Ok(());
    };

    let mut filter = MediaFilter::default();
    if let Some(kind) = kind {
        match MediaKind::parse(kind) {
            Some(parsed) => filter.kind = Some(parsed),
            None => {
                println!("Unknown kind: {kind}");
                return Ok(());
            }
        }
    }
    if let Some(status) = status {
        match MediaStatus::parse(status) {
            Some(parsed) => filter.status = Some(parsed),
            None => {
                println!("Unknown status: {status}");
                return Ok(());
            }
        }
    }

    let entries = store.list_media(user.id, &filter).await?;

    if entries.is_empty() {
        println!("No entries in {username}'s library.");
        return Ok(());
    }

    println!("{}'s library ({} entries)", username, entries.len());
    println!("{:-<70}", "");

    for entry in entries {
        let status_indicator = match entry.status {
            MediaStatus::Completed => "✓",
            MediaStatus::InProgress => "▶",
            MediaStatus::Dropped => "✗",
            MediaStatus::Planned => "•",
        };

        let rating = entry
            .rating
            .map(|r| format!(" {r:.1}★"))
            .unwrap_or_default();

        println!("{} {} [{}]{}", status_indicator, entry.title, entry.kind, rating);

        if let (Some(current), Some(total)) = (entry.current_page, entry.total_pages) {
            println!("  ID: {} | Pages: {}/{}", entry.id, current, total);
        } else {
            println!("  ID: {} | Hours: {:.1}", entry.id, entry.hours_spent);
        }
    }

    println!();
    println!("Legend: ✓ Completed | ▶ In progress | ✗ Dropped | • Planned");

    Ok(())
}

pub async fn cmd_media_stats(config: &Config, username: &str) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;

    let Some(user) = store.get_user_by_username(username).await? else {
        println!("User '{username}' not found.");
        return Ok(());
    };

    let stats = store.media_stats(user.id).await?;

    println!("{username}'s library statistics");
    println!("{:-<40}", "");
    println!("Total entries: {}", stats.total_entries);
    println!("Total hours:   {:.1}", stats.total_hours);

    if let Some(mean) = stats.mean_rating {
        println!("Mean rating:   {mean:.2}★");
    }

    if !stats.by_kind.is_empty() {
        println!();
        println!("By kind:");
        let mut kinds: Vec<_> = stats.by_kind.iter().collect();
        kinds.sort_by(|a, b| b.1.cmp(a.1));
        for (kind, count) in kinds {
            println!("  {kind:<10} {count}");
        }
    }

    if !stats.by_status.is_empty() {
        println!();
        println!("By status:");
        let mut statuses: Vec<_> = stats.by_status.iter().collect();
        statuses.sort_by(|a, b| b.1.cmp(a.1));
        for (status, count) in statuses {
            println!("  {status:<12} {count}");
        }
    }

    Ok(())
}
