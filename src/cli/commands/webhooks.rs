//! Webhook event log command handlers

use crate::config::Config;
use crate::db::Store;

pub async fn cmd_webhooks_list(config: &Config, limit: u64) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let events = store.recent_webhook_events(limit).await?;

    if events.is_empty() {
        println!("No stored webhook events.");
        return Ok(());
    }

    println!("Webhook events (latest {})", events.len());
    println!("{:-<80}", "");

    for event in events {
        let status_indicator = match event.status.as_str() {
            "processed" => "✓",
            "skipped" => "–",
            "failed" => "✗",
            _ => "…",
        };

        println!(
            "{} [{}] {} {}",
            status_indicator, event.provider, event.event_type, event.event_id
        );
        println!(
            "  ID: {} | Attempts: {} | Received: {}",
            event.id, event.attempts, event.received_at
        );
        if let Some(error) = event.last_error {
            println!("  Last error: {error}");
        }
    }

    let backlog = store.webhook_backlog().await?;
    println!();
    println!(
        "Backlog: {} pending, {} failed",
        backlog.pending, backlog.failed
    );

    Ok(())
}

pub async fn cmd_webhooks_retry(config: &Config, id: i64) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;

    let Some(event) = store.get_webhook_event(id).await? else {
        println!("Webhook event {id} not found.");
        return Ok(());
    };

    store.requeue_webhook_event(id).await?;
    println!(
        "✓ Re-queued {} event {} ({}). The daemon sweep will pick it up.",
        event.provider, event.id, event.event_type
    );

    Ok(())
}
