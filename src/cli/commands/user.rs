//! User account command handlers

use crate::config::Config;
use crate::db::Store;

pub async fn cmd_user_add(config: &Config, username: &str, email: &str) -> anyhow::Result<()> {
    if username.trim().is_empty() || email.trim().is_empty() {
        println!("Username and email are required.");
        return Ok(());
    }

    println!("Password for '{username}':");
    let mut password = String::new();
    std::io::stdin().read_line(&mut password)?;
    let password = password.trim_end_matches(['\r', '\n']);

    if password.len() < 8 {
        println!("Password must be at least 8 characters.");
        return Ok(());
    }

    let store = Store::new(&config.general.database_path).await?;
    let user = store
        .create_user(username, email, password, Some(&config.security))
        .await?;

    println!();
    println!("✓ Created user: {} (ID: {})", user.username, user.id);
    println!("  API key: {}", user.api_key);

    Ok(())
}

pub async fn cmd_user_list(config: &Config) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let users = store.list_users().await?;

    if users.is_empty() {
        println!("No user accounts.");
        return Ok(());
    }

    println!("Users ({} total)", users.len());
    println!("{:-<70}", "");

    for user in users {
        let entries = store.count_media_for_user(user.id).await.unwrap_or(0);
        println!("• {} <{}>", user.username, user.email);
        println!(
            "  ID: {} | Entries: {} | Created: {}",
            user.id, entries, user.created_at
        );
    }

    Ok(())
}
