//! CLI module - Command-line interface for GeekLogg
//!
//! Structured CLI using clap for argument parsing.

pub mod commands;

use clap::{Parser, Subcommand};

/// GeekLogg - personal media tracking server
/// A diary/library backend for games, movies, series, books, anime and dorama
#[derive(Parser)]
#[command(name = "geeklogg")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the API server with the background scheduler
    #[command(alias = "-d", alias = "--daemon")]
    Daemon,

    /// Run the scheduler jobs once (webhook sweep, prune, token warm-up)
    Sweep,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Manage user accounts
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Inspect a user's library
    Media {
        #[command(subcommand)]
        command: MediaCommands,
    },

    /// Inspect and retry stored webhook events
    Webhooks {
        #[command(subcommand)]
        command: WebhookCommands,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create a user account (prompts for the password)
    Add {
        username: String,
        email: String,
    },
    /// List all accounts
    #[command(alias = "ls")]
    List,
}

#[derive(Subcommand)]
pub enum MediaCommands {
    /// List a user's library entries
    #[command(alias = "ls")]
    List {
        /// Username whose library to list
        username: String,
        /// Filter by kind (games, anime, series, books, movies, dorama)
        #[arg(long)]
        kind: Option<String>,
        /// Filter by status (completed, in_progress, dropped, planned)
        #[arg(long)]
        status: Option<String>,
    },
    /// Show a user's library statistics
    Stats {
        username: String,
    },
}

#[derive(Subcommand)]
pub enum WebhookCommands {
    /// List recent webhook events
    #[command(alias = "ls")]
    List {
        /// Number of events to show
        #[arg(default_value = "20")]
        limit: u64,
    },
    /// Re-queue a parked event for processing
    Retry {
        /// Webhook event id
        id: i64,
    },
}
