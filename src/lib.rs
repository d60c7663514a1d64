pub mod api;
pub mod cli;
pub mod clients;
pub mod config;
pub mod constants;
pub mod db;
pub mod domain;
pub mod entities;
pub mod models;
pub mod scheduler;
pub mod services;
pub mod state;

use std::sync::Arc;
use tokio::signal;

use anyhow::Context;
use clap::Parser;
pub use config::Config;
use scheduler::Scheduler;
use state::SharedState;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, MediaCommands, UserCommands, WebhookCommands};

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load()?;
    config.validate()?;

    let prometheus_handle = if config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        info!("Prometheus metrics recorder initialized");
        Some(handle)
    } else {
        None
    };

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let mut log_level = config.general.log_level.clone();
    if config.general.suppress_connection_errors {
        log_level.push_str(",reqwest::retry=off,hyper_util=off");
    }

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    if config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;

        let (layer, task) = tracing_loki::builder()
            .label("app", "geeklogg")?
            .extra_field("env", "production")?
            .build_url(url)?;

        tokio::spawn(task);

        registry.with(layer).init();
        info!(
            "Loki logging initialized at {}",
            config.observability.loki_url
        );
    } else {
        registry.init();
    }

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Daemon) | None => run_daemon(config, prometheus_handle).await,

        Some(Commands::Sweep) => run_sweep_once(config).await,

        Some(Commands::Init) => {
            Config::create_default_if_missing()?;
            println!("✓ Config file created. Edit config.toml and run again.");
            Ok(())
        }

        Some(Commands::User { command }) => match command {
            UserCommands::Add { username, email } => {
                cli::commands::cmd_user_add(&config, &username, &email).await
            }
            UserCommands::List => cli::commands::cmd_user_list(&config).await,
        },

        Some(Commands::Media { command }) => match command {
            MediaCommands::List {
                username,
                kind,
                status,
            } => {
                cli::commands::cmd_media_list(&config, &username, kind.as_deref(), status.as_deref())
                    .await
            }
            MediaCommands::Stats { username } => {
                cli::commands::cmd_media_stats(&config, &username).await
            }
        },

        Some(Commands::Webhooks { command }) => match command {
            WebhookCommands::List { limit } => {
                cli::commands::cmd_webhooks_list(&config, limit).await
            }
            WebhookCommands::Retry { id } => cli::commands::cmd_webhooks_retry(&config, id).await,
        },
    }
}

async fn run_daemon(
    config: Config,
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
) -> anyhow::Result<()> {
    info!(
        "GeekLogg v{} starting in daemon mode...",
        env!("CARGO_PKG_VERSION")
    );

    let shared = Arc::new(SharedState::new(config.clone()).await?);
    let api_state = api::create_app_state(shared.clone(), prometheus_handle);

    let scheduler = Scheduler::new(shared.clone(), config.scheduler.clone());
    let scheduler_handle = tokio::spawn(async move {
        if let Err(e) = scheduler.start().await {
            error!("Scheduler error: {}", e);
        }
    });

    let server_handle: Option<tokio::task::JoinHandle<()>> = if config.server.enabled {
        let port = config.server.port;
        info!("Starting API server on port {}", port);

        let app = api::router(api_state).await;
        let addr = format!("0.0.0.0:{port}");
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        Some(tokio::spawn(async move {
            info!("API server running at http://0.0.0.0:{}", port);
            if let Err(e) = axum::serve(listener, app).await {
                error!("API server error: {}", e);
            }
        }))
    } else {
        None
    };

    info!("Daemon running. Press Ctrl+C to stop.");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            error!("Error listening for shutdown: {}", e);
        }
    }

    scheduler_handle.abort();
    if let Some(handle) = server_handle {
        handle.abort();
    }
    info!("Daemon stopped");

    Ok(())
}

async fn run_sweep_once(config: Config) -> anyhow::Result<()> {
    let shared = Arc::new(SharedState::new(config.clone()).await?);
    let scheduler = Scheduler::new(shared, config.scheduler.clone());

    scheduler.run_once().await?;
    println!("✓ Sweep complete.");

    Ok(())
}
