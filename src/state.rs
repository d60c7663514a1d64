use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, broadcast};

use crate::clients::google_books::GoogleBooksClient;
use crate::clients::igdb::{IgdbClient, TwitchTokenCache};
use crate::clients::mercadopago::MercadoPagoClient;
use crate::clients::stripe::StripeClient;
use crate::clients::throttle::RequestThrottle;
use crate::clients::tmdb::TmdbClient;
use crate::config::Config;
use crate::db::Store;
use crate::domain::events::NotificationEvent;
use crate::services::{
    BillingService, LogService, MediaService, MercadoPagoGateway, MetadataService,
    SeaOrmMediaService, StripeGateway,
};

/// Build a shared HTTP client with reasonable defaults for API calls.
/// Reused across all HTTP-based clients to enable connection pooling and
/// avoid socket exhaustion.
fn build_shared_http_client(timeout_seconds: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_seconds))
        .user_agent(crate::constants::USER_AGENT)
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub igdb: Arc<IgdbClient>,

    pub tmdb: Arc<TmdbClient>,

    pub google_books: Arc<GoogleBooksClient>,

    pub media_service: Arc<dyn MediaService>,

    pub metadata_service: Arc<MetadataService>,

    pub billing_service: Arc<BillingService>,

    pub log_service: Arc<LogService>,

    pub event_bus: broadcast::Sender<NotificationEvent>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let (event_bus, _) = broadcast::channel(config.general.event_bus_buffer_size);
        Self::init_with_event_bus(config, event_bus).await
    }

    pub async fn with_event_bus(
        config: Config,
        event_bus: broadcast::Sender<NotificationEvent>,
    ) -> anyhow::Result<Self> {
        Self::init_with_event_bus(config, event_bus).await
    }

    async fn init_with_event_bus(
        config: Config,
        event_bus: broadcast::Sender<NotificationEvent>,
    ) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let http_client = build_shared_http_client(config.igdb.request_timeout_seconds.into())?;

        let token_cache = Arc::new(TwitchTokenCache::new(
            http_client.clone(),
            config.igdb.client_id.clone(),
            config.igdb.client_secret.clone(),
            Duration::from_secs(config.igdb.token_safety_margin_seconds),
        ));
        let throttle = Arc::new(RequestThrottle::per_second(config.igdb.requests_per_second));

        let igdb = Arc::new(IgdbClient::new(
            http_client.clone(),
            config.igdb.client_id.clone(),
            token_cache,
            throttle,
        ));
        let tmdb = Arc::new(TmdbClient::new(
            http_client.clone(),
            config.tmdb.api_key.clone(),
            config.tmdb.language.clone(),
        ));
        let google_books = Arc::new(GoogleBooksClient::new(
            http_client.clone(),
            config.google_books.api_key.clone(),
            config.google_books.max_results,
        ));

        let stripe_gateway: Option<Arc<dyn StripeGateway>> = if config.stripe.enabled {
            Some(Arc::new(StripeClient::new(
                http_client.clone(),
                config.stripe.secret_key.clone(),
                config.stripe.webhook_secret.clone(),
                config.stripe.signature_tolerance_seconds,
            )))
        } else {
            None
        };

        let mp_gateway: Option<Arc<dyn MercadoPagoGateway>> = if config.mercadopago.enabled {
            Some(Arc::new(MercadoPagoClient::new(
                http_client,
                config.mercadopago.access_token.clone(),
                config.mercadopago.webhook_secret.clone(),
            )))
        } else {
            None
        };

        let config_arc = Arc::new(RwLock::new(config));
        let store_arc = Arc::new(store.clone());

        let media_service = Arc::new(SeaOrmMediaService::new(
            store_arc.clone(),
            event_bus.clone(),
        )) as Arc<dyn MediaService + Send + Sync + 'static>;

        let metadata_service = Arc::new(MetadataService::new(
            igdb.clone(),
            tmdb.clone(),
            google_books.clone(),
        ));

        let billing_service = Arc::new(BillingService::new(
            store_arc,
            stripe_gateway,
            mp_gateway,
            config_arc.clone(),
            event_bus.clone(),
        ));

        let log_service = Arc::new(LogService::new(store.clone(), event_bus.clone()));
        log_service.clone().start_listener();

        Ok(Self {
            config: config_arc,
            store,
            igdb,
            tmdb,
            google_books,
            media_service,
            metadata_service,
            billing_service,
            log_service,
            event_bus,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}
