use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub igdb: IgdbConfig,

    pub tmdb: TmdbConfig,

    pub google_books: GoogleBooksConfig,

    pub stripe: StripeConfig,

    pub mercadopago: MercadoPagoConfig,

    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    #[serde(default)]
    pub suppress_connection_errors: bool,

    /// Event bus buffer size (default: 100)
    pub event_bus_buffer_size: usize,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/geeklogg.db".to_string(),
            log_level: "info".to_string(),
            suppress_connection_errors: false,
            event_bus_buffer_size: 100,
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Whether to set the Secure flag on session cookies.
    /// Default: true for production safety. Set to false for local development without HTTPS.
    pub secure_cookies: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 6280,
            cors_allowed_origins: vec![
                "http://localhost:6280".to_string(),
                "http://127.0.0.1:6280".to_string(),
            ],
            secure_cookies: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IgdbConfig {
    /// Twitch application client id used for IGDB OAuth.
    pub client_id: String,

    /// Twitch application client secret. Prefer GEEKLOGG_IGDB_CLIENT_SECRET
    /// over storing this in the config file.
    pub client_secret: String,

    /// Requests allowed per sliding one-second window (IGDB terms: 4).
    pub requests_per_second: u32,

    /// Seconds before token expiry at which a refresh is forced.
    pub token_safety_margin_seconds: u64,

    /// Request timeout in seconds (default: 30)
    pub request_timeout_seconds: u32,
}

impl Default for IgdbConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            requests_per_second: 4,
            token_safety_margin_seconds: 5 * 60,
            request_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TmdbConfig {
    /// TMDB v3 API key. Prefer GEEKLOGG_TMDB_API_KEY.
    pub api_key: String,

    /// Language sent with search requests.
    pub language: String,
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            language: "en-US".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleBooksConfig {
    /// Optional API key; the volumes endpoint works unauthenticated at
    /// lower quota.
    pub api_key: String,

    pub max_results: u32,
}

impl Default for GoogleBooksConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            max_results: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StripeConfig {
    pub enabled: bool,

    /// Secret API key (sk_...). Prefer GEEKLOGG_STRIPE_SECRET_KEY.
    pub secret_key: String,

    /// Webhook signing secret (whsec_...). Prefer GEEKLOGG_STRIPE_WEBHOOK_SECRET.
    pub webhook_secret: String,

    /// Price id of the premium subscription.
    pub premium_price_id: String,

    pub success_url: String,

    pub cancel_url: String,

    /// Return URL for the customer portal.
    pub portal_return_url: String,

    /// Maximum age in seconds accepted for the webhook signature timestamp.
    pub signature_tolerance_seconds: i64,
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            secret_key: String::new(),
            webhook_secret: String::new(),
            premium_price_id: String::new(),
            success_url: "http://localhost:6280/billing/success".to_string(),
            cancel_url: "http://localhost:6280/billing/cancel".to_string(),
            portal_return_url: "http://localhost:6280/settings".to_string(),
            signature_tolerance_seconds: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MercadoPagoConfig {
    pub enabled: bool,

    /// Access token. Prefer GEEKLOGG_MP_ACCESS_TOKEN.
    pub access_token: String,

    /// Webhook secret for x-signature validation. Prefer GEEKLOGG_MP_WEBHOOK_SECRET.
    pub webhook_secret: String,

    /// Unit price of the premium subscription in the account currency.
    pub premium_price: f64,

    pub back_url: String,
}

impl Default for MercadoPagoConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            access_token: String::new(),
            webhook_secret: String::new(),
            premium_price: 9.90,
            back_url: "http://localhost:6280/billing/return".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,

    /// Webhook retry sweep interval in minutes.
    pub webhook_retry_minutes: u32,

    /// Maximum processing attempts before an event is marked failed.
    pub webhook_max_attempts: i32,

    /// Days to keep processed/skipped webhook events before pruning.
    pub webhook_retention_days: u32,

    /// IGDB token warm-up interval in minutes. 0 disables the job.
    pub token_warmup_minutes: u32,

    pub cron_expression: Option<String>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            webhook_retry_minutes: 5,
            webhook_max_attempts: 5,
            webhook_retention_days: 30,
            token_warmup_minutes: 30,
            cron_expression: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: std::collections::HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = std::collections::HashMap::new();
        labels.insert("app".to_string(), "geeklogg".to_string());

        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            igdb: IgdbConfig::default(),
            tmdb: TmdbConfig::default(),
            google_books: GoogleBooksConfig::default(),
            stripe: StripeConfig::default(),
            mercadopago: MercadoPagoConfig::default(),
            scheduler: SchedulerConfig::default(),
            observability: ObservabilityConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                let mut config = Self::load_from_path(path)?;
                config.apply_env_overrides();
                return Ok(config);
            }
        }

        info!("No config file found, using defaults");
        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Secrets can always be supplied via environment instead of the
    /// config file; env values win.
    pub fn apply_env_overrides(&mut self) {
        let overrides: [(&str, &mut String); 7] = [
            ("GEEKLOGG_IGDB_CLIENT_ID", &mut self.igdb.client_id),
            ("GEEKLOGG_IGDB_CLIENT_SECRET", &mut self.igdb.client_secret),
            ("GEEKLOGG_TMDB_API_KEY", &mut self.tmdb.api_key),
            ("GEEKLOGG_STRIPE_SECRET_KEY", &mut self.stripe.secret_key),
            (
                "GEEKLOGG_STRIPE_WEBHOOK_SECRET",
                &mut self.stripe.webhook_secret,
            ),
            ("GEEKLOGG_MP_ACCESS_TOKEN", &mut self.mercadopago.access_token),
            (
                "GEEKLOGG_MP_WEBHOOK_SECRET",
                &mut self.mercadopago.webhook_secret,
            ),
        ];

        for (var, slot) in overrides {
            if let Ok(value) = std::env::var(var)
                && !value.is_empty()
            {
                *slot = value;
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::default_config_path();
        self.save_to_path(&path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("geeklogg").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".geeklogg").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.igdb.requests_per_second == 0 {
            anyhow::bail!("IGDB requests_per_second must be > 0");
        }

        if self.stripe.enabled {
            if self.stripe.secret_key.is_empty() {
                anyhow::bail!("Stripe secret key is required when Stripe is enabled");
            }
            if self.stripe.webhook_secret.is_empty() {
                anyhow::bail!("Stripe webhook secret is required when Stripe is enabled");
            }
            if self.stripe.premium_price_id.is_empty() {
                anyhow::bail!("Stripe premium price id is required when Stripe is enabled");
            }
        }

        if self.mercadopago.enabled && self.mercadopago.access_token.is_empty() {
            anyhow::bail!("Mercado Pago access token is required when enabled");
        }

        if self.scheduler.enabled
            && self.scheduler.webhook_retry_minutes == 0
            && self.scheduler.cron_expression.is_none()
        {
            anyhow::bail!("Webhook retry interval must be > 0 or cron expression must be set");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.igdb.requests_per_second, 4);
        assert_eq!(config.igdb.token_safety_margin_seconds, 300);
        assert_eq!(config.scheduler.webhook_retry_minutes, 5);
        assert_eq!(config.server.port, 6280);
        assert!(!config.stripe.enabled);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[igdb]"));
        assert!(toml_str.contains("[stripe]"));
        assert!(toml_str.contains("[mercadopago]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [igdb]
            requests_per_second = 2
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.igdb.requests_per_second, 2);

        assert_eq!(config.tmdb.language, "en-US");
    }

    #[test]
    fn test_validate_rejects_enabled_stripe_without_secrets() {
        let mut config = Config::default();
        config.stripe.enabled = true;
        assert!(config.validate().is_err());

        config.stripe.secret_key = "sk_test_x".to_string();
        config.stripe.webhook_secret = "whsec_x".to_string();
        config.stripe.premium_price_id = "price_x".to_string();
        assert!(config.validate().is_ok());
    }
}
