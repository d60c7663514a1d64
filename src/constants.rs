/// Application version reported by /api/system/status.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// User agent sent to every external API.
pub const USER_AGENT: &str = "GeekLogg/1.0";

/// Twitch OAuth2 client-credentials endpoint used for IGDB auth.
pub const TWITCH_OAUTH_URL: &str = "https://id.twitch.tv/oauth2/token";

pub const IGDB_API: &str = "https://api.igdb.com/v4";

pub const TMDB_API: &str = "https://api.themoviedb.org/3";

pub const GOOGLE_BOOKS_API: &str = "https://www.googleapis.com/books/v1";

pub const STRIPE_API: &str = "https://api.stripe.com/v1";

pub const MERCADOPAGO_API: &str = "https://api.mercadopago.com";
