pub mod media_service;
pub use media_service::{MediaError, MediaService};

pub mod media_service_impl;
pub use media_service_impl::SeaOrmMediaService;

pub mod metadata;
pub use metadata::{MetadataError, MetadataService};

pub mod billing_service;
pub use billing_service::{
    BillingError, EventDisposition, MercadoPagoGateway, StripeGateway, WebhookReceipt,
};

pub mod billing_service_impl;
pub use billing_service_impl::BillingService;

pub mod logs;
pub use logs::LogService;
