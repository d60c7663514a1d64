pub mod media;
pub mod metadata;
pub mod subscription;

pub use media::{MediaDraft, MediaEntry, MediaKind, MediaStatus};
pub use metadata::{MetadataMatch, MetadataSource};
pub use subscription::{PaymentProvider, Subscription, SubscriptionStatus, SubscriptionTier};
