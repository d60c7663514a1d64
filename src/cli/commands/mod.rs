mod media;
mod user;
mod webhooks;

pub use media::{cmd_media_list, cmd_media_stats};
pub use user::{cmd_user_add, cmd_user_list};
pub use webhooks::{cmd_webhooks_list, cmd_webhooks_retry};
