use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Subscription tier controlling premium features in the apps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    Free,
    Premium,
}

impl SubscriptionTier {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Premium => "premium",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "free" => Some(Self::Free),
            "premium" => Some(Self::Premium),
            _ => None,
        }
    }
}

impl std::fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider-reported subscription state, collapsed to the states the
/// application cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    PastDue,
    Canceled,
    Incomplete,
}

impl SubscriptionStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
            Self::Incomplete => "incomplete",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "active" | "trialing" => Some(Self::Active),
            "past_due" | "unpaid" => Some(Self::PastDue),
            "canceled" | "cancelled" => Some(Self::Canceled),
            "incomplete" | "incomplete_expired" | "pending" => Some(Self::Incomplete),
            _ => None,
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProvider {
    Stripe,
    MercadoPago,
}

impl PaymentProvider {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stripe => "stripe",
            Self::MercadoPago => "mercadopago",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "stripe" => Some(Self::Stripe),
            "mercadopago" | "mercado_pago" => Some(Self::MercadoPago),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's subscription record. One row per user; webhook processing is
/// the only writer once the row exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub user_id: i32,
    pub provider: Option<PaymentProvider>,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub tier: SubscriptionTier,
    pub status: SubscriptionStatus,
    pub current_period_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// A fresh free-tier record for a user who has never paid.
    #[must_use]
    pub fn free(user_id: i32, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            provider: None,
            customer_id: None,
            subscription_id: None,
            tier: SubscriptionTier::Free,
            status: SubscriptionStatus::Active,
            current_period_end: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Premium access requires an active or grace-period (past-due) status.
    #[must_use]
    pub const fn is_premium(&self) -> bool {
        matches!(self.tier, SubscriptionTier::Premium)
            && matches!(
                self.status,
                SubscriptionStatus::Active | SubscriptionStatus::PastDue
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_aliases() {
        assert_eq!(
            SubscriptionStatus::parse("trialing"),
            Some(SubscriptionStatus::Active)
        );
        assert_eq!(
            SubscriptionStatus::parse("unpaid"),
            Some(SubscriptionStatus::PastDue)
        );
        assert_eq!(SubscriptionStatus::parse("bogus"), None);
    }

    #[test]
    fn test_premium_requires_active_status() {
        let now = Utc::now();
        let mut sub = Subscription::free(1, now);
        assert!(!sub.is_premium());

        sub.tier = SubscriptionTier::Premium;
        sub.status = SubscriptionStatus::Active;
        assert!(sub.is_premium());

        sub.status = SubscriptionStatus::PastDue;
        assert!(sub.is_premium());

        sub.status = SubscriptionStatus::Canceled;
        assert!(!sub.is_premium());
    }
}
