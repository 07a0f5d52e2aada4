//! Cached subscription state.
//!
//! The local subscription row mirrors what the payment provider last told us
//! via webhooks; it is never written by user-facing code paths.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Subscription status, mirroring the provider's vocabulary.
///
/// Only `active` and `canceled` have dedicated variants because they are the
/// only values this application acts on; anything else the provider emits is
/// carried verbatim in `Other` and round-trips through storage unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SubscriptionStatus {
    Active,
    Canceled,
    Other(String),
}

impl SubscriptionStatus {
    /// Parse from a provider status string.
    #[must_use]
    pub fn from_provider(status: &str) -> Self {
        match status {
            "active" => Self::Active,
            "canceled" => Self::Canceled,
            other => Self::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::Canceled => "canceled",
            Self::Other(s) => s,
        }
    }

    /// Whether this status grants premium entitlement.
    ///
    /// Exactly `active` grants; every other value denies, including states
    /// like `trialing` or `past_due` the provider may emit.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl From<String> for SubscriptionStatus {
    fn from(s: String) -> Self {
        Self::from_provider(&s)
    }
}

impl From<SubscriptionStatus> for String {
    fn from(status: SubscriptionStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The locally cached subscription row for a profile.
///
/// At most one row exists per profile; the webhook reconciler upserts it
/// keyed by `user_id`, so the provider remains the source of truth for
/// every field here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub id: Uuid,
    /// Owning profile.
    pub user_id: Uuid,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub status: SubscriptionStatus,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_statuses_parse_to_variants() {
        assert_eq!(
            SubscriptionStatus::from_provider("active"),
            SubscriptionStatus::Active
        );
        assert_eq!(
            SubscriptionStatus::from_provider("canceled"),
            SubscriptionStatus::Canceled
        );
    }

    #[test]
    fn unknown_statuses_round_trip_verbatim() {
        let status = SubscriptionStatus::from_provider("past_due");
        assert_eq!(status, SubscriptionStatus::Other("past_due".to_string()));
        assert_eq!(status.as_str(), "past_due");

        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, "\"past_due\"");
        let back: SubscriptionStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, status);
    }

    #[test]
    fn only_active_grants_entitlement() {
        assert!(SubscriptionStatus::Active.is_active());
        assert!(!SubscriptionStatus::Canceled.is_active());
        assert!(!SubscriptionStatus::from_provider("trialing").is_active());
        assert!(!SubscriptionStatus::from_provider("past_due").is_active());
        assert!(!SubscriptionStatus::from_provider("incomplete").is_active());
    }
}
