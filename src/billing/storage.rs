//! Storage trait for the subscription cache.
//!
//! The webhook reconciler is the only writer; the entitlement check is the
//! only reader. An in-memory implementation backs tests and local dev.

use super::subscription::{SubscriptionRecord, SubscriptionStatus};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Provider-sourced fields written on subscription create/update events.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionUpsert {
    pub stripe_customer_id: String,
    pub stripe_subscription_id: String,
    pub status: SubscriptionStatus,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
}

/// Trait for storing the subscription cache.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Get the cached subscription for a profile.
    async fn get_for_profile(&self, user_id: Uuid) -> Result<Option<SubscriptionRecord>>;

    /// Insert or overwrite the cached subscription for a profile.
    ///
    /// Keyed by profile: last write wins, one row per profile. Must be a
    /// single atomic write in backends shared between concurrent deliveries.
    async fn upsert_for_profile(&self, user_id: Uuid, change: &SubscriptionUpsert) -> Result<()>;

    /// Set the status of the row matching a provider subscription reference.
    ///
    /// Returns `true` if a row matched; an absent row is a no-op and returns
    /// `false`.
    async fn set_status_by_subscription_ref(
        &self,
        subscription_ref: &str,
        status: SubscriptionStatus,
    ) -> Result<bool>;
}

#[async_trait]
impl<T: SubscriptionStore + ?Sized> SubscriptionStore for std::sync::Arc<T> {
    async fn get_for_profile(&self, user_id: Uuid) -> Result<Option<SubscriptionRecord>> {
        (**self).get_for_profile(user_id).await
    }

    async fn upsert_for_profile(&self, user_id: Uuid, change: &SubscriptionUpsert) -> Result<()> {
        (**self).upsert_for_profile(user_id, change).await
    }

    async fn set_status_by_subscription_ref(
        &self,
        subscription_ref: &str,
        status: SubscriptionStatus,
    ) -> Result<bool> {
        (**self)
            .set_status_by_subscription_ref(subscription_ref, status)
            .await
    }
}

/// In-memory subscription store.
///
/// Wraps data in `Arc` for cheap cloning.
#[derive(Default, Clone)]
pub struct InMemorySubscriptionStore {
    inner: std::sync::Arc<
        std::sync::RwLock<std::collections::HashMap<Uuid, SubscriptionRecord>>,
    >,
}

impl InMemorySubscriptionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all rows (for tests).
    pub fn all(&self) -> Vec<SubscriptionRecord> {
        self.inner.read().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn get_for_profile(&self, user_id: Uuid) -> Result<Option<SubscriptionRecord>> {
        Ok(self.inner.read().unwrap().get(&user_id).cloned())
    }

    async fn upsert_for_profile(&self, user_id: Uuid, change: &SubscriptionUpsert) -> Result<()> {
        let mut rows = self.inner.write().unwrap();
        let now = Utc::now();

        match rows.get_mut(&user_id) {
            Some(existing) => {
                existing.stripe_customer_id = Some(change.stripe_customer_id.clone());
                existing.stripe_subscription_id = Some(change.stripe_subscription_id.clone());
                existing.status = change.status.clone();
                existing.current_period_start = change.current_period_start;
                existing.current_period_end = change.current_period_end;
                existing.updated_at = now;
            }
            None => {
                rows.insert(
                    user_id,
                    SubscriptionRecord {
                        id: Uuid::new_v4(),
                        user_id,
                        stripe_customer_id: Some(change.stripe_customer_id.clone()),
                        stripe_subscription_id: Some(change.stripe_subscription_id.clone()),
                        status: change.status.clone(),
                        current_period_start: change.current_period_start,
                        current_period_end: change.current_period_end,
                        created_at: now,
                        updated_at: now,
                    },
                );
            }
        }
        Ok(())
    }

    async fn set_status_by_subscription_ref(
        &self,
        subscription_ref: &str,
        status: SubscriptionStatus,
    ) -> Result<bool> {
        let mut rows = self.inner.write().unwrap();
        let row = rows
            .values_mut()
            .find(|r| r.stripe_subscription_id.as_deref() == Some(subscription_ref));

        match row {
            Some(row) => {
                row.status = status;
                row.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upsert(sub_ref: &str, status: SubscriptionStatus) -> SubscriptionUpsert {
        SubscriptionUpsert {
            stripe_customer_id: "cus_123".to_string(),
            stripe_subscription_id: sub_ref.to_string(),
            status,
            current_period_start: None,
            current_period_end: None,
        }
    }

    #[tokio::test]
    async fn upsert_inserts_then_overwrites() {
        let store = InMemorySubscriptionStore::new();
        let user_id = Uuid::new_v4();

        store
            .upsert_for_profile(user_id, &upsert("sub_1", SubscriptionStatus::Active))
            .await
            .unwrap();
        let first = store.get_for_profile(user_id).await.unwrap().unwrap();
        assert_eq!(first.status, SubscriptionStatus::Active);

        store
            .upsert_for_profile(user_id, &upsert("sub_1", SubscriptionStatus::Canceled))
            .await
            .unwrap();
        let second = store.get_for_profile(user_id).await.unwrap().unwrap();
        assert_eq!(second.status, SubscriptionStatus::Canceled);
        assert_eq!(second.id, first.id);
        assert_eq!(store.all().len(), 1);
    }

    #[tokio::test]
    async fn upsert_is_idempotent_under_redelivery() {
        let store = InMemorySubscriptionStore::new();
        let user_id = Uuid::new_v4();
        let change = upsert("sub_1", SubscriptionStatus::Active);

        store.upsert_for_profile(user_id, &change).await.unwrap();
        let once = store.get_for_profile(user_id).await.unwrap().unwrap();

        store.upsert_for_profile(user_id, &change).await.unwrap();
        let twice = store.get_for_profile(user_id).await.unwrap().unwrap();

        assert_eq!(once.status, twice.status);
        assert_eq!(once.stripe_subscription_id, twice.stripe_subscription_id);
        assert_eq!(store.all().len(), 1);
    }

    #[tokio::test]
    async fn set_status_by_ref_updates_matching_row_only() {
        let store = InMemorySubscriptionStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        store
            .upsert_for_profile(alice, &upsert("sub_alice", SubscriptionStatus::Active))
            .await
            .unwrap();
        store
            .upsert_for_profile(bob, &upsert("sub_bob", SubscriptionStatus::Active))
            .await
            .unwrap();

        let matched = store
            .set_status_by_subscription_ref("sub_alice", SubscriptionStatus::Canceled)
            .await
            .unwrap();
        assert!(matched);

        let alice_row = store.get_for_profile(alice).await.unwrap().unwrap();
        let bob_row = store.get_for_profile(bob).await.unwrap().unwrap();
        assert_eq!(alice_row.status, SubscriptionStatus::Canceled);
        assert_eq!(bob_row.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn set_status_on_unknown_ref_is_noop() {
        let store = InMemorySubscriptionStore::new();
        let matched = store
            .set_status_by_subscription_ref("sub_ghost", SubscriptionStatus::Canceled)
            .await
            .unwrap();
        assert!(!matched);
        assert!(store.all().is_empty());
    }
}
