//! Premium-access decisions.
//!
//! Decides, at read time, whether a viewer may see a post's full content.
//! The decision never calls the payment provider: it reads only the locally
//! cached subscription status the webhook reconciler maintains.

use super::post::Post;
use crate::accounts::Profile;
use crate::billing::{SubscriptionStatus, SubscriptionStore};
use serde::Serialize;

/// Render decision for a single post view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    /// Show the full content.
    Full,
    /// Show the paywall placeholder instead of the body.
    Paywalled,
}

impl Access {
    #[must_use]
    pub fn grants_full(&self) -> bool {
        matches!(self, Self::Full)
    }
}

/// Pure render decision.
///
/// Free posts are visible to everyone, including anonymous readers. Premium
/// posts require a present viewer whose cached subscription status is
/// exactly `active`; any other status, an absent row, or an absent viewer
/// denies.
#[must_use]
pub fn decide(
    post: &Post,
    viewer: Option<&Profile>,
    subscription: Option<&SubscriptionStatus>,
) -> Access {
    if !post.is_premium {
        return Access::Full;
    }

    if viewer.is_none() {
        return Access::Paywalled;
    }

    match subscription {
        Some(status) if status.is_active() => Access::Full,
        _ => Access::Paywalled,
    }
}

/// Store-backed entitlement check.
///
/// Wraps [`decide`] with the subscription lookup for the viewer.
pub struct EntitlementChecker<S: SubscriptionStore> {
    subscriptions: S,
}

impl<S: SubscriptionStore> EntitlementChecker<S> {
    #[must_use]
    pub fn new(subscriptions: S) -> Self {
        Self { subscriptions }
    }

    /// Decide whether `viewer` may see `post`'s full content.
    ///
    /// Fails closed: a store error during the lookup is logged and treated
    /// as "not subscribed", so a reader sees a paywall rather than an error
    /// page when the backend blips.
    pub async fn can_view(&self, post: &Post, viewer: Option<&Profile>) -> Access {
        if !post.is_premium {
            return Access::Full;
        }

        let Some(viewer) = viewer else {
            return Access::Paywalled;
        };

        let subscription = match self.subscriptions.get_for_profile(viewer.id).await {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!(
                    profile_id = %viewer.id,
                    error = %e,
                    "Subscription lookup failed, denying premium access"
                );
                return Access::Paywalled;
            }
        };

        decide(post, Some(viewer), subscription.map(|s| s.status).as_ref())
    }
}
