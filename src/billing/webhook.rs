//! Stripe webhook handling.
//!
//! Handles webhook signature verification, event routing, and subscription
//! state syncing. This is the only writer of the local subscription cache:
//! provider lifecycle events arrive here asynchronously and are applied so
//! that entitlement reads never have to call the provider.

use crate::accounts::ProfileStore;
use crate::error::Result;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::error::BillingError;
use super::storage::{SubscriptionStore, SubscriptionUpsert};
use super::subscription::SubscriptionStatus;

/// Maximum accepted age of a webhook timestamp, in seconds.
const SIGNATURE_TOLERANCE_SECONDS: i64 = 300;

/// Metadata key carrying the correlation identifier.
///
/// The checkout flow embeds the caller's auth-identity reference under this
/// key; the provider echoes it back on every subscription event, and it is
/// the only way to map a provider subscription onto a local profile.
pub const META_USER_REF: &str = "user_ref";

/// Webhook handler for provider events.
///
/// Verifies signatures, parses events, and applies the three state
/// transitions over the subscription cache (upsert, cancel, reactivate).
/// The webhook secret is held in a [`SecretString`] so it cannot leak into
/// logs or debug output.
pub struct WebhookHandler<S: SubscriptionStore, P: ProfileStore> {
    subscriptions: S,
    profiles: P,
    webhook_secret: SecretString,
}

impl<S: SubscriptionStore, P: ProfileStore> WebhookHandler<S, P> {
    /// Create a new webhook handler.
    #[must_use]
    pub fn new(subscriptions: S, profiles: P, webhook_secret: impl Into<SecretString>) -> Self {
        Self {
            subscriptions,
            profiles,
            webhook_secret: webhook_secret.into(),
        }
    }

    /// Verify the webhook signature and parse the event.
    ///
    /// # Arguments
    /// * `payload` - The raw request body
    /// * `signature` - The `Stripe-Signature` header value
    ///
    /// # Errors
    /// Returns a client-class error if verification fails or the payload is
    /// malformed. No state is mutated on any verification failure.
    pub fn verify_signature(&self, payload: &[u8], signature: &str) -> Result<ProviderEvent> {
        let sig_parts = parse_signature_header(signature)?;

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0) as i64;

        let age = (now - sig_parts.timestamp).abs();
        if age > SIGNATURE_TOLERANCE_SECONDS {
            return Err(BillingError::WebhookTimestampExpired { age_seconds: age }.into());
        }

        let signed_payload = format!(
            "{}.{}",
            sig_parts.timestamp,
            String::from_utf8_lossy(payload)
        );
        let expected = compute_signature(
            self.webhook_secret.expose_secret(),
            signed_payload.as_bytes(),
        );

        let provided = match hex::decode(&sig_parts.signature) {
            Ok(bytes) => bytes,
            Err(_) => return Err(BillingError::InvalidWebhookSignature.into()),
        };

        if expected.len() != provided.len() || expected.ct_eq(&provided).unwrap_u8() != 1 {
            return Err(BillingError::InvalidWebhookSignature.into());
        }

        // Log parse detail internally, return a generic message to the caller
        let event: ProviderEvent = serde_json::from_slice(payload).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse webhook payload");
            BillingError::InvalidWebhookPayload {
                message: "malformed JSON payload".to_string(),
            }
        })?;

        Ok(event)
    }

    /// Process a verified webhook event.
    ///
    /// Every branch here is idempotent: upserts are keyed by profile and the
    /// cancel/reactivate transitions are no-ops when no row matches, so
    /// at-least-once delivery converges to the same end state.
    pub async fn handle_event(&self, event: ProviderEvent) -> Result<WebhookOutcome> {
        match event.kind() {
            EventKind::SubscriptionCreated | EventKind::SubscriptionUpdated => {
                self.apply_subscription_change(&event).await
            }
            EventKind::SubscriptionDeleted => self.apply_subscription_cancellation(&event).await,
            EventKind::InvoicePaymentSucceeded => self.apply_payment_success(&event).await,
            EventKind::Unknown => {
                tracing::debug!(event_type = %event.event_type, "Ignoring unhandled event type");
                Ok(WebhookOutcome::Ignored)
            }
        }
    }

    /// Upsert the cached subscription from a created/updated event.
    ///
    /// The profile is resolved through the correlation identifier in the
    /// event metadata. Events that cannot be resolved are dropped, not
    /// errored: the data is missing, not delayed, so a provider retry could
    /// never succeed.
    async fn apply_subscription_change(&self, event: &ProviderEvent) -> Result<WebhookOutcome> {
        let object = &event.data.object;

        let user_ref = object
            .get("metadata")
            .and_then(|m| m.get(META_USER_REF))
            .and_then(|v| v.as_str());

        let Some(user_ref) = user_ref else {
            tracing::error!(event_id = %event.id, "No {} in subscription metadata", META_USER_REF);
            return Ok(WebhookOutcome::Dropped);
        };

        let Some(profile) = self.profiles.get_by_identity(user_ref).await? else {
            tracing::error!(event_id = %event.id, user_ref, "Profile not found for subscription event");
            return Ok(WebhookOutcome::Dropped);
        };

        let subscription_id = require_str(object, "id", event)?;
        let customer_id = require_str(object, "customer", event)?;

        let status = object
            .get("status")
            .and_then(|v| v.as_str())
            .map(SubscriptionStatus::from_provider)
            .unwrap_or(SubscriptionStatus::Active);

        let change = SubscriptionUpsert {
            stripe_customer_id: customer_id.to_string(),
            stripe_subscription_id: subscription_id.to_string(),
            status,
            current_period_start: timestamp_field(object, "current_period_start"),
            current_period_end: timestamp_field(object, "current_period_end"),
        };

        self.subscriptions
            .upsert_for_profile(profile.id, &change)
            .await?;

        tracing::info!(
            event_id = %event.id,
            profile_id = %profile.id,
            subscription_id,
            status = %change.status,
            "Synced subscription from provider event"
        );

        Ok(WebhookOutcome::Processed)
    }

    /// Mark the matching row canceled. Absent row: no-op.
    async fn apply_subscription_cancellation(&self, event: &ProviderEvent) -> Result<WebhookOutcome> {
        let subscription_id = require_str(&event.data.object, "id", event)?;

        let matched = self
            .subscriptions
            .set_status_by_subscription_ref(subscription_id, SubscriptionStatus::Canceled)
            .await?;

        if !matched {
            tracing::debug!(subscription_id, "Cancellation for unknown subscription, ignoring");
        }

        Ok(WebhookOutcome::Processed)
    }

    /// Reactivate the row matching the invoice's subscription reference.
    async fn apply_payment_success(&self, event: &ProviderEvent) -> Result<WebhookOutcome> {
        let subscription_id = event
            .data
            .object
            .get("subscription")
            .and_then(|v| v.as_str());

        let Some(subscription_id) = subscription_id else {
            // Not a subscription invoice
            return Ok(WebhookOutcome::Ignored);
        };

        let matched = self
            .subscriptions
            .set_status_by_subscription_ref(subscription_id, SubscriptionStatus::Active)
            .await?;

        if !matched {
            tracing::debug!(subscription_id, "Payment for unknown subscription, ignoring");
        }

        Ok(WebhookOutcome::Processed)
    }
}

/// Extract a required string field from the event object.
fn require_str<'a>(
    object: &'a serde_json::Value,
    field: &str,
    event: &ProviderEvent,
) -> Result<&'a str> {
    object.get(field).and_then(|v| v.as_str()).ok_or_else(|| {
        BillingError::InvalidWebhookPayload {
            message: format!("missing {} in {} event", field, event.event_type),
        }
        .into()
    })
}

/// Parse a unix-seconds field into a timestamp.
fn timestamp_field(
    object: &serde_json::Value,
    field: &str,
) -> Option<chrono::DateTime<chrono::Utc>> {
    object
        .get(field)
        .and_then(|v| v.as_i64())
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
}

/// Parsed webhook event.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ProviderEvent {
    /// Event ID.
    pub id: String,
    /// Raw event type string (e.g., "customer.subscription.updated").
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event data.
    pub data: ProviderEventData,
    /// Timestamp when the event was created.
    pub created: u64,
}

impl ProviderEvent {
    /// The typed event kind; anything unrecognized lands in
    /// [`EventKind::Unknown`] and is ignored for forward compatibility.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self.event_type.as_str() {
            "customer.subscription.created" => EventKind::SubscriptionCreated,
            "customer.subscription.updated" => EventKind::SubscriptionUpdated,
            "customer.subscription.deleted" => EventKind::SubscriptionDeleted,
            "invoice.payment_succeeded" => EventKind::InvoicePaymentSucceeded,
            _ => EventKind::Unknown,
        }
    }
}

/// Webhook event data.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ProviderEventData {
    /// The object that triggered the event.
    pub object: serde_json::Value,
}

/// Typed event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    SubscriptionCreated,
    SubscriptionUpdated,
    SubscriptionDeleted,
    InvoicePaymentSucceeded,
    Unknown,
}

/// Outcome of webhook processing.
///
/// All three outcomes acknowledge the event to the provider; only a
/// returned error triggers a retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Event was processed and state was (possibly) updated.
    Processed,
    /// Event kind is not relevant to this application.
    Ignored,
    /// Event referenced data we do not have; logged and acknowledged.
    Dropped,
}

/// Parsed signature header parts.
struct SignatureParts {
    timestamp: i64,
    signature: String,
}

/// Parse the Stripe-Signature header (`t=<unix>,v1=<hex>`).
fn parse_signature_header(header: &str) -> Result<SignatureParts> {
    let mut timestamp = None;
    let mut signature = None;

    for part in header.split(',') {
        let Some((key, value)) = part.split_once('=') else {
            return Err(BillingError::InvalidWebhookSignature.into());
        };

        match key.trim() {
            "t" => timestamp = value.parse().ok(),
            "v1" => signature = Some(value.to_string()),
            _ => {} // Ignore other scheme versions
        }
    }

    match (timestamp, signature) {
        (Some(timestamp), Some(signature)) => Ok(SignatureParts {
            timestamp,
            signature,
        }),
        _ => Err(BillingError::InvalidWebhookSignature.into()),
    }
}

/// Compute the HMAC-SHA256 over a signed payload.
fn compute_signature(secret: &str, payload: &[u8]) -> Vec<u8> {
    type HmacSha256 = Hmac<Sha256>;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Build a Stripe-style signature header for a payload.
///
/// Counterpart of [`WebhookHandler::verify_signature`], used by tests and
/// local tooling to produce deliverable events.
#[must_use]
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
    let sig = hex::encode(compute_signature(secret, signed_payload.as_bytes()));
    format!("t={},v1={}", timestamp, sig)
}
