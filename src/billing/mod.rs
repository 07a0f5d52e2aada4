//! Billing module for Stripe-based subscriptions.
//!
//! Keeps a local cache of each profile's subscription state, synced from
//! provider webhooks so that entitlement checks never call the provider on
//! the read path.
//!
//! # Example
//!
//! ```rust,ignore
//! use broadsheet::billing::{WebhookHandler, sign_payload};
//!
//! let handler = WebhookHandler::new(subscriptions, profiles, webhook_secret);
//!
//! // Transport layer hands over the raw body and signature header
//! let event = handler.verify_signature(&body, &signature)?;
//! let outcome = handler.handle_event(event).await?;
//! ```

pub mod checkout;
pub mod client;
pub mod error;
pub mod routes;
pub mod storage;
pub mod subscription;
pub mod webhook;

// Subscription exports
pub use subscription::{SubscriptionRecord, SubscriptionStatus};

// Storage exports
pub use storage::{InMemorySubscriptionStore, SubscriptionStore, SubscriptionUpsert};

// Webhook exports
pub use webhook::{
    EventKind, META_USER_REF, ProviderEvent, ProviderEventData, WebhookHandler, WebhookOutcome,
    sign_payload,
};

// Checkout exports
pub use checkout::{
    CheckoutManager, CheckoutSession, CreateCheckoutSessionRequest, StripeCheckoutClient,
    UnconfiguredCheckoutClient,
};

// Client exports
pub use client::LiveStripeClient;

// Error exports
pub use error::BillingError;

// Route exports
pub use routes::BillingModule;

// Test exports
pub use checkout::test::MockStripeCheckoutClient;
