//! Stripe Checkout session management.
//!
//! Creates provider Checkout sessions for the single subscription tier. The
//! caller's auth-identity reference is embedded as metadata so that later
//! webhook events can be resolved back to a local profile.

use super::error::BillingError;
use crate::error::Result;
use async_trait::async_trait;
use url::Url;

/// Checkout session management.
pub struct CheckoutManager<C: StripeCheckoutClient> {
    client: C,
    price_id: String,
    success_url: String,
    cancel_url: String,
}

impl<C: StripeCheckoutClient> CheckoutManager<C> {
    /// Create a new checkout manager.
    ///
    /// Redirect targets are derived from the app base URL: success lands on
    /// the dashboard with the session id, cancel returns to pricing.
    #[must_use]
    pub fn new(client: C, price_id: impl Into<String>, app_base_url: &str) -> Self {
        let base = app_base_url.trim_end_matches('/');
        Self {
            client,
            price_id: price_id.into(),
            success_url: format!("{base}/dashboard?session_id={{CHECKOUT_SESSION_ID}}"),
            cancel_url: format!("{base}/pricing"),
        }
    }

    /// Create a checkout session for the calling user.
    ///
    /// `user_ref` is the caller's auth-identity reference; it travels to the
    /// provider as metadata and comes back on every subscription event.
    pub async fn create_session(&self, user_ref: &str) -> Result<CheckoutSession> {
        validate_redirect_url(&self.success_url)?;
        validate_redirect_url(&self.cancel_url)?;

        let session = self
            .client
            .create_checkout_session(CreateCheckoutSessionRequest {
                price_id: self.price_id.clone(),
                success_url: self.success_url.clone(),
                cancel_url: self.cancel_url.clone(),
                user_ref: user_ref.to_string(),
            })
            .await?;

        Ok(session)
    }
}

/// Validate a redirect URL before handing it to the provider.
fn validate_redirect_url(url: &str) -> Result<()> {
    let parsed = Url::parse(url).map_err(|e| {
        crate::error::AppError::bad_request(format!("Invalid redirect URL: {}", e))
    })?;

    if parsed.scheme() != "https" && parsed.scheme() != "http" {
        return Err(crate::error::AppError::bad_request(
            "Redirect URL must be http(s)",
        ));
    }

    Ok(())
}

/// Request to create a provider checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCheckoutSessionRequest {
    /// Provider price ID for the subscription tier.
    pub price_id: String,
    /// URL to redirect to on success.
    pub success_url: String,
    /// URL to redirect to on cancel.
    pub cancel_url: String,
    /// Correlation identifier carried as `metadata[user_ref]`.
    pub user_ref: String,
}

/// Checkout session response.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CheckoutSession {
    /// Provider checkout session ID.
    pub id: String,
    /// URL to redirect the customer to.
    pub url: String,
}

/// Trait for the provider's checkout API.
#[async_trait]
pub trait StripeCheckoutClient: Send + Sync {
    /// Create a subscription-mode checkout session.
    async fn create_checkout_session(
        &self,
        request: CreateCheckoutSessionRequest,
    ) -> Result<CheckoutSession>;
}

#[async_trait]
impl<T: StripeCheckoutClient + ?Sized> StripeCheckoutClient for std::sync::Arc<T> {
    async fn create_checkout_session(
        &self,
        request: CreateCheckoutSessionRequest,
    ) -> Result<CheckoutSession> {
        (**self).create_checkout_session(request).await
    }
}

/// Checkout client used when no provider credentials are configured.
///
/// Local-dev servers run without a provider account; checkout requests fail
/// with a service-unavailable response instead of panicking at startup.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredCheckoutClient;

#[async_trait]
impl StripeCheckoutClient for UnconfiguredCheckoutClient {
    async fn create_checkout_session(
        &self,
        _request: CreateCheckoutSessionRequest,
    ) -> Result<CheckoutSession> {
        tracing::warn!("Checkout requested but no provider secret key is configured");
        Err(BillingError::CheckoutNotConfigured.into())
    }
}

/// Mock checkout client for tests.
pub mod test {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records requests and returns a canned session.
    #[derive(Default, Clone)]
    pub struct MockStripeCheckoutClient {
        requests: Arc<Mutex<Vec<CreateCheckoutSessionRequest>>>,
    }

    impl MockStripeCheckoutClient {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Requests seen so far.
        pub fn requests(&self) -> Vec<CreateCheckoutSessionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StripeCheckoutClient for MockStripeCheckoutClient {
        async fn create_checkout_session(
            &self,
            request: CreateCheckoutSessionRequest,
        ) -> Result<CheckoutSession> {
            self.requests.lock().unwrap().push(request);
            Ok(CheckoutSession {
                id: "cs_test_123".to_string(),
                url: "https://checkout.example.com/c/cs_test_123".to_string(),
            })
        }
    }
}
