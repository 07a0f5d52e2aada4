//! Live Stripe client.
//!
//! Talks to the provider's form-encoded REST API. The secret key is held in
//! a [`SecretString`] so it never appears in logs or debug output.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::checkout::{CheckoutSession, CreateCheckoutSessionRequest, StripeCheckoutClient};
use super::error::BillingError;
use super::webhook::META_USER_REF;
use crate::error::Result;

const DEFAULT_API_BASE: &str = "https://api.stripe.com";
const REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Validate a Stripe secret key format.
///
/// Valid prefixes: `sk_test_`, `sk_live_`, `rk_test_`, `rk_live_`.
fn validate_api_key(key: &str) -> std::result::Result<(), String> {
    const MIN_KEY_LENGTH: usize = 20;

    if key.len() < MIN_KEY_LENGTH {
        return Err(format!(
            "API key too short (minimum {} characters)",
            MIN_KEY_LENGTH
        ));
    }

    let valid_prefixes = ["sk_test_", "sk_live_", "rk_test_", "rk_live_"];
    if !valid_prefixes.iter().any(|prefix| key.starts_with(prefix)) {
        return Err(
            "API key must start with sk_test_, sk_live_, rk_test_, or rk_live_".to_string(),
        );
    }

    Ok(())
}

/// Live Stripe client for production use.
pub struct LiveStripeClient {
    http: reqwest::Client,
    secret_key: SecretString,
    api_base: String,
}

impl LiveStripeClient {
    /// Create a new client, validating the key format up front.
    pub fn new(secret_key: impl Into<SecretString>) -> Result<Self> {
        let secret_key = secret_key.into();
        validate_api_key(secret_key.expose_secret())
            .map_err(|reason| crate::error::AppError::bad_request(format!(
                "Invalid Stripe API key: {}",
                reason
            )))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()
            .map_err(|e| crate::error::AppError::internal(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            secret_key,
            api_base: DEFAULT_API_BASE.to_string(),
        })
    }

    /// Override the API base URL (for tests against a stub server).
    #[must_use]
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct CheckoutSessionResponse {
    id: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

#[async_trait]
impl StripeCheckoutClient for LiveStripeClient {
    async fn create_checkout_session(
        &self,
        request: CreateCheckoutSessionRequest,
    ) -> Result<CheckoutSession> {
        let params: Vec<(String, String)> = vec![
            ("mode".to_string(), "subscription".to_string()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            ("line_items[0][price]".to_string(), request.price_id),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("success_url".to_string(), request.success_url),
            ("cancel_url".to_string(), request.cancel_url),
            (concat_metadata_key(META_USER_REF), request.user_ref),
        ];

        let response = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(self.secret_key.expose_secret())
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ApiErrorResponse>()
                .await
                .map(|e| e.error.message)
                .unwrap_or_else(|_| "unreadable error response".to_string());

            return Err(BillingError::ProviderApiError {
                operation: "create_checkout_session".to_string(),
                message,
                http_status: Some(status.as_u16()),
            }
            .into());
        }

        let session: CheckoutSessionResponse = response.json().await?;
        Ok(CheckoutSession {
            id: session.id,
            url: session.url,
        })
    }
}

fn concat_metadata_key(key: &str) -> String {
    format!("metadata[{}]", key)
}
