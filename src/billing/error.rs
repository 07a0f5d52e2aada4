//! Billing-specific error types.
//!
//! Classifies webhook and provider failures so the transport layer can pick
//! the response class that drives the provider's retry behavior correctly.

use std::fmt;

/// Billing-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    // Webhook errors
    /// Webhook signature is invalid or missing.
    InvalidWebhookSignature,
    /// Webhook timestamp is too old (replay attack protection).
    WebhookTimestampExpired { age_seconds: i64 },
    /// Webhook event data is malformed.
    InvalidWebhookPayload { message: String },

    // Provider API errors
    /// The provider API returned an error.
    ProviderApiError {
        operation: String,
        message: String,
        http_status: Option<u16>,
    },
    /// Checkout is not configured (no provider credentials).
    CheckoutNotConfigured,

    // General errors
    /// An unexpected internal error occurred.
    Internal { message: String },
}

impl fmt::Display for BillingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidWebhookSignature => {
                write!(f, "Invalid webhook signature")
            }
            Self::WebhookTimestampExpired { age_seconds } => {
                write!(f, "Webhook timestamp expired ({} seconds old)", age_seconds)
            }
            Self::InvalidWebhookPayload { message } => {
                write!(f, "Invalid webhook payload: {}", message)
            }
            Self::ProviderApiError {
                operation,
                message,
                http_status,
            } => {
                write!(f, "Provider API error during '{}': {}", operation, message)?;
                if let Some(status) = http_status {
                    write!(f, " [HTTP {}]", status)?;
                }
                Ok(())
            }
            Self::CheckoutNotConfigured => {
                write!(f, "Checkout is not configured")
            }
            Self::Internal { message } => {
                write!(f, "Internal billing error: {}", message)
            }
        }
    }
}

impl std::error::Error for BillingError {}

impl From<BillingError> for crate::error::AppError {
    fn from(err: BillingError) -> Self {
        match &err {
            // Client errors: the provider must not blindly retry these
            BillingError::InvalidWebhookSignature
            | BillingError::WebhookTimestampExpired { .. }
            | BillingError::InvalidWebhookPayload { .. } => {
                crate::error::AppError::BadRequest(err.to_string())
            }

            BillingError::CheckoutNotConfigured => {
                crate::error::AppError::ServiceUnavailable(err.to_string())
            }

            BillingError::ProviderApiError { http_status, .. } => match http_status {
                Some(400..=499) => crate::error::AppError::BadRequest(err.to_string()),
                _ => crate::error::AppError::Internal(err.to_string()),
            },

            BillingError::Internal { .. } => crate::error::AppError::Internal(err.to_string()),
        }
    }
}

impl BillingError {
    /// Check if this is a client error (4xx).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::InvalidWebhookSignature
            | Self::WebhookTimestampExpired { .. }
            | Self::InvalidWebhookPayload { .. } => true,
            Self::ProviderApiError { http_status, .. } => {
                matches!(http_status, Some(400..=499))
            }
            _ => false,
        }
    }

    /// Check if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ProviderApiError { http_status, .. } => {
                matches!(http_status, Some(429) | Some(500..=599) | None)
            }
            _ => false,
        }
    }
}
