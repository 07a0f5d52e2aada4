use super::checkout::CheckoutSession;
use crate::app::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::http::{JsonResponse, RouteModule};
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
};
use serde_json::json;

/// Routes for checkout initiation and the provider webhook endpoint.
pub struct BillingModule;

impl RouteModule for BillingModule {
    fn routes(&self) -> Router<AppState> {
        Router::new()
            .route("/billing/checkout", post(create_checkout))
            .route("/webhooks/stripe", post(receive_webhook))
    }
}

async fn create_checkout(
    State(state): State<AppState>,
    CurrentUser(profile): CurrentUser,
) -> JsonResponse<CheckoutSession> {
    let session = state.checkout.create_session(&profile.identity_id).await?;
    Ok(Json(session))
}

/// Provider notification endpoint.
///
/// Response classes drive the provider's retry policy: 400 for signature
/// failures (retrying cannot help), 500 for processing failures (retry
/// wanted), 200 for everything that was applied or deliberately ignored.
async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> JsonResponse<serde_json::Value> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::bad_request("Missing Stripe-Signature header"))?;

    let event = state.webhooks.verify_signature(&body, signature)?;
    let outcome = state.webhooks.handle_event(event).await?;

    tracing::debug!(?outcome, "Webhook acknowledged");
    Ok(Json(json!({ "received": true })))
}
