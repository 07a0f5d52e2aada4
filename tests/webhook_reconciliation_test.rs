//! Webhook endpoint contract: signature handling, acknowledgement classes,
//! and idempotent state transitions.

mod common;

use axum::http::StatusCode;
use broadsheet::billing::{SubscriptionStatus, SubscriptionStore};
use chrono::Utc;
use common::{WEBHOOK_SECRET, subscription_event, test_app};

#[tokio::test]
async fn missing_signature_header_is_rejected() {
    let app = test_app();
    let body = serde_json::to_vec(&subscription_event(
        "evt_1",
        "customer.subscription.created",
        "sub_1",
        "active",
        "auth_reader",
    ))
    .unwrap();

    let (status, _) = app.post_raw("/webhooks/stripe", body, &[]).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.subscriptions.all().is_empty());
}

#[tokio::test]
async fn invalid_signature_is_rejected_without_mutation() {
    let app = test_app();
    app.sign_in("tok_reader", "auth_reader", "reader@example.com").await;

    let payload = subscription_event(
        "evt_1",
        "customer.subscription.created",
        "sub_1",
        "active",
        "auth_reader",
    );
    let body = serde_json::to_vec(&payload).unwrap();
    let forged = broadsheet::billing::sign_payload("whsec_wrong", Utc::now().timestamp(), &body);

    let (status, _) = app
        .post_raw(
            "/webhooks/stripe",
            body,
            &[("stripe-signature", forged.as_str())],
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.subscriptions.all().is_empty());
}

#[tokio::test]
async fn stale_timestamp_is_rejected() {
    let app = test_app();
    let payload = subscription_event(
        "evt_1",
        "customer.subscription.created",
        "sub_1",
        "active",
        "auth_reader",
    );
    let body = serde_json::to_vec(&payload).unwrap();
    let stale = broadsheet::billing::sign_payload(
        WEBHOOK_SECRET,
        Utc::now().timestamp() - 3600,
        &body,
    );

    let (status, _) = app
        .post_raw(
            "/webhooks/stripe",
            body,
            &[("stripe-signature", stale.as_str())],
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn valid_event_is_applied_and_acknowledged() {
    let app = test_app();
    let reader = app.sign_in("tok_reader", "auth_reader", "reader@example.com").await;

    let (status, ack) = app
        .deliver_webhook(&subscription_event(
            "evt_1",
            "customer.subscription.created",
            "sub_1",
            "active",
            "auth_reader",
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["received"], true);

    let row = app
        .subscriptions
        .get_for_profile(reader.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.stripe_subscription_id.as_deref(), Some("sub_1"));
    assert_eq!(row.status, SubscriptionStatus::Active);
}

#[tokio::test]
async fn redelivered_event_converges_to_the_same_row() {
    let app = test_app();
    let reader = app.sign_in("tok_reader", "auth_reader", "reader@example.com").await;

    let event = subscription_event(
        "evt_1",
        "customer.subscription.created",
        "sub_1",
        "active",
        "auth_reader",
    );

    app.deliver_webhook(&event).await;
    let once = app
        .subscriptions
        .get_for_profile(reader.id)
        .await
        .unwrap()
        .unwrap();

    let (status, _) = app.deliver_webhook(&event).await;
    assert_eq!(status, StatusCode::OK);

    let twice = app
        .subscriptions
        .get_for_profile(reader.id)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(once.id, twice.id);
    assert_eq!(once.status, twice.status);
    assert_eq!(app.subscriptions.all().len(), 1);
}

#[tokio::test]
async fn unknown_event_kinds_are_acknowledged_without_mutation() {
    let app = test_app();

    let (status, ack) = app
        .deliver_webhook(&serde_json::json!({
            "id": "evt_future",
            "type": "entitlements.active_entitlement_summary.updated",
            "data": { "object": {} },
            "created": 1700000000u64
        }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["received"], true);
    assert!(app.subscriptions.all().is_empty());
}

#[tokio::test]
async fn cancellation_of_unknown_subscription_is_acknowledged() {
    let app = test_app();

    let (status, ack) = app
        .deliver_webhook(&serde_json::json!({
            "id": "evt_del",
            "type": "customer.subscription.deleted",
            "data": { "object": { "id": "sub_never_seen" } },
            "created": 1700000000u64
        }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["received"], true);
}

#[tokio::test]
async fn event_for_unresolvable_profile_is_acknowledged_without_mutation() {
    let app = test_app();

    let (status, ack) = app
        .deliver_webhook(&subscription_event(
            "evt_1",
            "customer.subscription.created",
            "sub_1",
            "active",
            "auth_nobody",
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["received"], true);
    assert!(app.subscriptions.all().is_empty());
}

#[tokio::test]
async fn payment_success_reactivates_the_matching_subscription() {
    let app = test_app();
    let reader = app.sign_in("tok_reader", "auth_reader", "reader@example.com").await;

    app.deliver_webhook(&subscription_event(
        "evt_1",
        "customer.subscription.created",
        "sub_1",
        "past_due",
        "auth_reader",
    ))
    .await;

    let (status, _) = app
        .deliver_webhook(&serde_json::json!({
            "id": "evt_inv",
            "type": "invoice.payment_succeeded",
            "data": { "object": { "id": "in_1", "subscription": "sub_1" } },
            "created": 1700000000u64
        }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let row = app
        .subscriptions
        .get_for_profile(reader.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.status, SubscriptionStatus::Active);
}

#[tokio::test]
async fn store_failure_is_a_server_error_so_the_provider_retries() {
    use async_trait::async_trait;
    use broadsheet::AppError;
    use broadsheet::accounts::{InMemoryProfileStore, ProfileStore};
    use broadsheet::auth::Identity;
    use broadsheet::billing::{SubscriptionRecord, SubscriptionUpsert};
    use std::sync::Arc;
    use uuid::Uuid;

    /// Subscription store whose every call errors, simulating an outage.
    struct FailingSubscriptionStore;

    #[async_trait]
    impl SubscriptionStore for FailingSubscriptionStore {
        async fn get_for_profile(
            &self,
            _user_id: Uuid,
        ) -> broadsheet::Result<Option<SubscriptionRecord>> {
            Err(AppError::Database("store unreachable".to_string()))
        }

        async fn upsert_for_profile(
            &self,
            _user_id: Uuid,
            _change: &SubscriptionUpsert,
        ) -> broadsheet::Result<()> {
            Err(AppError::Database("store unreachable".to_string()))
        }

        async fn set_status_by_subscription_ref(
            &self,
            _subscription_ref: &str,
            _status: SubscriptionStatus,
        ) -> broadsheet::Result<bool> {
            Err(AppError::Database("store unreachable".to_string()))
        }
    }

    let profiles = InMemoryProfileStore::new();
    profiles
        .ensure(&Identity {
            id: "auth_reader".to_string(),
            email: "reader@example.com".to_string(),
        })
        .await
        .unwrap();

    let state = broadsheet::AppState::builder()
        .with_profiles(Arc::new(profiles))
        .with_subscriptions(Arc::new(FailingSubscriptionStore))
        .with_webhook_secret(WEBHOOK_SECRET.to_string())
        .build();
    let router = broadsheet::router(state);

    let payload = subscription_event(
        "evt_1",
        "customer.subscription.created",
        "sub_1",
        "active",
        "auth_reader",
    );
    let body = serde_json::to_vec(&payload).unwrap();
    let signature =
        broadsheet::billing::sign_payload(WEBHOOK_SECRET, Utc::now().timestamp(), &body);

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/webhooks/stripe")
        .header("stripe-signature", signature)
        .body(axum::body::Body::from(body))
        .unwrap();

    use tower::ServiceExt;
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn checkout_requires_authentication() {
    let app = test_app();
    let (status, _) = app.post_raw("/billing/checkout", Vec::new(), &[]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn checkout_returns_redirect_url_and_embeds_correlation_id() {
    let app = test_app();
    app.sign_in("tok_reader", "auth_reader", "reader@example.com").await;

    let (status, body) = app
        .post_raw(
            "/billing/checkout",
            Vec::new(),
            &[("authorization", "Bearer tok_reader")],
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "cs_test_123");
    assert!(body["url"].as_str().unwrap().starts_with("https://"));

    let requests = app.checkout_client.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].user_ref, "auth_reader");
    assert_eq!(requests[0].price_id, "price_premium_monthly");
}
