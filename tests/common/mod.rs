//! Shared setup for integration tests: an app wired to in-memory stores,
//! a static token identity provider, and a mock checkout client.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use broadsheet::AppState;
use broadsheet::accounts::{InMemoryProfileStore, Profile, ProfileStore};
use broadsheet::auth::{Identity, StaticTokenProvider};
use broadsheet::billing::{InMemorySubscriptionStore, MockStripeCheckoutClient};
use broadsheet::content::{ContentStore, InMemoryContentStore, Post, PostStatus};
use chrono::Utc;
use tower::ServiceExt;
use uuid::Uuid;

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

pub struct TestApp {
    pub router: Router,
    pub profiles: InMemoryProfileStore,
    pub content: InMemoryContentStore,
    pub subscriptions: InMemorySubscriptionStore,
    pub identity: Arc<StaticTokenProvider>,
    pub checkout_client: MockStripeCheckoutClient,
}

pub fn test_app() -> TestApp {
    let profiles = InMemoryProfileStore::new();
    let content = InMemoryContentStore::new(Arc::new(profiles.clone()));
    let subscriptions = InMemorySubscriptionStore::new();
    let identity = Arc::new(StaticTokenProvider::new());
    let checkout_client = MockStripeCheckoutClient::new();

    let state = AppState::builder()
        .with_profiles(Arc::new(profiles.clone()))
        .with_content(Arc::new(content.clone()))
        .with_subscriptions(Arc::new(subscriptions.clone()))
        .with_identity(identity.clone())
        .with_checkout_client(Arc::new(checkout_client.clone()))
        .with_webhook_secret(WEBHOOK_SECRET.to_string())
        .with_price_id("price_premium_monthly")
        .with_app_base_url("https://broadsheet.example.com")
        .build();

    TestApp {
        router: broadsheet::router(state),
        profiles,
        content,
        subscriptions,
        identity,
        checkout_client,
    }
}

impl TestApp {
    /// Register a session token and ensure the matching profile.
    pub async fn sign_in(&self, token: &str, identity_id: &str, email: &str) -> Profile {
        let identity = Identity {
            id: identity_id.to_string(),
            email: email.to_string(),
        };
        self.identity.insert(token, identity.clone());
        self.profiles.ensure(&identity).await.unwrap()
    }

    /// Publish a post authored by `author_id`.
    pub async fn publish_post(&self, author_id: Uuid, slug: &str, is_premium: bool) -> Post {
        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4(),
            title: format!("Post {}", slug),
            content: "The full body of the post.".to_string(),
            excerpt: Some("A teaser.".to_string()),
            author_id,
            is_premium,
            status: PostStatus::Published,
            slug: Some(slug.to_string()),
            featured_image: None,
            meta_title: None,
            meta_description: None,
            created_at: now,
            updated_at: now,
        };
        self.content.create(&post).await.unwrap();
        post
    }

    /// GET a path, optionally authenticated, returning status and JSON body.
    pub async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method("GET").uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = builder.body(Body::empty()).unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    /// POST a raw body with optional headers, returning status and JSON body.
    pub async fn post_raw(
        &self,
        path: &str,
        body: Vec<u8>,
        headers: &[(&str, &str)],
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method("POST").uri(path);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder.body(Body::from(body)).unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    /// Deliver a signed webhook event, returning status and JSON body.
    pub async fn deliver_webhook(
        &self,
        payload: &serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let body = serde_json::to_vec(payload).unwrap();
        let timestamp = Utc::now().timestamp();
        let signature = broadsheet::billing::sign_payload(WEBHOOK_SECRET, timestamp, &body);
        self.post_raw(
            "/webhooks/stripe",
            body,
            &[
                ("stripe-signature", signature.as_str()),
                ("content-type", "application/json"),
            ],
        )
        .await
    }
}

/// Build a subscription lifecycle event payload.
pub fn subscription_event(
    event_id: &str,
    kind: &str,
    subscription_ref: &str,
    status: &str,
    user_ref: &str,
) -> serde_json::Value {
    serde_json::json!({
        "id": event_id,
        "type": kind,
        "data": {
            "object": {
                "id": subscription_ref,
                "customer": "cus_test_1",
                "status": status,
                "current_period_start": 1700000000i64,
                "current_period_end": 1702592000i64,
                "metadata": { "user_ref": user_ref }
            }
        },
        "created": 1700000000u64
    })
}
