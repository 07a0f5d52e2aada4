use std::sync::Arc;

use axum::{Router, routing::get};
use secrecy::SecretString;
use tower_http::trace::TraceLayer;

use crate::accounts::{AccountsModule, InMemoryProfileStore, ProfileStore};
use crate::auth::{IdentityProvider, StaticTokenProvider};
use crate::billing::{
    BillingModule, CheckoutManager, InMemorySubscriptionStore, StripeCheckoutClient,
    SubscriptionStore, UnconfiguredCheckoutClient, WebhookHandler,
};
use crate::content::{ContentStore, InMemoryContentStore, PostsModule};
use crate::http::{ApiResponse, RouteModule};

/// Shared application state for dependency injection.
///
/// Holds the storage backends and external-service collaborators every
/// route module needs. Cloning is cheap; everything is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub profiles: Arc<dyn ProfileStore>,
    pub content: Arc<dyn ContentStore>,
    pub subscriptions: Arc<dyn SubscriptionStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub webhooks: Arc<WebhookHandler<Arc<dyn SubscriptionStore>, Arc<dyn ProfileStore>>>,
    pub checkout: Arc<CheckoutManager<Arc<dyn StripeCheckoutClient>>>,
}

impl AppState {
    /// Builder pattern for constructing AppState
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::new()
    }
}

/// Builder for [`AppState`] with fluent API.
///
/// Anything not provided falls back to an in-memory/dev default so a
/// zero-config server can come up locally.
#[must_use = "builder does nothing until you call build()"]
pub struct AppStateBuilder {
    profiles: Option<Arc<dyn ProfileStore>>,
    content: Option<Arc<dyn ContentStore>>,
    subscriptions: Option<Arc<dyn SubscriptionStore>>,
    identity: Option<Arc<dyn IdentityProvider>>,
    checkout_client: Option<Arc<dyn StripeCheckoutClient>>,
    webhook_secret: Option<SecretString>,
    price_id: String,
    app_base_url: String,
}

impl AppStateBuilder {
    pub fn new() -> Self {
        Self {
            profiles: None,
            content: None,
            subscriptions: None,
            identity: None,
            checkout_client: None,
            webhook_secret: None,
            price_id: "price_unset".to_string(),
            app_base_url: "https://localhost".to_string(),
        }
    }

    pub fn with_profiles(mut self, profiles: Arc<dyn ProfileStore>) -> Self {
        self.profiles = Some(profiles);
        self
    }

    pub fn with_content(mut self, content: Arc<dyn ContentStore>) -> Self {
        self.content = Some(content);
        self
    }

    pub fn with_subscriptions(mut self, subscriptions: Arc<dyn SubscriptionStore>) -> Self {
        self.subscriptions = Some(subscriptions);
        self
    }

    pub fn with_identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn with_checkout_client(mut self, client: Arc<dyn StripeCheckoutClient>) -> Self {
        self.checkout_client = Some(client);
        self
    }

    pub fn with_webhook_secret(mut self, secret: impl Into<SecretString>) -> Self {
        self.webhook_secret = Some(secret.into());
        self
    }

    pub fn with_price_id(mut self, price_id: impl Into<String>) -> Self {
        self.price_id = price_id.into();
        self
    }

    pub fn with_app_base_url(mut self, url: impl Into<String>) -> Self {
        self.app_base_url = url.into();
        self
    }

    pub fn build(self) -> AppState {
        let profiles: Arc<dyn ProfileStore> = self
            .profiles
            .unwrap_or_else(|| Arc::new(InMemoryProfileStore::new()));

        let content: Arc<dyn ContentStore> = self
            .content
            .unwrap_or_else(|| Arc::new(InMemoryContentStore::new(profiles.clone())));

        let subscriptions: Arc<dyn SubscriptionStore> = self
            .subscriptions
            .unwrap_or_else(|| Arc::new(InMemorySubscriptionStore::new()));

        let identity: Arc<dyn IdentityProvider> = self.identity.unwrap_or_else(|| {
            tracing::warn!("No identity provider configured, using static token provider");
            Arc::new(StaticTokenProvider::new())
        });

        let webhook_secret = self.webhook_secret.unwrap_or_else(|| {
            tracing::warn!(
                "No webhook secret configured, using a development-only placeholder"
            );
            SecretString::new("whsec_dev_only".to_string())
        });

        let checkout_client: Arc<dyn StripeCheckoutClient> = self
            .checkout_client
            .unwrap_or_else(|| Arc::new(UnconfiguredCheckoutClient));

        let webhooks = Arc::new(WebhookHandler::new(
            subscriptions.clone(),
            profiles.clone(),
            webhook_secret,
        ));

        let checkout = Arc::new(CheckoutManager::new(
            checkout_client,
            self.price_id,
            &self.app_base_url,
        ));

        AppState {
            profiles,
            content,
            subscriptions,
            identity,
            webhooks,
            checkout,
        }
    }
}

impl Default for AppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Assemble the application router over a state.
pub fn router(state: AppState) -> Router {
    let mut router = Router::new().route("/health", get(health));
    router = PostsModule.register(router);
    router = AccountsModule.register(router);
    router = BillingModule.register(router);

    router.with_state(state).layer(TraceLayer::new_for_http())
}

async fn health() -> ApiResponse<serde_json::Value> {
    ApiResponse::success(serde_json::json!({ "status": "ok" }))
}
