use std::sync::Arc;

use broadsheet::auth::{IdentityProvider, JwtIdentityProvider, StaticTokenProvider};
use broadsheet::billing::{LiveStripeClient, StripeCheckoutClient, UnconfiguredCheckoutClient};
use broadsheet::database::SeaOrmStore;
use broadsheet::{AppState, ConfigBuilder};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    broadsheet::init_tracing();

    let config = ConfigBuilder::new().from_env().build()?;

    let mut builder = AppState::builder()
        .with_price_id(config.billing.price_id.clone())
        .with_app_base_url(config.billing.app_base_url.clone());

    if let Some(url) = &config.database.url {
        let db = broadsheet::database::connect(url).await?;
        let store = Arc::new(SeaOrmStore::new(db));
        builder = builder
            .with_profiles(store.clone())
            .with_content(store.clone())
            .with_subscriptions(store);
    } else {
        tracing::warn!("No database configured, running on in-memory stores");
    }

    let identity: Arc<dyn IdentityProvider> = match &config.auth.session_secret {
        Some(secret) => Arc::new(JwtIdentityProvider::new(secret)),
        None => {
            tracing::warn!("No session secret configured, sessions cannot be verified");
            Arc::new(StaticTokenProvider::new())
        }
    };
    builder = builder.with_identity(identity);

    let checkout_client: Arc<dyn StripeCheckoutClient> = match config.billing.secret_key.clone() {
        Some(key) => Arc::new(LiveStripeClient::new(key)?),
        None => Arc::new(UnconfiguredCheckoutClient),
    };
    builder = builder.with_checkout_client(checkout_client);

    if let Some(secret) = config.billing.webhook_secret.clone() {
        builder = builder.with_webhook_secret(secret);
    }

    let state = builder.build();
    let router = broadsheet::router(state);

    let addr = config.server.addr()?;
    tracing::info!(%addr, "Starting broadsheet server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
