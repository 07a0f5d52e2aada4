//! Broadsheet - a subscription-gated publishing backend
//!
//! Authors write posts; readers browse free posts freely and need an active
//! paid subscription to read premium posts. Built on Axum and Tokio.
//!
//! # Architecture
//!
//! - **Content**: posts with a free/premium flag and a draft/published
//!   lifecycle. The entitlement check decides, per view, whether to render
//!   the full body or the paywall placeholder.
//! - **Billing**: a local cache of each profile's subscription state, kept
//!   in sync by the provider's webhooks. The read path never calls the
//!   provider.
//! - **Accounts**: platform profiles linked to identities from a hosted
//!   auth service.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use broadsheet::{AppState, ConfigBuilder, app};
//!
//! #[tokio::main]
//! async fn main() {
//!     broadsheet::init_tracing();
//!
//!     let config = ConfigBuilder::new().from_env().build().unwrap();
//!     let state = AppState::builder().build();
//!
//!     let listener = tokio::net::TcpListener::bind(config.server.addr().unwrap())
//!         .await
//!         .unwrap();
//!     axum::serve(listener, app::router(state)).await.unwrap();
//! }
//! ```

pub mod accounts;
pub mod app;
pub mod auth;
pub mod billing;
mod config;
pub mod content;
pub mod database;
mod error;
pub mod http;

// Re-exports for public API
pub use app::{AppState, AppStateBuilder, router};
pub use config::{
    AuthConfig, BillingConfig, Config, ConfigBuilder, DatabaseConfig, LoggingConfig, ServerConfig,
};
pub use error::{AppError, Result};
pub use http::{ApiResponse, JsonResponse, RouteModule};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// This should be called early in your application, typically in main()
/// before building the state.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "broadsheet=debug")
/// - `BROADSHEET_LOG_JSON`: Set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("BROADSHEET_LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Initialize tracing with a custom configuration
pub fn init_tracing_with_config(config: &Config) {
    let env_filter = EnvFilter::new(&config.logging.level);

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
