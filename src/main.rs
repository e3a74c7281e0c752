use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::limit::RequestBodyLimitLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crm_account_gateway::api::app;
use crm_account_gateway::config::Config;
use crm_account_gateway::api::handlers::AppState;

/// Main entry point for the application.
///
/// Initializes tracing, loads configuration, builds the CRM client (with its
/// token cache) and the parent-link store, then serves the API.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crm_account_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    let state = AppState::new(config.clone()).map_err(|e| anyhow::anyhow!(e))?;
    tracing::info!("CRM client initialized: {}", config.crm_api_base());
    tracing::info!(
        "Parent link store initialized ({}s TTL)",
        config.parent_link_ttl_secs
    );
    let app_state = Arc::new(state);

    // Configure rate limiter per client IP
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(config.rate_limit_per_second)
            .burst_size(config.rate_limit_burst)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    // Build protected routes with security layers
    let protected_routes = app::api_routes().layer(
        ServiceBuilder::new()
            .layer(RequestBodyLimitLayer::new(app::MAX_BODY_BYTES))
            .layer(GovernorLayer {
                config: governor_conf,
            }),
    );

    // Health check bypasses rate limiting
    let router = app::with_shared_layers(protected_routes, app_state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server is running on {}", addr);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
