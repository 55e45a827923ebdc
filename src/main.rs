use std::sync::Arc;

use tower_http::cors::CorsLayer;

use chatwoot_bridge::botpress::BotpressClient;
use chatwoot_bridge::chatwoot::ChatwootClient;
use chatwoot_bridge::config::Config;
use chatwoot_bridge::rotation::AgentRotation;
use chatwoot_bridge::webhook::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    let http = reqwest::Client::new();
    let state = AppState {
        chatwoot: ChatwootClient::new(http.clone(), &config),
        botpress: BotpressClient::new(http.clone(), &config),
        rotation: Arc::new(AgentRotation::new()),
        http,
    };

    // Same allow-all CORS posture the platform webhooks were set up with.
    let app = webhook::router(state).layer(CorsLayer::very_permissive());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, "chatwoot-bridge listening");
    axum::serve(listener, app).await?;

    Ok(())
}
