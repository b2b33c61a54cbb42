//! knet-server binary: configuration, logging, router assembly and serve
//! loop.

use anyhow::Context;
use knet::{
    api::routes::create_router, cli::Cli, AppState, Config, GeminiClient, SessionRegistry,
    WebScraperFactory,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();

    let default_filter = if cli.verbose { "knet=debug,info" } else { "knet=info,warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env()
        .map_err(|e| anyhow::anyhow!("{}", e))
        .context("loading configuration")?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let llm = Arc::new(GeminiClient::new(
        config.llm.google_api_key.clone(),
        config.llm.model.clone(),
    ));
    tracing::info!(model = %config.llm.model, "generation client ready");

    let state = AppState {
        config: Arc::new(config.clone()),
        llm,
        scrapers: Arc::new(WebScraperFactory),
        sessions: Arc::new(SessionRegistry::new()),
    };

    let app = create_router()
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!(addr = %addr, "knet-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install ctrl-c handler");
        return;
    }
    tracing::info!("shutdown signal received");
}
