//! ledgermerge-server entry point: tracing, config, shared state, HTTP.

use anyhow::Context;
use ledgermerge_server::{config::ServerConfig, routes, state::AppState};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing file is fine; deployments set the variables directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let config = ServerConfig::from_env().context("reading configuration")?;
    info!(
        db = %config.db_path.display(),
        staging = %config.staging_dir.display(),
        max_upload_bytes = config.max_upload_bytes,
        strategy = config.diff.match_strategy.as_str(),
        "configuration loaded"
    );

    let addr = config.addr;
    let shared = tokio::task::spawn_blocking(move || AppState::open(&config))
        .await
        .context("startup task failed")?
        .context("opening ledger")?;

    let app = routes::build_router(shared).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("ledgermerge-server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    info!("server stopped");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
