use anyhow::Result;
use axum::Router;
use std::{io::ErrorKind, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use gitdrop::config::AppConfig;
use gitdrop::routes;
use gitdrop::services::{github_store::GitHubStore, rate_limit::RateLimiter};
use gitdrop::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = AppConfig::from_env_and_args()?;

    // Log the interesting fields individually; the token stays out of the logs.
    tracing::info!(
        owner = %cfg.github_owner,
        repo = %cfg.github_repo,
        branch = %cfg.github_branch,
        max_file_size = cfg.max_file_size,
        rate_limit_max = cfg.rate_limit_max_requests,
        rate_limit_window_ms = cfg.rate_limit_window_ms,
        "Starting gitdrop"
    );

    // --- Initialize core services ---
    let store = Arc::new(GitHubStore::new(
        cfg.github_owner.clone(),
        cfg.github_repo.clone(),
        cfg.github_branch.clone(),
        cfg.github_token.clone(),
    ));
    let limiter = RateLimiter::new(
        cfg.rate_limit_max_requests,
        Duration::from_millis(cfg.rate_limit_window_ms),
    );
    let app_state = AppState {
        store,
        limiter,
        max_file_size: cfg.max_file_size,
        public_base_url: cfg.public_base_url.clone(),
    };

    // --- Build router ---
    let app: Router = routes::routes::routes(cfg.max_file_size).with_state(app_state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
