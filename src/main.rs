// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use workorder::{
    Config, api,
    cache::WorkListCache,
    repository::{WorkFilter, memory::MemoryIdentities},
    subscriber::WorkSubscriber
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_filter))
        .init();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("migrations applied");

    let board = Arc::new(WorkListCache::new(pool.clone(), WorkFilter::default()));
    {
        let board = Arc::clone(&board);
        let pool = pool.clone();
        tokio::spawn(async move {
            board.follow_reconnecting(|| WorkSubscriber::new(&pool)).await;
            warn!("works feed closed");
        });
    }

    warn!("identities are kept in process memory");
    let state = api::AppState::new(pool, MemoryIdentities::new()).with_board(board);
    let app = api::router(Arc::new(state));

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
    }
}
