mod config;
mod db;
mod message;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use services::persistence::FileStore;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = config::Config::from_env();

    let records = match db::open_board_records(&config).await {
        Ok(records) => records,
        Err(e) => {
            tracing::error!(error = %e, "database init failed");
            std::process::exit(1);
        }
    };
    let store = Arc::new(FileStore::new(records, config.board_save_dir.clone()));
    tracing::info!(dir = %store.dir().display(), "board snapshots directory");

    let port = config.port;
    let state = state::AppState::new(store, config);

    let app = routes::app(state);
    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %port, "failed to bind");
            std::process::exit(1);
        }
    };

    tracing::info!(%port, "lessonboard listening");
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server failed");
    }
    tracing::info!("lessonboard stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
