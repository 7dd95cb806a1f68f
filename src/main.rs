use axum::{routing::get, Json, Router};
use log::{error, info};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use supportflow::config::AppConfig;
use supportflow::state::AppState;
use supportflow::{contacts, dashboard, db, tickets};

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received, stopping server");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env()?;
    let pool = db::create_pool(&config.database_url)?;
    if let Err(e) = db::run_migrations(&pool) {
        error!("Database migration failed: {e}");
        return Err(anyhow::anyhow!("Database migration failed: {e}"));
    }

    let state = Arc::new(AppState {
        conn: pool,
        config: config.clone(),
    });

    let app = Router::new()
        .route("/health", get(health_check))
        .merge(tickets::configure_tickets_routes())
        .merge(contacts::configure_contacts_routes())
        .merge(dashboard::configure_dashboard_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("supportflow listening on {addr}");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
