pub mod metrics;

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::state::AppState;

pub use metrics::*;

pub fn configure_dashboard_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/dashboard/metrics", get(get_dashboard_metrics))
}
