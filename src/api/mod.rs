pub mod countries;
pub mod sources;

use axum::{routing::get, Router};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::refresh::Refresher;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub refresher: Arc<Refresher>,
    pub summary_path: PathBuf,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(countries::root))
        .merge(countries::routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
