pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::content::handlers as content;
use crate::export::handlers as export;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Content API
        .route("/api/v1/view-model", post(content::handle_build_view_model))
        .route("/api/v1/professions", get(content::handle_search_professions))
        .route("/api/v1/templates", get(content::handle_list_templates))
        // Export API
        .route("/api/v1/export/:format", post(export::handle_export))
        .route(
            "/api/v1/export/:format/from-content",
            post(export::handle_export_from_content),
        )
        .with_state(state)
}
