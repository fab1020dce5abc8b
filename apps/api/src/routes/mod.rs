pub mod health;
pub mod index;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use crate::auth::handlers::{handle_login, handle_logout};
use crate::auth::middleware::require_session;
use crate::documents::handlers as documents;
use crate::ranking::handlers as ranking;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;

    // Everything below requires a live session.
    let protected = Router::new()
        // Documents API
        .route(
            "/api/v1/resumes",
            post(documents::handle_upload_resumes).get(documents::handle_list_resumes),
        )
        .route(
            "/api/v1/job-descriptions",
            post(documents::handle_upload_job_description)
                .get(documents::handle_list_job_descriptions),
        )
        .route(
            "/api/v1/documents/:id",
            get(documents::handle_get_document).delete(documents::handle_delete_document),
        )
        .route(
            "/original-resumes/:filename",
            get(documents::handle_original_resume),
        )
        // Ranking API
        .route("/api/v1/rankings", post(ranking::handle_rank))
        .route("/api/v1/search", post(ranking::handle_search))
        .route_layer(from_fn_with_state(state.clone(), require_session));

    Router::new()
        .route("/", get(index::index_handler))
        .route("/health", get(health::health_handler))
        .route("/login", post(handle_login))
        .route("/logout", post(handle_logout))
        .merge(protected)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}
