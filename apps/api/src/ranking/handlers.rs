//! Axum route handlers for the Ranking API.

use axum::{extract::State, Extension, Json};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::SessionUser;
use crate::documents::store::{get_document, load_documents};
use crate::errors::AppError;
use crate::models::document::{DocumentKind, DocumentRow};
use crate::ranking::ranker::{Candidate, RankQuery, RankingReport};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RankRequest {
    pub job_description_id: Uuid,
    pub top_k: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub top_k: Option<usize>,
}

async fn load_candidates(state: &AppState) -> Result<Vec<Candidate>, AppError> {
    Ok(load_documents(&state.db, DocumentKind::Resume)
        .await?
        .into_iter()
        .map(Candidate::from)
        .collect())
}

/// Only job descriptions can be ranked against; any other id reads as unknown.
fn ensure_job_description(row: &DocumentRow) -> Result<(), AppError> {
    if row.kind != DocumentKind::JobDescription.as_str() {
        return Err(AppError::NotFound(format!(
            "Job description {} not found",
            row.id
        )));
    }
    Ok(())
}

/// POST /api/v1/rankings
///
/// Ranks every stored resume against one stored job description.
pub async fn handle_rank(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    WithRejection(Json(request), _): WithRejection<Json<RankRequest>, AppError>,
) -> Result<Json<RankingReport>, AppError> {
    let job = get_document(&state.db, request.job_description_id).await?;
    ensure_job_description(&job)?;

    let candidates = load_candidates(&state).await?;
    let query = RankQuery {
        label: job.filename,
        text: job.extracted_text,
    };
    let report = state.ranker.rank(query, candidates, request.top_k).await?;

    info!(
        "{} ranked {} resume(s) against {} ({})",
        user.username, report.total_candidates, report.query, report.metric
    );
    Ok(Json(report))
}

/// POST /api/v1/search
///
/// Ranks every stored resume against free-text search terms.
pub async fn handle_search(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    WithRejection(Json(request), _): WithRejection<Json<SearchRequest>, AppError>,
) -> Result<Json<RankingReport>, AppError> {
    let text = request.query.trim();
    if text.is_empty() {
        return Err(AppError::Validation("query cannot be empty".to_string()));
    }

    let candidates = load_candidates(&state).await?;
    let query = RankQuery {
        label: text.to_string(),
        text: text.to_string(),
    };
    let report = state.ranker.rank(query, candidates, request.top_k).await?;

    info!(
        "{} searched resumes for '{}': {} hit(s)",
        user.username,
        report.query,
        report.results.len()
    );
    Ok(Json(report))
}
