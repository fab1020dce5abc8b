use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::SessionStore;
use crate::config::Config;
use crate::documents::store::ObjectStore;
use crate::ranking::ranker::Ranker;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub sessions: SessionStore,
    /// Original uploaded files.
    pub objects: ObjectStore,
    pub config: Config,
    /// Pluggable ranker. Default: KnnRanker with the metric from RANK_METRIC.
    pub ranker: Arc<dyn Ranker>,
}
