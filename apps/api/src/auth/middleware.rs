use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use tracing::warn;

use crate::auth::{SessionUser, SESSION_COOKIE};
use crate::errors::AppError;
use crate::state::AppState;

/// Rejects requests without a live session; otherwise attaches `SessionUser`.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty());

    let Some(token) = token else {
        warn!("Session cookie missing, access denied");
        return Err(AppError::Unauthorized);
    };

    match state.sessions.lookup(&token).await? {
        Some(username) => {
            request.extensions_mut().insert(SessionUser { username });
            Ok(next.run(request).await)
        }
        None => {
            warn!("Unknown or expired session, access denied");
            Err(AppError::Unauthorized)
        }
    }
}
