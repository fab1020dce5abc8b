//! Axum route handlers for login and logout.

use axum::{extract::State, response::Redirect, Form};
use axum_extra::extract::{
    cookie::{Cookie, CookieJar, SameSite},
    WithRejection,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::auth::{verify_credentials, SESSION_COOKIE};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// POST /login
///
/// Verifies the admin credentials, opens a session and redirects home.
pub async fn handle_login(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Form(form), _): WithRejection<Form<LoginForm>, AppError>,
) -> Result<(CookieJar, Redirect), AppError> {
    if let Err(e) = verify_credentials(&state.config, &form.username, &form.password) {
        warn!("Rejected login for '{}': {e}", form.username);
        return Err(e);
    }

    let token = state.sessions.create(&form.username).await?;
    info!("User '{}' logged in", form.username);

    let cookie = Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/");
    Ok((jar.add(cookie), Redirect::to("/")))
}

/// POST /logout
///
/// Ends the current session if there is one. Always succeeds.
pub async fn handle_logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), AppError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.destroy(cookie.value()).await?;
        info!("Session closed");
    }
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((jar, Redirect::to("/")))
}
