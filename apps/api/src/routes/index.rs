use axum::response::Html;

/// GET /
/// The browser front end: login, uploads, job description list, ranking and search.
pub async fn index_handler() -> Html<&'static str> {
    Html(include_str!("../../static/index.html"))
}
