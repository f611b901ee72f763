//! Single-page web UI

use axum::response::Html;

const INDEX_HTML: &str = include_str!("../../../assets/index.html");

/// GET / - question box, answer, source chunks and sidebar
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
