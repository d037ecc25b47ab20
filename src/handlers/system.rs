use crate::error::AppResult;
use crate::metrics::Metrics;
use axum::{http::header, response::IntoResponse, Extension};

#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Greeting", body = String)),
    tag = "system"
)]
pub async fn hello() -> &'static str {
    "Hello"
}

#[utoipa::path(
    get,
    path = "/healthcheck",
    responses((status = 200, description = "Service is up", body = String)),
    tag = "system"
)]
pub async fn healthcheck() -> &'static str {
    "OK"
}

#[utoipa::path(
    get,
    path = "/metrics",
    responses((status = 200, description = "Prometheus text exposition", body = String, content_type = "text/plain")),
    tag = "system"
)]
pub async fn metrics(Extension(metrics): Extension<Metrics>) -> AppResult<impl IntoResponse> {
    let body = metrics.render()?;
    Ok(([(header::CONTENT_TYPE, metrics.content_type())], body))
}
