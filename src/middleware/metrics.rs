use crate::metrics::Metrics;
use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
    Extension,
};
use std::time::Instant;

/// Record method, route template, status and latency of every routed request.
pub async fn track_metrics(
    Extension(metrics): Extension<Metrics>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;
    metrics.record(&method, &path, response.status().as_u16(), started.elapsed());
    response
}
