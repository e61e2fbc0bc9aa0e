//! Per-request HTTP metrics.

use std::time::Instant;

use {
    axum::{body::Body, http::Request, middleware::Next, response::Response},
    botdeck_metrics::{counter, gauge, histogram, http as http_metrics, labels},
};

/// Records request count, duration and in-flight gauge, labelled by a
/// normalised endpoint so record ids do not explode cardinality.
pub async fn http_metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let endpoint = normalize_path(request.uri().path());

    gauge!(http_metrics::REQUESTS_IN_FLIGHT, labels::ENDPOINT => endpoint.clone(), labels::METHOD => method.clone())
        .increment(1.0);

    let response = next.run(request).await;
    let status = response.status().as_u16().to_string();

    counter!(
        http_metrics::REQUESTS_TOTAL,
        labels::ENDPOINT => endpoint.clone(),
        labels::METHOD => method.clone(),
        labels::STATUS => status.clone()
    )
    .increment(1);
    histogram!(
        http_metrics::REQUEST_DURATION_SECONDS,
        labels::ENDPOINT => endpoint.clone(),
        labels::METHOD => method.clone(),
        labels::STATUS => status
    )
    .record(start.elapsed().as_secs_f64());
    gauge!(http_metrics::REQUESTS_IN_FLIGHT, labels::ENDPOINT => endpoint, labels::METHOD => method)
        .decrement(1.0);

    response
}

/// Replace id-like path segments (UUIDs, Discord snowflakes) with `{id}`.
fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|segment| {
            let numeric = segment.chars().all(|c| c.is_ascii_digit());
            if numeric || uuid::Uuid::try_parse(segment).is_ok() {
                "{id}"
            } else {
                segment
            }
        })
        .collect();
    format!("/{}", segments.join("/"))
}
