use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use crate::handlers::AppState;

pub async fn metrics_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();

    let response = next.run(request).await;

    let status = response.status();
    state
        .metrics
        .record_request(method.as_str(), status.as_u16(), start.elapsed());
    if status.is_server_error() {
        tracing::warn!(%method, status = status.as_u16(), "request failed");
    }

    response
}
