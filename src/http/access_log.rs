//! Per-request access log.
//!
//! Reads the [`DispatchRecord`] left in the response extensions, so the
//! negotiated versions are logged without being recomputed.

use std::time::Instant;

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;

use crate::dispatch::DispatchRecord;
use crate::http::request::RequestIdExt;

pub const X_PROCESS_TIME: HeaderName = HeaderName::from_static("x-process-time");

pub async fn access_log(request: Request<Body>, next: Next) -> Response {
    let started = Instant::now();
    let request_id = request.request_id().unwrap_or("-").to_string();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let mut response = next.run(request).await;
    let elapsed = started.elapsed();

    let record = response.extensions().get::<DispatchRecord>();
    let version = |v: Option<&crate::versioning::SemanticVersion>| {
        v.map(ToString::to_string).unwrap_or_else(|| "-".to_string())
    };
    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        group = record.and_then(|r| r.group.as_deref()).unwrap_or("-"),
        requested_version = %version(record.and_then(|r| r.requested_version.as_ref())),
        resolved_version = %version(record.and_then(|r| r.resolved_version.as_ref())),
        outcome = record.map(|r| r.outcome.as_str()).unwrap_or("-"),
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        "Request completed"
    );

    if let Ok(value) = HeaderValue::from_str(&format!("{:.6}", elapsed.as_secs_f64())) {
        response.headers_mut().insert(X_PROCESS_TIME, value);
    }
    response
}
