//! Telemetry utilities for tracking per-request metrics.
//!
//! Database work per request is counted through a task-local counter: the
//! outermost middleware installs the counter for the request's task, diesel
//! connection instrumentation bumps it on every executed query, and the
//! request log line reports the total. Listing endpoints are expected to
//! hold a constant query count no matter how many rows they return; this
//! is how regressions get spotted.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

tokio::task_local! {
    /// Task-local counter for database queries in the current request.
    /// This follows the async task across await points and thread migrations.
    static DB_QUERY_COUNTER: Arc<AtomicU32>;
}

/// Get the current database query count for this request, if available.
pub fn get_query_count() -> Option<u32> {
    DB_QUERY_COUNTER
        .try_with(|counter| counter.load(Ordering::Relaxed))
        .ok()
}

/// Bump the counter for the current request. No-op outside a request scope
/// (startup migrations, CLI use of the models).
pub fn record_db_query() {
    let _ = DB_QUERY_COUNTER.try_with(|counter| {
        counter.fetch_add(1, Ordering::Relaxed);
    });
}

/// Middleware that initializes the per-request database query counter.
///
/// This must be added to the router AFTER the TraceLayer (so it runs BEFORE
/// the trace span is created, wrapping the entire request lifecycle).
pub async fn query_counting_middleware(request: Request<Body>, next: Next) -> Response {
    let counter = Arc::new(AtomicU32::new(0));
    DB_QUERY_COUNTER.scope(counter, next.run(request)).await
}

/// Middleware that adds X-DB-Query-Count header to responses.
/// Only enabled when TRACK_DB_QUERY_COUNT=1 environment variable is set.
pub async fn db_query_count_header_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;

    if std::env::var("TRACK_DB_QUERY_COUNT")
        .map(|v| v == "1")
        .unwrap_or(false)
    {
        if let Some(count) = get_query_count() {
            if let Ok(value) = axum::http::header::HeaderValue::from_str(&count.to_string()) {
                response.headers_mut().insert("X-DB-Query-Count", value);
            }
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_count_unavailable_outside_request_scope() {
        assert_eq!(get_query_count(), None);
        // Recording outside a scope is a no-op rather than a panic
        record_db_query();
        assert_eq!(get_query_count(), None);
    }

    #[tokio::test]
    async fn test_query_count_tracks_within_scope() {
        let counter = Arc::new(AtomicU32::new(0));
        DB_QUERY_COUNTER
            .scope(counter, async {
                assert_eq!(get_query_count(), Some(0));
                record_db_query();
                record_db_query();
                assert_eq!(get_query_count(), Some(2));
            })
            .await;
    }
}
