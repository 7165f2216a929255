use std::time::Instant;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::{error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let ctx = RequestContext {
        request_id: Uuid::new_v4(),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(ctx);
    response
}

/// Log every 4xx/5xx with the `ErrorReport` the handler attached, if any.
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id);

    let mut response = next.run(request).await;
    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        let report = response.extensions_mut().remove::<ErrorReport>();
        log_failure(FailedRequest {
            status,
            method,
            path,
            request_id,
            elapsed_ms: started.elapsed().as_millis(),
            report,
        });
    }
    response
}

struct FailedRequest {
    status: StatusCode,
    method: Method,
    path: String,
    request_id: Option<Uuid>,
    elapsed_ms: u128,
    report: Option<ErrorReport>,
}

fn log_failure(failed: FailedRequest) {
    let (source, chain) = failed
        .report
        .map(|report| (report.source, report.messages))
        .unwrap_or(("unknown", Vec::new()));
    let detail = chain.first().map(String::as_str).unwrap_or("no diagnostic");
    let request_id = failed.request_id.map(|id| id.to_string()).unwrap_or_default();

    if failed.status.is_server_error() {
        error!(
            target = "tagfeed::http::response",
            status = failed.status.as_u16(),
            method = %failed.method,
            path = %failed.path,
            elapsed_ms = failed.elapsed_ms,
            source,
            detail,
            chain = ?chain,
            request_id,
            "request failed"
        );
    } else {
        warn!(
            target = "tagfeed::http::response",
            status = failed.status.as_u16(),
            method = %failed.method,
            path = %failed.path,
            elapsed_ms = failed.elapsed_ms,
            source,
            detail,
            request_id,
            "client request error"
        );
    }
}
