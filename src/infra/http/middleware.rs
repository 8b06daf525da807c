use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{AuthContext, auth::header_username};
use crate::application::error::ErrorReport;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request identity shared with handlers through extensions.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub request_id: String,
    /// Username from the proxy header, before any provisioning.
    pub viewer: Option<String>,
}

impl RequestContext {
    fn viewer_label(&self) -> &str {
        self.viewer.as_deref().unwrap_or("-")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Served,
    LoginRequired,
    ClientError,
    ServerError,
}

fn classify(status: StatusCode, location: Option<&str>, login_url: &str) -> Outcome {
    if status.is_server_error() {
        Outcome::ServerError
    } else if status.is_client_error() {
        Outcome::ClientError
    } else if status.is_redirection() && location.is_some_and(|to| to.starts_with(login_url)) {
        Outcome::LoginRequired
    } else {
        Outcome::Served
    }
}

/// Tag the request with an id and the viewer, then log how it ended.
///
/// Failed responses are logged together with the `ErrorReport` attached by the
/// handler; anonymous hits on member pages are logged once at info.
pub async fn trace_requests(
    State(auth): State<AuthContext>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let ctx = RequestContext {
        request_id: Uuid::new_v4().to_string(),
        viewer: header_username(request.headers(), &auth.user_header).map(str::to_owned),
    };
    request.extensions_mut().insert(ctx.clone());

    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let mut response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = start.elapsed().as_millis();

    if let Ok(value) = HeaderValue::from_str(&ctx.request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok());

    match classify(status, location, &auth.login_url) {
        Outcome::Served => debug!(
            target = "yatube::http::response",
            status = status.as_u16(),
            method = %method,
            path = %uri.path(),
            viewer = ctx.viewer_label(),
            elapsed_ms,
            request_id = %ctx.request_id,
            "request served",
        ),
        Outcome::LoginRequired => info!(
            target = "yatube::http::response",
            method = %method,
            path = %uri.path(),
            request_id = %ctx.request_id,
            "anonymous visitor sent to login",
        ),
        outcome => {
            let report = response.extensions_mut().remove::<ErrorReport>();
            let (source, messages) = match report {
                Some(report) => (report.source, report.messages),
                None => ("unknown", Vec::new()),
            };
            let detail = messages
                .first()
                .cloned()
                .unwrap_or_else(|| "no diagnostic available".to_string());

            if outcome == Outcome::ServerError {
                error!(
                    target = "yatube::http::response",
                    status = status.as_u16(),
                    method = %method,
                    path = %uri.path(),
                    query = uri.query().unwrap_or(""),
                    viewer = ctx.viewer_label(),
                    elapsed_ms,
                    source,
                    detail = %detail,
                    chain = ?messages,
                    request_id = %ctx.request_id,
                    "request failed",
                );
            } else {
                warn!(
                    target = "yatube::http::response",
                    status = status.as_u16(),
                    method = %method,
                    path = %uri.path(),
                    viewer = ctx.viewer_label(),
                    source,
                    detail = %detail,
                    request_id = %ctx.request_id,
                    "client request error",
                );
            }
        }
    }

    response.extensions_mut().insert(ctx);
    response
}
