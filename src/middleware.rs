use axum::{
    extract::Request,
    http::uri::{PathAndQuery, Uri},
    middleware::Next,
    response::Response,
};
use tracing::info;

/// Collapses runs of slashes in the request path, so `//api//movies`
/// routes like `/api/movies`. Must run before routing.
pub async fn normalize_path(mut req: Request, next: Next) -> Response {
    if let Some(uri) = collapse_slashes(req.uri()) {
        *req.uri_mut() = uri;
    }
    next.run(req).await
}

fn collapse_slashes(uri: &Uri) -> Option<Uri> {
    let path = uri.path();
    if !path.contains("//") {
        return None;
    }

    let mut normalized = String::with_capacity(path.len());
    for c in path.chars() {
        if c == '/' && normalized.ends_with('/') {
            continue;
        }
        normalized.push(c);
    }
    if let Some(query) = uri.query() {
        normalized.push('?');
        normalized.push_str(query);
    }

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(normalized.parse::<PathAndQuery>().ok()?);
    Uri::from_parts(parts).ok()
}

pub async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();

    let response = next.run(req).await;

    let status = response.status().as_u16();
    let content_length = response
        .headers()
        .get(axum::http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);

    info!(
        method = %method,
        url = %uri,
        status = status,
        length = content_length,
        "HTTP request"
    );

    response
}
