//! Streaming relay
//! ---------------
//! Fetches an object through a minted credential (or the public avatar
//! bucket) and forwards the byte stream to the caller. The body is never
//! buffered: axum polls the reqwest stream on demand, so the outbound
//! write rate governs the upstream read rate, and a caller disconnect
//! drops the upstream connection.

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;
use futures_util::StreamExt;

use crate::error::{AppError, AppResult};

/// Relay the object behind `signed_url` with the cross-origin headers the
/// front end needs. The URL itself must never appear in an error surface.
pub async fn stream_signed_url(
    http: &reqwest::Client,
    signed_url: &str,
    webapp_origin: &str,
) -> AppResult<Response> {
    let upstream = http
        .get(signed_url)
        .send()
        .await
        // without_url: the credential must not surface, not even in logs
        .map_err(|e| AppError::Upstream(format!("object store fetch failed: {}", e.without_url())))?;

    let status = upstream.status();
    if !status.is_success() {
        return Err(AppError::Upstream(format!("object store returned {status}")));
    }

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, webapp_origin)
        .header(header::ACCESS_CONTROL_ALLOW_METHODS, "GET")
        .header(header::ACCESS_CONTROL_ALLOW_CREDENTIALS, "true");
    if let Some(ct) = upstream.headers().get(header::CONTENT_TYPE) {
        builder = builder.header(header::CONTENT_TYPE, ct.clone());
    }
    if let Some(cl) = upstream.headers().get(header::CONTENT_LENGTH) {
        builder = builder.header(header::CONTENT_LENGTH, cl.clone());
    }

    let body = Body::from_stream(
        upstream
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other)),
    );
    builder
        .body(body)
        .map_err(|e| AppError::Internal(format!("building relay response: {e}")))
}

/// Avatar passthrough: proxy `{endpoint}/{bucket}/{key}` with permissive
/// cross-origin headers, forwarding the upstream status as-is. Avatar
/// objects are public by construction, so no authorization applies.
pub async fn stream_avatar(
    http: &reqwest::Client,
    endpoint: &str,
    bucket: &str,
    key: &str,
) -> AppResult<Response> {
    let raw = format!("{}/{}/{}", endpoint, bucket, key);
    let url = reqwest::Url::parse(&raw)
        .map_err(|_| AppError::MalformedRequest("Missing required parameters".to_string()))?;

    let upstream = http
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::Upstream(format!("avatar fetch failed: {e}")))?;

    let mut builder = Response::builder()
        .status(upstream.status())
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .header(header::ACCESS_CONTROL_ALLOW_METHODS, "*");
    if let Some(ct) = upstream.headers().get(header::CONTENT_TYPE) {
        builder = builder.header(header::CONTENT_TYPE, ct.clone());
    }
    if let Some(cl) = upstream.headers().get(header::CONTENT_LENGTH) {
        builder = builder.header(header::CONTENT_LENGTH, cl.clone());
    }

    let body = Body::from_stream(
        upstream
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other)),
    );
    builder
        .body(body)
        .map_err(|e| AppError::Internal(format!("building avatar response: {e}")))
}
