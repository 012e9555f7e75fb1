//! Reverse proxy.
//!
//! The caller's request is streamed to the target and the upstream response
//! streamed back. Hop-by-hop headers are dropped in both directions; the
//! `Host` header is taken from the target URL. Upstream failures are not
//! retried.

use axum::body::{Body, HttpBody};
use axum::http::{header, HeaderMap, HeaderName, Method};
use axum::response::Response;
use futures::TryStreamExt;
use http_body_util::LengthLimitError;

use crate::error::{GatewayError, Result};

/// Headers that describe a single connection and are never forwarded.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Copy `headers` without hop-by-hop headers, including any the
/// `Connection` header names.
#[must_use]
pub fn strip_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if HOP_BY_HOP.contains(&name.as_str()) || named.contains(name) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

/// Headers sent upstream: the caller's, minus hop-by-hop headers and `Host`.
#[must_use]
pub fn outbound_headers(headers: &HeaderMap) -> HeaderMap {
    let mut out = strip_hop_by_hop(headers);
    out.remove(header::HOST);
    out
}

/// Returns `true` if `err` was caused by a request body over the size limit.
pub fn exceeds_body_limit(err: &(dyn std::error::Error + 'static)) -> bool {
    std::iter::successors(Some(err), |e| e.source()).any(|e| e.is::<LengthLimitError>())
}

/// Send the request to `url` and stream the upstream response back.
///
/// # Errors
///
/// Returns `UpstreamUnavailable` if the target cannot be reached and
/// `PayloadTooLarge` if the request body overran the size limit on the way.
pub async fn forward(
    client: &reqwest::Client,
    method: Method,
    url: &str,
    headers: &HeaderMap,
    body: Body,
) -> Result<Response> {
    let mut request = client.request(method, url).headers(outbound_headers(headers));
    if body.size_hint().exact() != Some(0) {
        request = request.body(reqwest::Body::wrap_stream(body.into_data_stream()));
    }

    let upstream = request.send().await.map_err(|e| {
        if exceeds_body_limit(&e) {
            return GatewayError::PayloadTooLarge;
        }
        tracing::warn!(url = %url, error = %e, "Upstream request failed");
        GatewayError::UpstreamUnavailable(format!("{url}: {e}"))
    })?;

    let status = upstream.status();
    let headers = strip_hop_by_hop(upstream.headers());
    tracing::debug!(url = %url, status = %status, "Upstream responded");

    let stream = upstream
        .bytes_stream()
        .inspect_err(|e| tracing::warn!(error = %e, "Upstream body interrupted"));

    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}
