//! Header filtering for proxied traffic
//!
//! Hop-by-hop headers (RFC 9110 §7.6.1) describe a single connection and
//! must not be forwarded in either direction.

use http::{HeaderMap, HeaderName, header};

/// Connection-scoped headers that never cross the proxy
pub const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Headers the edge owns on the way to the backend
///
/// Credentials are injected by the proxy itself, cookies belong to the edge
/// session, and framing headers are recomputed by the HTTP client.
pub const EDGE_OWNED_REQUEST: [HeaderName; 4] = [
    header::AUTHORIZATION,
    header::COOKIE,
    header::HOST,
    header::CONTENT_LENGTH,
];

/// Copy `headers`, dropping hop-by-hop headers, anything named by
/// `Connection`, and every header listed in `also_drop`
pub fn forwardable(headers: &HeaderMap, also_drop: &[HeaderName]) -> HeaderMap {
    let connection_scoped: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if HOP_BY_HOP.contains(name)
            || also_drop.contains(name)
            || connection_scoped.contains(name)
        {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

/// Headers safe to send to the backend
pub fn forwardable_request(headers: &HeaderMap) -> HeaderMap {
    forwardable(headers, &EDGE_OWNED_REQUEST)
}

/// Headers safe to relay back to the caller
pub fn forwardable_response(headers: &HeaderMap) -> HeaderMap {
    forwardable(headers, &[header::CONTENT_LENGTH])
}
