//! Asset rewrite middleware.
//!
//! Wraps the origin handler and rewrites the bodies of proxied responses so
//! that asset URLs point at the canonical host.
//!
//! # Data Flow
//! ```text
//! Request
//!     → settings snapshot + proxy detection (before the handler)
//!     → wrapped handler
//!     → X-Robots-Tag (every response)
//!     → gate: proxied? textual? identity encoding? within limit?
//!     → buffer body
//!     → ResponseTransformer (HTML / JSON)
//!     → new body, Content-Length dropped
//! ```
//!
//! # Design Decisions
//! - Bodies that cannot be rewritten are streamed through untouched,
//!   including bodies that overflow the buffer limit mid-stream
//! - A body error while buffering is replayed to the client as is
//! - The transformer runs inline; sprite reads are small local files

use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::{
    body::{Body, BodyDataStream, Bytes},
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use futures_util::{stream, StreamExt};

use crate::config::{ProxySettings, ThemeConfig};
use crate::http::request::request_id;
use crate::observability::metrics;
use crate::proxy::is_proxy_request;
use crate::rewrite::transformer::apply_robots_header;
use crate::rewrite::{ContentKind, Outcome, Passthrough, ResponseTransformer, SpriteSource};

/// Shared state of the rewrite middleware.
#[derive(Clone)]
pub struct RewriteState {
    /// Current rewrite settings, swapped on config reload.
    pub settings: Arc<ArcSwap<ProxySettings>>,
    /// Canonical external hostname, resolved once at startup.
    pub hostname: Arc<str>,
    pub theme: Arc<ThemeConfig>,
    pub sprites: Arc<dyn SpriteSource>,
    /// Add `X-Robots-Tag: noindex, nofollow` to every response.
    pub robots_noindex: bool,
    /// Largest body buffered for rewriting.
    pub max_body_size: usize,
}

pub async fn asset_rewrite_middleware(
    State(state): State<RewriteState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let settings = state.settings.load_full();
    let proxied = is_proxy_request(&request, &settings);
    let request_id = request_id(&request).to_string();
    let path = request.uri().path().to_string();

    let mut response = next.run(request).await;
    apply_robots_header(response.headers_mut(), state.robots_noindex);

    if !proxied {
        return passthrough(response, Passthrough::NotProxied);
    }

    let kind = ContentKind::from_content_type(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
    );
    if kind == ContentKind::Opaque {
        return passthrough(response, Passthrough::Opaque);
    }
    if is_encoded(response.headers()) {
        return passthrough(response, Passthrough::Encoded);
    }

    let (mut parts, body) = response.into_parts();
    let body = match buffer_body(body, state.max_body_size).await {
        Buffered::Complete(body) => body,
        Buffered::Overflow(body) => {
            tracing::debug!(
                request_id = %request_id,
                path = %path,
                limit = state.max_body_size,
                "Response body too large to rewrite"
            );
            return passthrough(Response::from_parts(parts, body), Passthrough::TooLarge);
        }
        Buffered::Failed(body) => {
            tracing::warn!(
                request_id = %request_id,
                path = %path,
                "Origin body failed while buffering"
            );
            return passthrough(Response::from_parts(parts, body), Passthrough::BodyError);
        }
    };

    let transformer = ResponseTransformer::new(
        &state.hostname,
        &settings,
        &state.theme,
        state.sprites.as_ref(),
    );

    match transformer.transform(kind, &body) {
        Outcome::Rewritten(rewritten) => {
            tracing::debug!(
                request_id = %request_id,
                path = %path,
                kind = kind.as_str(),
                "Response rewritten"
            );
            metrics::record_rewrite(kind.as_str());
            parts.headers.remove(header::CONTENT_LENGTH);
            Response::from_parts(parts, Body::from(rewritten))
        }
        Outcome::Unchanged(reason) => {
            passthrough(Response::from_parts(parts, Body::from(body)), reason)
        }
    }
}

fn passthrough(response: Response, reason: Passthrough) -> Response {
    metrics::record_passthrough(reason.as_str());
    response
}

fn is_encoded(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| !v.trim().eq_ignore_ascii_case("identity"))
}

enum Buffered {
    Complete(Bytes),
    /// Over the limit; the body replays what was read, then the rest.
    Overflow(Body),
    /// The stream errored; the body replays what was read, then the error.
    Failed(Body),
}

async fn buffer_body(body: Body, limit: usize) -> Buffered {
    use axum::body::HttpBody;

    if body.size_hint().lower() as usize > limit {
        return Buffered::Overflow(body);
    }

    let mut stream = body.into_data_stream();
    let mut chunks: Vec<Bytes> = Vec::new();
    let mut size = 0usize;

    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(chunk) => {
                size += chunk.len();
                chunks.push(chunk);
                if size > limit {
                    return Buffered::Overflow(replay(chunks, stream));
                }
            }
            Err(e) => {
                let read = stream::iter(chunks.into_iter().map(Ok));
                let failed = stream::iter(std::iter::once(Err(e)));
                return Buffered::Failed(Body::from_stream(read.chain(failed)));
            }
        }
    }

    let mut buffer = Vec::with_capacity(size);
    for chunk in &chunks {
        buffer.extend_from_slice(chunk);
    }
    Buffered::Complete(Bytes::from(buffer))
}

fn replay(chunks: Vec<Bytes>, rest: BodyDataStream) -> Body {
    let read = stream::iter(chunks.into_iter().map(Ok::<_, axum::Error>));
    Body::from_stream(read.chain(rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(body: Body) -> Vec<u8> {
        axum::body::to_bytes(body, usize::MAX).await.unwrap().to_vec()
    }

    #[tokio::test]
    async fn test_buffer_complete() {
        match buffer_body(Body::from("hello"), 16).await {
            Buffered::Complete(bytes) => assert_eq!(&bytes[..], b"hello"),
            _ => panic!("expected a complete body"),
        }
    }

    #[tokio::test]
    async fn test_overflow_replays_whole_body() {
        let chunks = vec![
            Ok::<_, std::io::Error>(Bytes::from_static(b"abcd")),
            Ok(Bytes::from_static(b"efgh")),
            Ok(Bytes::from_static(b"ijkl")),
        ];
        let body = Body::from_stream(stream::iter(chunks));

        match buffer_body(body, 6).await {
            Buffered::Overflow(body) => assert_eq!(collect(body).await, b"abcdefghijkl"),
            _ => panic!("expected an overflow"),
        }
    }

    #[tokio::test]
    async fn test_known_length_over_limit_is_not_read() {
        match buffer_body(Body::from("0123456789"), 4).await {
            Buffered::Overflow(body) => assert_eq!(collect(body).await, b"0123456789"),
            _ => panic!("expected an overflow"),
        }
    }

    #[test]
    fn test_is_encoded() {
        let mut headers = HeaderMap::new();
        assert!(!is_encoded(&headers));
        headers.insert(header::CONTENT_ENCODING, "identity".parse().unwrap());
        assert!(!is_encoded(&headers));
        headers.insert(header::CONTENT_ENCODING, "gzip".parse().unwrap());
        assert!(is_encoded(&headers));
    }
}
