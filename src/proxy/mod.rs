//! Reverse proxy that injects the challenge cookie.
//!
//! `/` answers a health check. Every other request derives a fresh
//! `acw_sc__v2` cookie for the same path on the upstream, merges it into the
//! caller's cookies, and relays the upstream response as-is.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{
        HeaderMap, HeaderValue, Method, StatusCode,
        header::{CONNECTION, CONTENT_LENGTH, COOKIE, HOST, ORIGIN, REFERER, TRANSFER_ENCODING},
    },
    response::{IntoResponse, Response},
    routing::any,
};
use url::Url;

use crate::challenge::fetch_challenge_cookie;
use crate::signin::DEFAULT_USER_AGENT;
use crate::transport::{HttpTransport, TransportRequest, origin_from_url};

const DEFAULT_BODY_LIMIT: usize = 8 << 20;

/// Shared handler state.
#[derive(Clone)]
pub struct ProxyState {
    transport: Arc<dyn HttpTransport>,
    upstream: Url,
    user_agent: String,
    body_limit: usize,
}

impl ProxyState {
    pub fn new(transport: Arc<dyn HttpTransport>, upstream: Url) -> Self {
        Self {
            transport,
            upstream,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }
}

pub fn router(state: ProxyState) -> Router {
    Router::new()
        .route("/", any(health))
        .fallback(forward)
        .with_state(state)
}

/// Bind `addr` and serve the proxy until the process stops.
pub async fn serve(addr: SocketAddr, state: ProxyState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("proxy listening on {} -> {}", addr, state.upstream);
    axum::serve(listener, router(state)).await
}

async fn health() -> &'static str {
    "AnyRouter Proxy OK"
}

async fn forward(State(state): State<ProxyState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();

    let mut target = state.upstream.clone();
    target.set_path(parts.uri.path());
    target.set_query(parts.uri.query());

    let Some(cookie) =
        fetch_challenge_cookie(state.transport.as_ref(), &target, &state.user_agent).await
    else {
        return (StatusCode::BAD_GATEWAY, "Failed to obtain acw_sc__v2 cookie").into_response();
    };

    let mut headers = parts.headers.clone();
    let Some(merged) = merge_cookies(&cookie.header_pair(), &parts.headers) else {
        return (StatusCode::BAD_REQUEST, "invalid cookie header").into_response();
    };
    headers.insert(COOKIE, merged);
    headers.remove(CONTENT_LENGTH);

    let origin = origin_from_url(&state.upstream);
    let rewritten = [
        (ORIGIN, origin.clone()),
        (REFERER, format!("{origin}/")),
        (HOST, host_header(&state.upstream)),
    ];
    for (name, value) in rewritten {
        match HeaderValue::from_str(&value) {
            Ok(value) => {
                headers.insert(name, value);
            }
            Err(_) => {
                return (StatusCode::BAD_GATEWAY, "invalid upstream origin").into_response();
            }
        }
    }

    let mut outbound = TransportRequest::new(parts.method.clone(), target).with_headers(headers);
    if parts.method != Method::GET && parts.method != Method::HEAD {
        match to_bytes(body, state.body_limit).await {
            Ok(bytes) => outbound = outbound.with_body(bytes),
            Err(err) => {
                return (StatusCode::PAYLOAD_TOO_LARGE, err.to_string()).into_response();
            }
        }
    }

    match state.transport.send(outbound).await {
        Ok(upstream) => {
            let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
            let mut relayed = upstream.headers;
            relayed.remove(TRANSFER_ENCODING);
            relayed.remove(CONNECTION);

            let mut response = Response::new(Body::from(upstream.body));
            *response.status_mut() = status;
            *response.headers_mut() = relayed;
            response
        }
        Err(err) => {
            log::warn!("proxy forward failed: {err}");
            (StatusCode::BAD_GATEWAY, err.to_string()).into_response()
        }
    }
}

/// Derived cookie first, then whatever cookies the caller sent.
fn merge_cookies(derived: &str, incoming: &HeaderMap) -> Option<HeaderValue> {
    let mut value = derived.as_bytes().to_vec();
    for existing in incoming.get_all(COOKIE) {
        if existing.is_empty() {
            continue;
        }
        value.extend_from_slice(b"; ");
        value.extend_from_slice(existing.as_bytes());
    }
    HeaderValue::from_bytes(&value).ok()
}

fn host_header(url: &Url) -> String {
    match url.port() {
        Some(port) => format!("{}:{port}", url.host_str().unwrap_or_default()),
        None => url.host_str().unwrap_or_default().to_string(),
    }
}
