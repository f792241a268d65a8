//! HTTP transport abstraction shared by the challenge, sign-in, notification,
//! and proxy layers.
//!
//! Everything above this module talks to the network through
//! [`HttpTransport`], so tests can swap in canned responses without a socket.

mod reqwest_client;

pub use reqwest_client::ReqwestTransport;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::Method;
use thiserror::Error;
use url::Url;

/// Contract implemented by the concrete HTTP client.
///
/// Implementations must not follow redirects and must not keep a shared
/// cookie jar; every request carries exactly the cookies set in its headers.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// Outbound request handed to an [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl TransportRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Insert a header, rejecting values that are not valid header text.
    pub fn with_header(
        mut self,
        name: HeaderName,
        value: impl AsRef<str>,
    ) -> Result<Self, TransportError> {
        let value = HeaderValue::from_str(value.as_ref())
            .map_err(|_| TransportError::InvalidHeader(name.to_string()))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Fully buffered response returned by an [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub url: Url,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to build http client: {0}")]
    Build(String),
    #[error("invalid header '{0}'")]
    InvalidHeader(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("http transport error: {0}")]
    Transport(String),
}

/// Build an origin string (`scheme://host[:port]`) from a URL.
pub fn origin_from_url(url: &Url) -> String {
    let mut origin = format!("{}://{}", url.scheme(), url.host_str().unwrap_or(""));
    if let Some(port) = url.port() {
        origin.push(':');
        origin.push_str(&port.to_string());
    }
    origin
}

#[cfg(test)]
pub(crate) mod testing {
    //! Canned transport used by the unit tests of the higher layers.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Scripted reply for a single request.
    pub enum Reply {
        Respond(u16, String),
        Fail(String),
    }

    /// Replays scripted replies in order and records every request it sees.
    pub struct StubTransport {
        replies: Mutex<VecDeque<Reply>>,
        pub requests: Mutex<Vec<TransportRequest>>,
    }

    impl StubTransport {
        pub fn new(replies: Vec<Reply>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn request(&self, index: usize) -> TransportRequest {
            self.requests.lock().unwrap()[index].clone()
        }
    }

    #[async_trait]
    impl HttpTransport for StubTransport {
        async fn send(
            &self,
            request: TransportRequest,
        ) -> Result<TransportResponse, TransportError> {
            let url = request.url.clone();
            self.requests.lock().unwrap().push(request);
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("no more stub replies");
            match reply {
                Reply::Respond(status, body) => Ok(TransportResponse {
                    status,
                    headers: HeaderMap::new(),
                    body: Bytes::from(body),
                    url,
                }),
                Reply::Fail(detail) => Err(TransportError::Transport(detail)),
            }
        }
    }

    /// Page body carrying a challenge token the way the upstream embeds it.
    pub fn challenge_page(token: &str) -> String {
        format!("<html><script>var arg1='{token}';var _0x4818=['\\x63\\x6f'];</script></html>")
    }
}
