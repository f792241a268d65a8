//! Reqwest-based implementation of the [`HttpTransport`] trait.
//!
//! Redirects are never followed and no cookie store is attached, so each
//! account's request carries only the cookies set explicitly on it.
//!
//! URLs can carry credentials (the Telegram bot token is a path segment), so
//! only the origin is logged and errors are stripped of their URL.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, redirect::Policy};

use super::{HttpTransport, TransportError, TransportRequest, TransportResponse};

/// Reqwest-backed transport used by the check-in run and the proxy.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a client with redirects disabled and a whole-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|err| TransportError::Build(err.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let TransportRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let origin = url.origin().ascii_serialization();
        log::debug!("-> {} {}", method, origin);

        let mut builder = self.client.request(method.clone(), url.as_str()).headers(headers);
        if let Some(data) = body {
            builder = builder.body(data);
        }

        let response = builder.send().await.map_err(map_error)?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let final_url = response.url().clone();
        let success = response.status().is_success();
        let body = match response.bytes().await {
            Ok(body) => body,
            // The status alone classifies a failed response.
            Err(err) if !success => {
                log::warn!(
                    "{} {} -> {}: body unreadable: {}",
                    method,
                    origin,
                    status,
                    err.without_url()
                );
                Bytes::new()
            }
            Err(err) => return Err(map_error(err)),
        };

        log::debug!("<- {} {} -> {}", method, origin, status);

        Ok(TransportResponse {
            status,
            headers,
            body,
            url: final_url,
        })
    }
}

fn map_error(err: reqwest::Error) -> TransportError {
    let err = err.without_url();
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else {
        TransportError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use url::Url;

    /// Accept one connection, read the request head, then write `reply` and hang up.
    async fn one_shot_server(reply: &'static [u8]) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let read = socket.read(&mut buf).await.unwrap();
                if read == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..read]);
            }
            socket.write_all(reply).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        Url::parse(&format!("http://{addr}/api/user/sign_in")).unwrap()
    }

    #[tokio::test]
    async fn errors_do_not_carry_the_url() {
        let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();
        let url = Url::parse("http://127.0.0.1:1/bot123:SECRETTOKEN/sendMessage").unwrap();

        let err = transport
            .send(TransportRequest::post(url))
            .await
            .unwrap_err();

        assert!(!err.to_string().contains("SECRETTOKEN"));
    }

    #[tokio::test]
    async fn truncated_error_body_keeps_the_status() {
        let url = one_shot_server(
            b"HTTP/1.1 401 Unauthorized\r\ncontent-length: 100\r\n\r\npartial",
        )
        .await;
        let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();

        let response = transport.send(TransportRequest::post(url)).await.unwrap();

        assert_eq!(response.status, 401);
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn truncated_success_body_is_an_error() {
        let url = one_shot_server(b"HTTP/1.1 200 OK\r\ncontent-length: 100\r\n\r\n{").await;
        let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();

        let result = transport.send(TransportRequest::post(url)).await;

        assert!(matches!(result, Err(TransportError::Transport(_))));
    }
}
