//! Authenticated sign-in request.
//!
//! Derives a fresh challenge cookie, POSTs the sign-in with that cookie and the
//! account's session, and classifies whatever comes back. Every failure is
//! returned as a [`SignInOutcome`], never as an error.

mod classify;

pub use classify::{DEFAULT_SUCCESS_MESSAGE, UnrecognizedResponsePolicy, classify_response};

use std::fmt;
use std::sync::Arc;

use http::header::{ACCEPT, CONTENT_TYPE, COOKIE, ORIGIN, REFERER, USER_AGENT};
use url::Url;

use crate::challenge::{SIGN_IN_PATH, derive_cookie_with_fallback};
use crate::transport::{HttpTransport, TransportError, TransportRequest, origin_from_url};

/// Browser user-agent presented to the upstream.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Opaque per-account credential (the upstream's `session` cookie).
///
/// `Debug` and `Display` are redacted so the value never reaches a log line.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// Result of one account's sign-in attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInOutcome {
    pub success: bool,
    pub message: String,
}

impl SignInOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Issues sign-in requests against one upstream.
#[derive(Clone)]
pub struct SignInClient {
    transport: Arc<dyn HttpTransport>,
    upstream: Url,
    user_agent: String,
    policy: UnrecognizedResponsePolicy,
}

impl SignInClient {
    pub fn new(transport: Arc<dyn HttpTransport>, upstream: Url) -> Self {
        Self {
            transport,
            upstream,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            policy: UnrecognizedResponsePolicy::default(),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_policy(mut self, policy: UnrecognizedResponsePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn upstream(&self) -> &Url {
        &self.upstream
    }

    /// Sign in one account.
    pub async fn sign_in(&self, session: &SessionToken) -> SignInOutcome {
        let Some((cookie, _)) =
            derive_cookie_with_fallback(self.transport.as_ref(), &self.upstream, &self.user_agent)
                .await
        else {
            return SignInOutcome::failure("cookie derivation failed");
        };

        let request = match self.build_request(&cookie.header_pair(), session) {
            Ok(request) => request,
            Err(err) => return SignInOutcome::failure(format!("request error: {err}")),
        };

        match self.transport.send(request).await {
            Ok(response) => classify_response(response.status, &response.text(), self.policy),
            Err(err) => SignInOutcome::failure(format!("request error: {err}")),
        }
    }

    fn build_request(
        &self,
        cookie: &str,
        session: &SessionToken,
    ) -> Result<TransportRequest, TransportError> {
        let url = self
            .upstream
            .join(SIGN_IN_PATH)
            .map_err(|err| TransportError::Transport(err.to_string()))?;
        let origin = origin_from_url(&self.upstream);

        TransportRequest::post(url)
            .with_header(USER_AGENT, &self.user_agent)?
            .with_header(COOKIE, format!("{cookie}; session={}", session.expose()))?
            .with_header(CONTENT_TYPE, "application/json")?
            .with_header(ACCEPT, "application/json, text/plain, */*")?
            .with_header(ORIGIN, &origin)?
            .with_header(REFERER, format!("{origin}/"))
            .map(|request| request.with_body(""))
    }
}
