//! Challenge page fetching and token extraction.

use http::header::USER_AGENT;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::transport::{HttpTransport, TransportRequest};

use super::cookie::{ChallengeToken, DerivedCookie, derive_cookie};

static ARG1_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"var\s+arg1\s*=\s*'([0-9a-fA-F]{40})'").expect("invalid arg1 regex")
});

/// Find the `var arg1 = '<40 hex>'` assignment in a page body.
pub fn extract_challenge_token(body: &str) -> Option<ChallengeToken> {
    let captures = ARG1_RE.captures(body)?;
    ChallengeToken::parse(captures.get(1)?.as_str()).ok()
}

/// Fetch `target` without credentials and derive the cookie from its body.
///
/// Any failure (transport error, timeout, missing token) yields `None`; the
/// caller decides whether to try another endpoint.
pub async fn fetch_challenge_cookie(
    transport: &dyn HttpTransport,
    target: &Url,
    user_agent: &str,
) -> Option<DerivedCookie> {
    let request = match TransportRequest::get(target.clone()).with_header(USER_AGENT, user_agent) {
        Ok(request) => request,
        Err(err) => {
            log::warn!("challenge request for {target} not built: {err}");
            return None;
        }
    };

    let response = match transport.send(request).await {
        Ok(response) => response,
        Err(err) => {
            log::debug!("challenge fetch {target} failed: {err}");
            return None;
        }
    };

    match extract_challenge_token(&response.text()) {
        Some(token) => Some(derive_cookie(&token)),
        None => {
            log::debug!(
                "no challenge token in {} response from {target}",
                response.status
            );
            None
        }
    }
}
