//! Endpoint fallback for cookie derivation.
//!
//! The upstream does not expose the challenge on every endpoint, so the
//! sign-in path is tried first and the profile path second. Exactly two
//! attempts, no backoff.

use url::Url;

use crate::transport::HttpTransport;

use super::cookie::DerivedCookie;
use super::extractor::fetch_challenge_cookie;

pub const SIGN_IN_PATH: &str = "/api/user/sign_in";
pub const SELF_PATH: &str = "/api/user/self";

/// Challenge sources in the order they are tried.
pub fn candidate_urls(upstream: &Url) -> Result<[Url; 2], url::ParseError> {
    Ok([upstream.join(SIGN_IN_PATH)?, upstream.join(SELF_PATH)?])
}

/// Derive a cookie from the first candidate that exposes a challenge token.
///
/// Returns the cookie together with the endpoint that produced it.
pub async fn derive_cookie_with_fallback(
    transport: &dyn HttpTransport,
    upstream: &Url,
    user_agent: &str,
) -> Option<(DerivedCookie, Url)> {
    let candidates = match candidate_urls(upstream) {
        Ok(candidates) => candidates,
        Err(err) => {
            log::warn!("cannot build challenge endpoints from {upstream}: {err}");
            return None;
        }
    };

    for candidate in candidates {
        if let Some(cookie) = fetch_challenge_cookie(transport, &candidate, user_agent).await {
            log::debug!("challenge cookie derived via {}", candidate.path());
            return Some((cookie, candidate));
        }
    }

    log::warn!("no challenge token from any endpoint of {upstream}");
    None
}
