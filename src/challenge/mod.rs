//! Challenge-response layer: token extraction, cookie derivation, and
//! endpoint fallback.

pub mod cookie;
pub mod extractor;
pub mod fallback;

pub use cookie::{COOKIE_NAME, ChallengeToken, DerivedCookie, TokenError, derive_cookie};
pub use extractor::{extract_challenge_token, fetch_challenge_cookie};
pub use fallback::{SELF_PATH, SIGN_IN_PATH, candidate_urls, derive_cookie_with_fallback};
