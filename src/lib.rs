//! # anyrouter-checkin
//!
//! Automated daily check-in for AnyRouter accounts.
//!
//! The upstream gates its API behind an `acw_sc__v2` anti-bot cookie. Every
//! sign-in therefore starts by fetching a page that embeds a rotating 40-hex
//! `arg1` token, running it through the fixed permutation + XOR transform, and
//! presenting the result next to the account's `session` cookie.
//!
//! ## Layers
//!
//! - [`challenge`]: token extraction, cookie derivation, endpoint fallback
//! - [`signin`]: the authenticated POST and response classification
//! - [`orchestrator`]: sequential multi-account run and summary
//! - [`notify`]: summary delivery (Telegram)
//! - [`proxy`]: cookie-injecting reverse proxy
//! - [`config`]: configuration built once at the process boundary
//!
//! ## Example
//!
//! ```no_run
//! use anyrouter_checkin::{CheckinConfig, run_checkin};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CheckinConfig::builder()
//!         .with_sessions(["session-one", "session-two"])
//!         .build();
//!     let report = run_checkin(&config).await?;
//!     println!("{}", report.summary.render());
//!     Ok(())
//! }
//! ```

pub mod challenge;
pub mod config;
pub mod notify;
pub mod orchestrator;
pub mod proxy;
pub mod signin;
pub mod transport;

pub use crate::challenge::{
    COOKIE_NAME,
    ChallengeToken,
    DerivedCookie,
    TokenError,
    candidate_urls,
    derive_cookie,
    derive_cookie_with_fallback,
    extract_challenge_token,
    fetch_challenge_cookie,
};

pub use crate::config::{
    CheckinConfig,
    CheckinConfigBuilder,
    ConfigError,
    DEFAULT_UPSTREAM,
    normalize_base_url,
    parse_sessions,
};

pub use crate::notify::{
    DisabledNotifier,
    Notifier,
    NotifyError,
    NotifyResult,
    TelegramConfig,
    TelegramNotifier,
};

pub use crate::orchestrator::{
    AccountOutcome,
    CheckinError,
    CheckinResult,
    CheckinRunner,
    NotificationStatus,
    RunReport,
    RunSummary,
    run_checkin,
};

pub use crate::proxy::{ProxyState, router as proxy_router, serve as serve_proxy};

pub use crate::signin::{
    DEFAULT_USER_AGENT,
    SessionToken,
    SignInClient,
    SignInOutcome,
    UnrecognizedResponsePolicy,
    classify_response,
};

pub use crate::transport::{
    HttpTransport,
    ReqwestTransport,
    TransportError,
    TransportRequest,
    TransportResponse,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
