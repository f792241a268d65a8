//! Run configuration.
//!
//! Provides a single configuration value built at the process boundary:
//! - environment loading (`COOKIES`, `UPSTREAM`, `TG_BOT_TOKEN`, `TG_CHAT_ID`, ...)
//! - builder pattern for programmatic use
//! - session list parsing (JSON array, newline or comma separated)
//!
//! Nothing below this module reads the process environment.

use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::notify::TelegramConfig;
use crate::signin::{DEFAULT_USER_AGENT, SessionToken, UnrecognizedResponsePolicy};

pub const DEFAULT_UPSTREAM: &str = "https://anyrouter.top";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const ENV_COOKIES: &str = "COOKIES";
pub const ENV_UPSTREAM: &str = "UPSTREAM";
pub const ENV_TG_BOT_TOKEN: &str = "TG_BOT_TOKEN";
pub const ENV_TG_CHAT_ID: &str = "TG_CHAT_ID";
pub const ENV_TIMEOUT_SECS: &str = "CHECKIN_TIMEOUT_SECS";
pub const ENV_UNRECOGNIZED: &str = "CHECKIN_UNRECOGNIZED";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid upstream url '{0}': {1}")]
    InvalidUpstream(String, url::ParseError),
    #[error("invalid CHECKIN_TIMEOUT_SECS value '{0}'")]
    InvalidTimeout(String),
    #[error("invalid CHECKIN_UNRECOGNIZED value: {0}")]
    InvalidPolicy(String),
}

/// Everything one check-in run needs.
#[derive(Debug, Clone)]
pub struct CheckinConfig {
    pub upstream: Url,
    pub sessions: Vec<SessionToken>,
    pub telegram: Option<TelegramConfig>,
    pub request_timeout: Duration,
    pub user_agent: String,
    pub unrecognized_policy: UnrecognizedResponsePolicy,
}

impl Default for CheckinConfig {
    fn default() -> Self {
        Self {
            upstream: default_upstream(),
            sessions: Vec::new(),
            telegram: None,
            request_timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            unrecognized_policy: UnrecognizedResponsePolicy::default(),
        }
    }
}

impl CheckinConfig {
    pub fn builder() -> CheckinConfigBuilder {
        CheckinConfigBuilder::new()
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = CheckinConfigBuilder::new()
            .with_upstream(lookup(ENV_UPSTREAM).as_deref().unwrap_or_default())?
            .with_sessions(parse_sessions(
                lookup(ENV_COOKIES).as_deref().unwrap_or_default(),
            ));

        let bot_token = lookup(ENV_TG_BOT_TOKEN).unwrap_or_default();
        let chat_id = lookup(ENV_TG_CHAT_ID).unwrap_or_default();
        if !bot_token.trim().is_empty() && !chat_id.trim().is_empty() {
            builder = builder.with_telegram(TelegramConfig {
                bot_token: bot_token.trim().to_string(),
                chat_id: chat_id.trim().to_string(),
            });
        }

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS).filter(|raw| !raw.trim().is_empty()) {
            let secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| ConfigError::InvalidTimeout(raw.clone()))?;
            builder = builder.with_request_timeout(Duration::from_secs(secs));
        }

        if let Some(raw) = lookup(ENV_UNRECOGNIZED).filter(|raw| !raw.trim().is_empty()) {
            let policy = raw
                .parse::<UnrecognizedResponsePolicy>()
                .map_err(ConfigError::InvalidPolicy)?;
            builder = builder.with_unrecognized_policy(policy);
        }

        Ok(builder.build())
    }
}

/// Fluent builder for [`CheckinConfig`].
pub struct CheckinConfigBuilder {
    config: CheckinConfig,
}

impl CheckinConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: CheckinConfig::default(),
        }
    }

    /// Set the upstream base URL; blank input keeps the default.
    pub fn with_upstream(mut self, raw: &str) -> Result<Self, ConfigError> {
        self.config.upstream = normalize_base_url(raw)?;
        Ok(self)
    }

    pub fn with_sessions<I, S>(mut self, sessions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.sessions = sessions
            .into_iter()
            .map(SessionToken::new)
            .collect();
        self
    }

    pub fn with_telegram(mut self, telegram: TelegramConfig) -> Self {
        self.config.telegram = Some(telegram);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn with_unrecognized_policy(mut self, policy: UnrecognizedResponsePolicy) -> Self {
        self.config.unrecognized_policy = policy;
        self
    }

    pub fn build(self) -> CheckinConfig {
        self.config
    }
}

impl Default for CheckinConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Trim the base URL, drop trailing slashes, and fall back to the default.
pub fn normalize_base_url(raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let base = if trimmed.is_empty() {
        DEFAULT_UPSTREAM
    } else {
        trimmed
    };
    Url::parse(base).map_err(|err| ConfigError::InvalidUpstream(base.to_string(), err))
}

/// Split the raw `COOKIES` value into session values.
///
/// Accepts a JSON array (`["s1","s2"]`) or a newline/comma separated list.
/// Blank entries are dropped; order is preserved.
pub fn parse_sessions(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if trimmed.starts_with('[')
        && let Ok(serde_json::Value::Array(items)) = serde_json::from_str(trimmed)
    {
        return items
            .into_iter()
            .map(|item| match item {
                serde_json::Value::String(text) => text.trim().to_string(),
                other => other.to_string(),
            })
            .filter(|session| !session.is_empty())
            .collect();
    }

    trimmed
        .split(['\n', ','])
        .map(str::trim)
        .filter(|session| !session.is_empty())
        .map(str::to_string)
        .collect()
}

fn default_upstream() -> Url {
    Url::parse(DEFAULT_UPSTREAM).expect("default upstream is a valid url")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn parses_json_array_sessions() {
        assert_eq!(parse_sessions(r#"[" a ", "b", ""]"#), vec!["a", "b"]);
    }

    #[test]
    fn parses_separated_sessions() {
        assert_eq!(parse_sessions("a,b\n\nc ,\r\n d"), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn malformed_json_falls_back_to_splitting() {
        assert_eq!(parse_sessions("[a,b"), vec!["[a", "b"]);
    }

    #[test]
    fn empty_input_has_no_sessions() {
        assert!(parse_sessions("   ").is_empty());
    }

    #[test]
    fn normalizes_base_url() {
        assert_eq!(
            normalize_base_url(" https://example.com/// ").unwrap().as_str(),
            "https://example.com/"
        );
        assert_eq!(normalize_base_url("").unwrap().as_str(), "https://anyrouter.top/");
        assert!(matches!(
            normalize_base_url("not a url"),
            Err(ConfigError::InvalidUpstream(_, _))
        ));
    }

    #[test]
    fn loads_from_lookup() {
        let config = CheckinConfig::from_lookup(lookup(&[
            ("COOKIES", "s1\ns2"),
            ("UPSTREAM", "https://mirror.example/"),
            ("TG_BOT_TOKEN", "token"),
            ("TG_CHAT_ID", "7"),
            ("CHECKIN_TIMEOUT_SECS", "5"),
            ("CHECKIN_UNRECOGNIZED", "failure"),
        ]))
        .unwrap();

        assert_eq!(config.sessions.len(), 2);
        assert_eq!(config.sessions[1].expose(), "s2");
        assert_eq!(config.upstream.as_str(), "https://mirror.example/");
        assert_eq!(config.telegram.unwrap().chat_id, "7");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(
            config.unrecognized_policy,
            UnrecognizedResponsePolicy::TreatAsFailure
        );
    }

    #[test]
    fn telegram_requires_both_values() {
        let config =
            CheckinConfig::from_lookup(lookup(&[("COOKIES", "s"), ("TG_BOT_TOKEN", "t")])).unwrap();
        assert!(config.telegram.is_none());
        assert_eq!(config.upstream.as_str(), "https://anyrouter.top/");
        assert_eq!(config.request_timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn rejects_bad_timeout() {
        let result = CheckinConfig::from_lookup(lookup(&[("CHECKIN_TIMEOUT_SECS", "0")]));
        assert!(matches!(result, Err(ConfigError::InvalidTimeout(_))));
    }
}
