//! Multi-account check-in orchestration.
//!
//! Walks the configured sessions strictly in order, signs each account in,
//! and folds the outcomes into a [`RunSummary`]. A failing account never stops
//! the ones after it. The rendered summary is logged and handed to the
//! configured [`Notifier`].

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;
use url::Url;

use crate::config::CheckinConfig;
use crate::notify::{DisabledNotifier, Notifier, NotifyError, TelegramNotifier};
use crate::signin::{SessionToken, SignInClient, SignInOutcome};
use crate::transport::{HttpTransport, ReqwestTransport, TransportError};

/// Result alias used across the orchestration layer.
pub type CheckinResult<T> = Result<T, CheckinError>;

/// Errors that stop a run before any account is attempted.
#[derive(Debug, Error)]
pub enum CheckinError {
    #[error("no session tokens configured (set COOKIES)")]
    NoSessions,
    #[error("transport setup failed: {0}")]
    Transport(#[from] TransportError),
}

impl CheckinError {
    pub fn exit_code(&self) -> u8 {
        1
    }
}

const SUMMARY_HEADER: &str = "🔔 <b>AnyRouter check-in results</b>\n";

/// Outcome of one account, tagged with its 1-based position in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountOutcome {
    pub index: usize,
    pub outcome: SignInOutcome,
}

impl AccountOutcome {
    pub fn line(&self) -> String {
        let marker = if self.outcome.success { "✅" } else { "❌" };
        format!("account #{}: {marker} {}", self.index, self.outcome.message)
    }
}

/// Aggregated result of one run, in input order.
#[derive(Debug, Clone)]
pub struct RunSummary {
    started_at: DateTime<Utc>,
    upstream: Url,
    outcomes: Vec<AccountOutcome>,
    succeeded: usize,
    failed: usize,
}

impl RunSummary {
    pub fn new(started_at: DateTime<Utc>, upstream: Url) -> Self {
        Self {
            started_at,
            upstream,
            outcomes: Vec::new(),
            succeeded: 0,
            failed: 0,
        }
    }

    /// Append the next account's outcome. Outcomes are never replaced.
    pub fn record(&mut self, outcome: SignInOutcome) {
        if outcome.success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.outcomes.push(AccountOutcome {
            index: self.outcomes.len() + 1,
            outcome,
        });
    }

    pub fn outcomes(&self) -> &[AccountOutcome] {
        &self.outcomes
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    /// `0` when every account succeeded, `1` otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.all_succeeded() { 0 } else { 1 }
    }

    /// Header, one line per account, then the counts line.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.outcomes.len() + 2);
        lines.push(SUMMARY_HEADER.to_string());
        lines.extend(self.outcomes.iter().map(AccountOutcome::line));
        lines.push(format!(
            "\n📊 <b>Summary</b>: succeeded {} / failed {} / total {}",
            self.succeeded,
            self.failed,
            self.total()
        ));
        lines
    }

    /// Text handed to the notifier.
    pub fn render(&self) -> String {
        self.lines().join("\n")
    }

    /// One-line digest for the console; carries no session values.
    pub fn console_header(&self) -> String {
        format!(
            "[anyrouter] started_at={} upstream={} succeeded={} failed={} total={}",
            self.started_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.upstream.as_str().trim_end_matches('/'),
            self.succeeded,
            self.failed,
            self.total()
        )
    }
}

/// Whether the summary reached the notification channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationStatus {
    Delivered,
    NotSent(String),
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub summary: RunSummary,
    pub notification: NotificationStatus,
}

impl RunReport {
    /// Notification delivery never influences the exit code.
    pub fn exit_code(&self) -> u8 {
        self.summary.exit_code()
    }
}

/// Sequential sign-in over a list of accounts.
pub struct CheckinRunner {
    client: SignInClient,
    notifier: Arc<dyn Notifier>,
}

impl CheckinRunner {
    pub fn new(client: SignInClient, notifier: Arc<dyn Notifier>) -> Self {
        Self { client, notifier }
    }

    /// Build the runner with the reqwest transport and the configured notifier.
    pub fn from_config(config: &CheckinConfig) -> CheckinResult<Self> {
        let transport: Arc<dyn HttpTransport> =
            Arc::new(ReqwestTransport::new(config.request_timeout)?);
        Ok(Self::with_transport(config, transport))
    }

    /// Build the runner on top of an existing transport.
    pub fn with_transport(config: &CheckinConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let client = SignInClient::new(transport.clone(), config.upstream.clone())
            .with_user_agent(config.user_agent.clone())
            .with_policy(config.unrecognized_policy);

        let notifier: Arc<dyn Notifier> = match &config.telegram {
            Some(telegram) => Arc::new(TelegramNotifier::new(transport, telegram.clone())),
            None => Arc::new(DisabledNotifier),
        };

        Self::new(client, notifier)
    }

    /// Sign in every account in order and report the result.
    ///
    /// Fails only when `sessions` is empty, in which case nothing is sent.
    pub async fn run(&self, sessions: &[SessionToken]) -> CheckinResult<RunReport> {
        if sessions.is_empty() {
            log::error!("no session tokens configured; set COOKIES to the session values");
            return Err(CheckinError::NoSessions);
        }

        let mut summary = RunSummary::new(Utc::now(), self.client.upstream().clone());

        for (position, session) in sessions.iter().enumerate() {
            log::debug!("signing in account #{}", position + 1);
            let outcome = self.client.sign_in(session).await;
            summary.record(outcome);
        }

        log::info!("{}", summary.console_header());
        for line in summary.lines() {
            log::info!("{line}");
        }

        let notification = match self.notifier.send(&summary.render()).await {
            Ok(()) => {
                log::debug!("summary delivered via {}", self.notifier.name());
                NotificationStatus::Delivered
            }
            Err(NotifyError::NotConfigured) => {
                log::info!("[anyrouter] notification not sent reason=not_configured");
                NotificationStatus::NotSent(NotifyError::NotConfigured.to_string())
            }
            Err(err) => {
                log::warn!("[anyrouter] notification not sent reason={err}");
                NotificationStatus::NotSent(err.to_string())
            }
        };

        Ok(RunReport {
            summary,
            notification,
        })
    }
}

/// One complete check-in pass for `config`; shared by every entry point.
pub async fn run_checkin(config: &CheckinConfig) -> CheckinResult<RunReport> {
    if config.sessions.is_empty() {
        log::error!("no session tokens configured; set COOKIES to the session values");
        return Err(CheckinError::NoSessions);
    }
    CheckinRunner::from_config(config)?
        .run(&config.sessions)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::{Reply, StubTransport, challenge_page};
    use async_trait::async_trait;
    use std::sync::Mutex;

    const TOKEN: &str = "a1b2c3d4e5f60718293a4b5c6d7e8f9012345678";

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn send(&self, text: &str) -> crate::notify::NotifyResult {
            self.sent.lock().unwrap().push(text.to_string());
            if self.fail {
                Err(NotifyError::Http {
                    status: 500,
                    body: "down".into(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn runner(transport: Arc<StubTransport>, notifier: Arc<RecordingNotifier>) -> CheckinRunner {
        let client = SignInClient::new(transport, Url::parse("https://anyrouter.top").unwrap());
        CheckinRunner::new(client, notifier)
    }

    fn sessions(values: &[&str]) -> Vec<SessionToken> {
        values.iter().map(|value| SessionToken::new(*value)).collect()
    }

    #[tokio::test]
    async fn empty_sessions_make_no_requests() {
        let transport = Arc::new(StubTransport::new(vec![]));
        let notifier = Arc::new(RecordingNotifier::default());

        let result = runner(transport.clone(), notifier.clone()).run(&[]).await;

        let err = result.unwrap_err();
        assert!(matches!(err, CheckinError::NoSessions));
        assert_eq!(err.exit_code(), 1);
        assert_eq!(transport.request_count(), 0);
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failing_account_does_not_stop_the_next() {
        let transport = Arc::new(StubTransport::new(vec![
            Reply::Respond(200, challenge_page(TOKEN)),
            Reply::Fail("connection reset".into()),
            Reply::Respond(200, challenge_page(TOKEN)),
            Reply::Respond(200, r#"{"success":true,"message":"signed in"}"#.into()),
        ]));
        let notifier = Arc::new(RecordingNotifier::default());

        let report = runner(transport.clone(), notifier)
            .run(&sessions(&["session-a", "session-b"]))
            .await
            .unwrap();

        let summary = &report.summary;
        assert_eq!(summary.total(), 2);
        assert_eq!((summary.succeeded(), summary.failed()), (1, 1));
        assert!(!summary.outcomes()[0].outcome.success);
        assert!(summary.outcomes()[0].outcome.message.starts_with("request error"));
        assert_eq!(summary.outcomes()[1].outcome, SignInOutcome::success("signed in"));
        assert_eq!(report.exit_code(), 1);
        assert_eq!(transport.request_count(), 4);
    }

    #[tokio::test]
    async fn all_success_exits_zero_and_notifies() {
        let transport = Arc::new(StubTransport::new(vec![
            Reply::Respond(200, challenge_page(TOKEN)),
            Reply::Respond(200, r#"{"success":true}"#.into()),
        ]));
        let notifier = Arc::new(RecordingNotifier::default());

        let report = runner(transport, notifier.clone())
            .run(&sessions(&["top-secret"]))
            .await
            .unwrap();

        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.notification, NotificationStatus::Delivered);
        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("account #1: ✅ already signed in today"));
        assert!(sent[0].contains("succeeded 1 / failed 0 / total 1"));
        assert!(!sent[0].contains("top-secret"));
    }

    #[tokio::test]
    async fn notification_failure_keeps_exit_code() {
        let transport = Arc::new(StubTransport::new(vec![
            Reply::Respond(200, challenge_page(TOKEN)),
            Reply::Respond(200, r#"{"success":true}"#.into()),
        ]));
        let notifier = Arc::new(RecordingNotifier {
            fail: true,
            ..Default::default()
        });

        let report = runner(transport, notifier)
            .run(&sessions(&["s"]))
            .await
            .unwrap();

        assert_eq!(report.exit_code(), 0);
        assert_eq!(
            report.notification,
            NotificationStatus::NotSent("http_500: down".into())
        );
    }

    #[test]
    fn summary_has_one_line_per_account_in_order() {
        let mut summary = RunSummary::new(Utc::now(), Url::parse("https://anyrouter.top").unwrap());
        summary.record(SignInOutcome::failure("invalid session"));
        summary.record(SignInOutcome::success("ok"));
        summary.record(SignInOutcome::failure("cookie derivation failed"));

        let lines = summary.lines();
        assert_eq!(lines.len(), 3 + 2);
        assert_eq!(lines[1], "account #1: ❌ invalid session");
        assert_eq!(lines[2], "account #2: ✅ ok");
        assert_eq!(lines[3], "account #3: ❌ cookie derivation failed");
        assert_eq!(summary.succeeded() + summary.failed(), summary.total());
        assert!(lines[4].ends_with("succeeded 1 / failed 2 / total 3"));
        assert!(
            summary
                .console_header()
                .contains("upstream=https://anyrouter.top succeeded=1 failed=2 total=3")
        );
    }

    #[tokio::test]
    async fn run_checkin_rejects_empty_config() {
        let config = CheckinConfig::default();
        assert!(matches!(
            run_checkin(&config).await,
            Err(CheckinError::NoSessions)
        ));
    }
}
