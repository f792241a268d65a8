//! Mapping of sign-in responses onto [`SignInOutcome`]s.

use serde_json::{Map, Value};

use super::SignInOutcome;

/// Message used when the server confirms success without saying anything.
pub const DEFAULT_SUCCESS_MESSAGE: &str = "already signed in today";

/// How to treat a 2xx JSON object that carries no boolean `success` field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnrecognizedResponsePolicy {
    /// Count it as a successful check-in.
    #[default]
    TreatAsSuccess,
    /// Count it as a failure.
    TreatAsFailure,
}

impl std::str::FromStr for UnrecognizedResponsePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "success" => Ok(Self::TreatAsSuccess),
            "failure" => Ok(Self::TreatAsFailure),
            other => Err(format!("unknown unrecognized-response policy: {other}")),
        }
    }
}

/// Classify a received sign-in response.
///
/// Transport failures never reach this function; they are classified by the
/// caller as `request error`.
pub fn classify_response(
    status: u16,
    body: &str,
    policy: UnrecognizedResponsePolicy,
) -> SignInOutcome {
    if status == 401 {
        return SignInOutcome::failure("invalid session");
    }

    if !(200..300).contains(&status) {
        return SignInOutcome::failure(format!("http {status}: {body}"));
    }

    let data: Map<String, Value> = match serde_json::from_str(body) {
        Ok(Value::Object(data)) => data,
        _ => return SignInOutcome::failure(format!("non-JSON response: {body}")),
    };

    let message = server_message(&data);
    let raw = Value::Object(data.clone()).to_string();

    match data.get("success") {
        Some(Value::Bool(true)) => {
            SignInOutcome::success(message.unwrap_or_else(|| DEFAULT_SUCCESS_MESSAGE.to_string()))
        }
        Some(Value::Bool(false)) => SignInOutcome::failure(message.unwrap_or(raw)),
        _ => match policy {
            UnrecognizedResponsePolicy::TreatAsSuccess => {
                SignInOutcome::success(format!("unrecognized success response: {raw}"))
            }
            UnrecognizedResponsePolicy::TreatAsFailure => {
                SignInOutcome::failure(format!("unrecognized response: {raw}"))
            }
        },
    }
}

fn server_message(data: &Map<String, Value>) -> Option<String> {
    let text = match data.get("message")? {
        Value::Null => return None,
        Value::String(text) => text.trim().to_string(),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}
