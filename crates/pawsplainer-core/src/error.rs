use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Startup configuration problems that disable the whole interface
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY is not set. Add it to your environment or a .env file.")]
    MissingApiKey,
    #[error("API key is empty")]
    BlankApiKey,
}

/// Rejected request lifecycle transitions
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("a request is already in flight")]
    RequestInFlight,
    #[error("no request is in flight")]
    NotInFlight,
}

fn error_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"\{"error":(.*)\}"#).expect("error pattern is valid"))
}

/// Pull a human readable message out of an API error payload.
///
/// Looks for an embedded `{"error": {...}}` object and returns its `message`.
/// Anything that doesn't fit that shape comes back unchanged.
pub fn extract_error_message(raw: &str) -> String {
    let Some(captures) = error_pattern().captures(raw) else {
        return raw.to_string();
    };
    let Some(inner) = captures.get(1) else {
        return raw.to_string();
    };

    serde_json::from_str::<serde_json::Value>(inner.as_str())
        .ok()
        .and_then(|value| value.get("message")?.as_str().map(str::to_string))
        .unwrap_or_else(|| raw.to_string())
}
