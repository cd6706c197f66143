use std::sync::OnceLock;

use regex::RegexSet;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LocatorError {
    #[error("{0} environment variable not set")]
    MissingCredential(String),

    #[error("Image not found: {0}")]
    ImageNotFound(String),

    #[error("Vision provider error: {0}")]
    Provider(String),

    #[error("Invalid JSON from vision model: {0}")]
    Schema(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

/// Stable machine-readable code reported in the error envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    AuthMissing,
    FileNotFound,
    SchemaError,
    QuotaExceeded,
    RateLimited,
    AuthError,
    Timeout,
    Unknown,
}

impl LocatorError {
    pub fn code(&self) -> ErrorCode {
        match self {
            LocatorError::MissingCredential(_) => ErrorCode::AuthMissing,
            LocatorError::ImageNotFound(_) => ErrorCode::FileNotFound,
            LocatorError::Schema(_) | LocatorError::Json(_) => ErrorCode::SchemaError,
            LocatorError::Http(e) if e.is_timeout() => ErrorCode::Timeout,
            other => classify_message(&other.to_string()),
        }
    }
}

/// Keyword patterns checked in order; the first hit wins.
const UPSTREAM_PATTERNS: [(&str, ErrorCode); 4] = [
    ("quota", ErrorCode::QuotaExceeded),
    // word-anchored so URLs like `:generateContent` don't count
    (r"\brate\b|\brate[_-]?limit", ErrorCode::RateLimited),
    ("auth|api key", ErrorCode::AuthError),
    ("timeout|timed out", ErrorCode::Timeout),
];

fn upstream_patterns() -> &'static RegexSet {
    static SET: OnceLock<RegexSet> = OnceLock::new();
    SET.get_or_init(|| {
        RegexSet::new(UPSTREAM_PATTERNS.iter().map(|(p, _)| format!("(?i){p}")))
            .unwrap_or_else(|_| RegexSet::empty())
    })
}

/// Map free-form upstream error text to an [`ErrorCode`].
pub fn classify_message(message: &str) -> ErrorCode {
    upstream_patterns()
        .matches(message)
        .iter()
        .next()
        .map(|idx| UPSTREAM_PATTERNS[idx].1)
        .unwrap_or(ErrorCode::Unknown)
}

impl serde::Serialize for LocatorError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

pub type LocatorResult<T> = Result<T, LocatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_upstream_keywords() {
        assert_eq!(classify_message("Quota exceeded for project"), ErrorCode::QuotaExceeded);
        assert_eq!(classify_message("429 Rate limit reached"), ErrorCode::RateLimited);
        assert_eq!(classify_message("API key not valid"), ErrorCode::AuthError);
        assert_eq!(classify_message("401 Unauthenticated"), ErrorCode::AuthError);
        assert_eq!(classify_message("request timeout"), ErrorCode::Timeout);
        assert_eq!(classify_message("something broke"), ErrorCode::Unknown);
    }

    #[test]
    fn endpoint_names_are_not_rate_limits() {
        assert_eq!(
            classify_message("error sending request for url (https://x/models/m:generateContent)"),
            ErrorCode::Unknown
        );
        assert_eq!(classify_message("RATE_LIMIT_EXCEEDED"), ErrorCode::RateLimited);
        assert_eq!(classify_message("operation timed out"), ErrorCode::Timeout);
    }

    #[test]
    fn quota_wins_over_rate() {
        // "rate" is also a substring here; order decides.
        assert_eq!(
            classify_message("quota exceeded, rate limited"),
            ErrorCode::QuotaExceeded
        );
    }

    #[test]
    fn input_errors_have_fixed_codes() {
        let missing = LocatorError::MissingCredential("GEMINI_API_KEY".into());
        assert_eq!(missing.code(), ErrorCode::AuthMissing);
        assert_eq!(missing.to_string(), "GEMINI_API_KEY environment variable not set");

        let not_found = LocatorError::ImageNotFound("a.png".into());
        assert_eq!(not_found.code(), ErrorCode::FileNotFound);

        let schema = LocatorError::Schema("expected value".into());
        assert_eq!(schema.code(), ErrorCode::SchemaError);
    }

    #[test]
    fn provider_errors_are_classified_by_text() {
        let err = LocatorError::Provider("429 Too Many Requests: RESOURCE_EXHAUSTED quota".into());
        assert_eq!(err.code(), ErrorCode::QuotaExceeded);
    }

    #[test]
    fn error_code_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorCode::QuotaExceeded).unwrap();
        assert_eq!(json, "\"quota_exceeded\"");
    }
}
