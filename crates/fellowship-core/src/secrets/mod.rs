//! Secret wrappers and log scrubbing.
//!
//! - `SecretToken`: access/refresh tokens and API keys that must not be logged
//! - `scrub_secrets`: redact token-like values from backend error text

use secrecy::{ExposeSecret, SecretBox};

/// Token wrapper that prevents accidental logging.
///
/// The inner value is wrapped with `secrecy::SecretBox` so it never shows up
/// in `Debug` or `Display` output.
#[derive(Clone)]
pub struct SecretToken(SecretBox<str>);

impl SecretToken {
    /// Create a new secret token.
    #[must_use]
    pub fn new(token: String) -> Self {
        Self(SecretBox::new(token.into_boxed_str()))
    }

    /// Expose the secret for an actual backend call.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Whether the token is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expose().is_empty()
    }
}

impl PartialEq for SecretToken {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl std::fmt::Debug for SecretToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretToken([REDACTED])")
    }
}

impl std::fmt::Display for SecretToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl From<String> for SecretToken {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Scrub secrets from a string for safe logging.
///
/// Replaces the value following each pattern with `[REDACTED]`.
///
/// # Arguments
///
/// * `text` - Text to scrub
/// * `patterns` - Patterns to look for (e.g., `["access_token\":\"", "apikey="]`)
#[must_use]
pub fn scrub_secrets(text: &str, patterns: &[&str]) -> String {
    let mut result = text.to_string();

    for pattern in patterns {
        let mut search_start = 0;
        while let Some(start) = result[search_start..].find(pattern) {
            let abs_start = search_start + start + pattern.len();

            // Value ends at whitespace, a quote, or a separator
            let end = result[abs_start..]
                .find(|c: char| c.is_whitespace() || c == '"' || c == '\'' || c == '&' || c == ',')
                .map_or(result.len(), |e| abs_start + e);

            result.replace_range(abs_start..end, "[REDACTED]");

            search_start = abs_start + "[REDACTED]".len();
        }
    }

    result
}

/// Secret patterns that show up in auth backend responses and URLs.
pub const COMMON_SECRET_PATTERNS: &[&str] = &[
    "\"access_token\":\"",
    "\"refresh_token\":\"",
    "access_token=",
    "refresh_token=",
    "apikey=",
    "password=",
    "\"password\":\"",
    "Authorization: Bearer ",
    "apikey: ",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_redaction() {
        let token = SecretToken::new("eyJhbGciOi.secret".to_string());

        assert_eq!(format!("{token:?}"), "SecretToken([REDACTED])");
        assert_eq!(format!("{token}"), "[REDACTED]");
        assert_eq!(token.expose(), "eyJhbGciOi.secret");
    }

    #[test]
    fn test_token_equality_compares_contents() {
        let a = SecretToken::from("abc".to_string());
        let b = SecretToken::new("abc".to_string());
        let c = SecretToken::new("xyz".to_string());
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(SecretToken::new(String::new()).is_empty());
    }

    #[test]
    fn test_scrub_json_body() {
        let body = r#"{"access_token":"eyJ.abc.def","token_type":"bearer","refresh_token":"r-123"}"#;
        let scrubbed = scrub_secrets(body, COMMON_SECRET_PATTERNS);

        assert!(!scrubbed.contains("eyJ.abc.def"));
        assert!(!scrubbed.contains("r-123"));
        assert!(scrubbed.contains("\"token_type\":\"bearer\""));
    }

    #[test]
    fn test_scrub_query_string() {
        let url = "https://db.example.org/rest/v1/admins?apikey=anon-key&select=is_admin";
        let scrubbed = scrub_secrets(url, COMMON_SECRET_PATTERNS);
        assert_eq!(
            scrubbed,
            "https://db.example.org/rest/v1/admins?apikey=[REDACTED]&select=is_admin"
        );
    }
}
