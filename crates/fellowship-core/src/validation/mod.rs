//! Credential input validation and email normalization.
//!
//! Sign-in forms feed user-typed strings straight to the backend; these
//! checks reject obviously malformed input before a round-trip.

use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

/// Validation error types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Input exceeds maximum allowed length.
    #[error("Input exceeds maximum length ({max} bytes, got {actual})")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
        /// Actual input length.
        actual: usize,
    },

    /// Email address is malformed.
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    /// Password is shorter than the backend accepts.
    #[error("Password must be at least {min} characters")]
    PasswordTooShort {
        /// Minimum length in characters.
        min: usize,
    },

    /// Disallowed characters in input.
    #[error("Disallowed characters in input")]
    DisallowedChars,
}

/// Size limits per input type.
pub mod limits {
    /// Maximum email length (RFC 5321 path limit).
    pub const MAX_EMAIL_LENGTH: usize = 254;

    /// Minimum password length accepted by the auth backend.
    pub const MIN_PASSWORD_CHARS: usize = 6;

    /// Maximum password size.
    pub const MAX_PASSWORD_LENGTH: usize = 1024;
}

/// Normalize an email for comparison: trim, NFKC, lowercase.
#[must_use]
pub fn normalize_email(input: &str) -> String {
    input.trim().nfkc().collect::<String>().to_lowercase()
}

/// Validate an email address and return its normalized form.
///
/// # Errors
///
/// Returns `ValidationError::TooLong`, `DisallowedChars`, or `InvalidEmail`.
pub fn validate_email(input: &str) -> Result<String, ValidationError> {
    let email = normalize_email(input);

    if email.len() > limits::MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong {
            max: limits::MAX_EMAIL_LENGTH,
            actual: email.len(),
        });
    }

    if email.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return Err(ValidationError::DisallowedChars);
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::InvalidEmail(email));
    };

    let domain_ok = domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..");

    if local.is_empty() || domain.contains('@') || !domain_ok {
        return Err(ValidationError::InvalidEmail(email));
    }

    Ok(email)
}

/// Validate a password before sending it to the backend.
///
/// # Errors
///
/// Returns `ValidationError::PasswordTooShort` or `TooLong`.
pub fn validate_password(input: &str) -> Result<(), ValidationError> {
    if input.len() > limits::MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong {
            max: limits::MAX_PASSWORD_LENGTH,
            actual: input.len(),
        });
    }

    if input.chars().count() < limits::MIN_PASSWORD_CHARS {
        return Err(ValidationError::PasswordTooShort {
            min: limits::MIN_PASSWORD_CHARS,
        });
    }

    if input.contains('\0') {
        return Err(ValidationError::DisallowedChars);
    }

    Ok(())
}
