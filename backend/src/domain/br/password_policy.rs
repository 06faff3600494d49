//! Password strength rules applied at registration.

use serde::Serialize;
use utoipa::ToSchema;

/// Minimum password length in characters.
pub const MIN_PASSWORD_LENGTH: usize = 8;

const SPECIAL_CHARACTERS: &str = "!@#$%^&*(),.?\":{}|<>";
const COMMON_SEQUENCES: [&str; 5] = ["123456", "abcdef", "qwerty", "password", "123abc"];

/// A single unmet password rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PasswordIssue {
    TooShort,
    MissingLowercase,
    MissingUppercase,
    MissingDigit,
    MissingSpecialCharacter,
    CommonSequence,
}

impl PasswordIssue {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::TooShort => "password must have at least 8 characters",
            Self::MissingLowercase => "password must contain a lowercase letter",
            Self::MissingUppercase => "password must contain an uppercase letter",
            Self::MissingDigit => "password must contain a digit",
            Self::MissingSpecialCharacter => "password must contain a special character",
            Self::CommonSequence => "password must not contain common sequences",
        }
    }
}

/// Every rule `raw` fails; empty when the password is strong.
///
/// # Examples
/// ```
/// use streamflix::domain::br::{PasswordIssue, check_password_strength};
///
/// assert!(check_password_strength("S3nha!Forte").is_empty());
/// assert!(check_password_strength("fraca").contains(&PasswordIssue::TooShort));
/// ```
#[must_use]
pub fn check_password_strength(raw: &str) -> Vec<PasswordIssue> {
    let mut issues = Vec::new();
    if raw.chars().count() < MIN_PASSWORD_LENGTH {
        issues.push(PasswordIssue::TooShort);
    }
    if !raw.chars().any(|c| c.is_ascii_lowercase()) {
        issues.push(PasswordIssue::MissingLowercase);
    }
    if !raw.chars().any(|c| c.is_ascii_uppercase()) {
        issues.push(PasswordIssue::MissingUppercase);
    }
    if !raw.chars().any(|c| c.is_ascii_digit()) {
        issues.push(PasswordIssue::MissingDigit);
    }
    if !raw.chars().any(|c| SPECIAL_CHARACTERS.contains(c)) {
        issues.push(PasswordIssue::MissingSpecialCharacter);
    }
    let lowered = raw.to_lowercase();
    if COMMON_SEQUENCES.iter().any(|seq| lowered.contains(seq)) {
        issues.push(PasswordIssue::CommonSequence);
    }
    issues
}
