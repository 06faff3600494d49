//! Brazilian phone number validation.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{BrValidationError, digits_only};

/// National area codes (DDD) in service.
const DDD_CODES: [&str; 67] = [
    "11", "12", "13", "14", "15", "16", "17", "18", "19", "21", "22", "24", "27", "28", "31", "32",
    "33", "34", "35", "37", "38", "41", "42", "43", "44", "45", "46", "47", "48", "49", "51", "53",
    "54", "55", "61", "62", "63", "64", "65", "66", "67", "68", "69", "71", "73", "74", "75", "77",
    "79", "81", "82", "83", "84", "85", "86", "87", "88", "89", "91", "92", "93", "94", "95", "96",
    "97", "98", "99",
];

/// Returns `true` for a valid Brazilian landline or mobile number.
///
/// Accepts 10 digits (landline), 11 digits (mobile, third digit 2-5 or 9) or
/// 13 digits prefixed with the country code `55`. The area code must be a
/// known DDD.
///
/// # Examples
/// ```
/// use streamflix::domain::br::validate_phone;
///
/// assert!(validate_phone("(11) 98765-4321"));
/// assert!(validate_phone("+55 11 98765-4321"));
/// assert!(!validate_phone("(20) 98765-4321"));
/// ```
#[must_use]
pub fn validate_phone(raw: &str) -> bool {
    let digits = digits_only(raw);
    let area_code = match digits.len() {
        10 => &digits[..2],
        11 => {
            if !matches!(digits.as_bytes()[2], b'2'..=b'5' | b'9') {
                return false;
            }
            &digits[..2]
        }
        13 if digits.starts_with("55") => &digits[2..4],
        _ => return false,
    };
    DDD_CODES.contains(&area_code)
}

/// A validated phone number stored as digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Phone(String);

impl Phone {
    /// Validate and normalise a phone number.
    pub fn parse(raw: &str) -> Result<Self, BrValidationError> {
        if validate_phone(raw) {
            Ok(Self(digits_only(raw)))
        } else {
            Err(BrValidationError::InvalidPhone)
        }
    }

    #[must_use]
    pub fn digits(&self) -> &str {
        &self.0
    }

    /// Two-digit area code.
    #[must_use]
    pub fn area_code(&self) -> &str {
        if self.0.len() == 13 {
            &self.0[2..4]
        } else {
            &self.0[..2]
        }
    }

    /// Subscriber number without country or area code.
    #[must_use]
    pub fn number(&self) -> &str {
        if self.0.len() == 13 {
            &self.0[4..]
        } else {
            &self.0[2..]
        }
    }

    #[must_use]
    pub fn formatted(&self) -> String {
        super::format_phone(&self.0)
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted())
    }
}

impl From<Phone> for String {
    fn from(value: Phone) -> Self {
        value.0
    }
}

impl TryFrom<String> for Phone {
    type Error = BrValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}
