//! Payment card validation and brand detection.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::digits_only;

/// Card details as typed by the customer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CardInput {
    pub number: String,
    pub holder_name: String,
    pub cvv: String,
    pub expiry_month: u32,
    /// Two- or four-digit year.
    pub expiry_year: u32,
}

impl CardInput {
    /// Card number with separators removed.
    #[must_use]
    pub fn digits(&self) -> String {
        digits_only(&self.number)
    }

    /// Four-digit expiry year.
    #[must_use]
    pub fn full_expiry_year(&self) -> u32 {
        full_year(self.expiry_year)
    }

    /// Last four digits of the card number.
    #[must_use]
    pub fn last_four(&self) -> String {
        let digits = self.digits();
        digits[digits.len().saturating_sub(4)..].to_owned()
    }
}

/// Reasons a card is refused before reaching the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CardError {
    #[error("card number must have 13 to 19 digits")]
    InvalidLength,
    #[error("card number failed the checksum")]
    InvalidChecksum,
    #[error("CVV must have 3 or 4 digits")]
    InvalidCvv,
    #[error("expiry month must be between 1 and 12")]
    InvalidExpiryMonth,
    #[error("card is expired")]
    Expired,
}

impl CardError {
    /// Stable identifier used in error details.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidLength => "invalid_length",
            Self::InvalidChecksum => "invalid_checksum",
            Self::InvalidCvv => "invalid_cvv",
            Self::InvalidExpiryMonth => "invalid_expiry_month",
            Self::Expired => "expired",
        }
    }
}

/// Card network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CardBrand {
    Visa,
    Mastercard,
    Amex,
    Diners,
    Discover,
    Elo,
    Hipercard,
    Unknown,
}

impl CardBrand {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Visa => "visa",
            Self::Mastercard => "mastercard",
            Self::Amex => "amex",
            Self::Diners => "diners",
            Self::Discover => "discover",
            Self::Elo => "elo",
            Self::Hipercard => "hipercard",
            Self::Unknown => "unknown",
        }
    }
}

/// Luhn checksum over a string of digits.
///
/// Non-digit input and empty input fail the check.
///
/// # Examples
/// ```
/// use streamflix::domain::br::luhn;
///
/// assert!(luhn("4111111111111111"));
/// assert!(!luhn("4111111111111112"));
/// ```
#[must_use]
pub fn luhn(digits: &str) -> bool {
    if digits.is_empty() {
        return false;
    }
    let mut sum = 0;
    for (index, c) in digits.chars().rev().enumerate() {
        let Some(mut digit) = c.to_digit(10) else {
            return false;
        };
        if index % 2 == 1 {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
    }
    sum % 10 == 0
}

fn full_year(year: u32) -> u32 {
    if year < 100 { 2000 + year } else { year }
}

/// Validate number, CVV and expiry against `today`.
///
/// A card expiring in the current month is still accepted.
pub fn validate_card(card: &CardInput, today: NaiveDate) -> Result<(), CardError> {
    let digits = card.digits();
    if !(13..=19).contains(&digits.len()) {
        return Err(CardError::InvalidLength);
    }
    if !luhn(&digits) {
        return Err(CardError::InvalidChecksum);
    }
    let cvv = card.cvv.trim();
    if !(3..=4).contains(&cvv.len()) || !cvv.chars().all(|c| c.is_ascii_digit()) {
        return Err(CardError::InvalidCvv);
    }
    if !(1..=12).contains(&card.expiry_month) {
        return Err(CardError::InvalidExpiryMonth);
    }
    let year = full_year(card.expiry_year);
    let current_year = u32::try_from(today.year()).unwrap_or(0);
    if year < current_year || (year == current_year && card.expiry_month < today.month()) {
        return Err(CardError::Expired);
    }
    Ok(())
}

fn prefix_in(digits: &str, len: usize, low: u32, high: u32) -> bool {
    digits
        .get(..len)
        .and_then(|prefix| prefix.parse::<u32>().ok())
        .is_some_and(|value| (low..=high).contains(&value))
}

/// Identify the card network from the leading digits.
///
/// Elo and Hipercard ranges overlap Visa and Discover, so they are checked
/// first.
#[must_use]
pub fn detect_brand(number: &str) -> CardBrand {
    let digits = digits_only(number);
    const ELO: [&str; 7] = ["4011", "4312", "4389", "4514", "4573", "6362", "6363"];

    if ELO.iter().any(|prefix| digits.starts_with(prefix)) {
        CardBrand::Elo
    } else if digits.starts_with("6062") {
        CardBrand::Hipercard
    } else if digits.starts_with('4') {
        CardBrand::Visa
    } else if prefix_in(&digits, 2, 51, 55) || prefix_in(&digits, 4, 2221, 2720) {
        CardBrand::Mastercard
    } else if prefix_in(&digits, 2, 34, 34) || prefix_in(&digits, 2, 37, 37) {
        CardBrand::Amex
    } else if prefix_in(&digits, 2, 30, 30)
        || prefix_in(&digits, 2, 36, 36)
        || prefix_in(&digits, 2, 38, 38)
    {
        CardBrand::Diners
    } else if digits.starts_with("6011")
        || prefix_in(&digits, 6, 622_126, 622_925)
        || prefix_in(&digits, 3, 644, 649)
        || digits.starts_with("65")
    {
        CardBrand::Discover
    } else {
        CardBrand::Unknown
    }
}
