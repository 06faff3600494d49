//! CPF (individual taxpayer number) validation.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{BrValidationError, all_same, digit_values, digits_only};

/// Returns `true` when `raw` is a checksum-valid CPF.
///
/// Punctuation is ignored, so both `529.982.247-25` and `52998224725` are
/// accepted.
///
/// # Examples
/// ```
/// use streamflix::domain::br::validate_cpf;
///
/// assert!(validate_cpf("529.982.247-25"));
/// assert!(!validate_cpf("111.111.111-11"));
/// ```
#[must_use]
pub fn validate_cpf(raw: &str) -> bool {
    let digits = digits_only(raw);
    if digits.len() != 11 || all_same(&digits) {
        return false;
    }
    let values = digit_values(&digits);
    check_digit(&values[..9], 10) == values[9] && check_digit(&values[..10], 11) == values[10]
}

fn check_digit(values: &[u32], start_weight: u32) -> u32 {
    let sum: u32 = values
        .iter()
        .zip((2..=start_weight).rev())
        .map(|(digit, weight)| digit * weight)
        .sum();
    let remainder = (sum * 10) % 11;
    if remainder == 10 { 0 } else { remainder }
}

/// A validated CPF stored as eleven digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cpf(String);

impl Cpf {
    /// Validate and normalise a CPF.
    pub fn parse(raw: &str) -> Result<Self, BrValidationError> {
        if validate_cpf(raw) {
            Ok(Self(digits_only(raw)))
        } else {
            Err(BrValidationError::InvalidCpf)
        }
    }

    /// The eleven digits.
    #[must_use]
    pub fn digits(&self) -> &str {
        &self.0
    }

    /// `000.000.000-00` presentation.
    #[must_use]
    pub fn formatted(&self) -> String {
        super::format_cpf(&self.0)
    }
}

impl fmt::Display for Cpf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted())
    }
}

impl From<Cpf> for String {
    fn from(value: Cpf) -> Self {
        value.0
    }
}

impl TryFrom<String> for Cpf {
    type Error = BrValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}
