//! CEP (postal code) validation.

use serde::{Deserialize, Serialize};

use super::{BrValidationError, digits_only};

/// Returns `true` for an eight-digit CEP other than `00000000`.
///
/// # Examples
/// ```
/// use streamflix::domain::br::validate_cep;
///
/// assert!(validate_cep("01310-100"));
/// assert!(!validate_cep("00000-000"));
/// ```
#[must_use]
pub fn validate_cep(raw: &str) -> bool {
    let digits = digits_only(raw);
    digits.len() == 8 && digits != "00000000"
}

/// A validated CEP stored as eight digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cep(String);

impl Cep {
    pub fn parse(raw: &str) -> Result<Self, BrValidationError> {
        if validate_cep(raw) {
            Ok(Self(digits_only(raw)))
        } else {
            Err(BrValidationError::InvalidCep)
        }
    }

    #[must_use]
    pub fn digits(&self) -> &str {
        &self.0
    }

    /// `00000-000` presentation.
    #[must_use]
    pub fn formatted(&self) -> String {
        super::format_cep(&self.0)
    }
}

impl From<Cep> for String {
    fn from(value: Cep) -> Self {
        value.0
    }
}

impl TryFrom<String> for Cep {
    type Error = BrValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}
