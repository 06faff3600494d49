//! Brazilian document, contact and payment validators.
//!
//! Pure functions plus validated newtypes ([`Cpf`], [`Phone`], [`Cep`],
//! [`Email`]) that keep their canonical digit-only or lowercased form. The
//! newtypes serialise as plain strings and re-validate on deserialisation.

mod address;
mod card;
mod cep;
mod cpf;
mod email;
mod format;
mod password_policy;
mod phone;
mod registration;

pub use address::{AddressInput, UF_CODES, validate_address};
pub use card::{CardBrand, CardError, CardInput, detect_brand, luhn, validate_card};
pub use cep::{Cep, validate_cep};
pub use cpf::{Cpf, validate_cpf};
pub use email::{Email, validate_email};
pub use format::{format_brl, format_cep, format_cpf, format_phone};
pub use password_policy::{PasswordIssue, check_password_strength};
pub use phone::{Phone, validate_phone};
pub use registration::{MIN_AGE, RegistrationInput, age_on, validate_registration};

use std::fmt;

/// Reason a Brazilian value failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrValidationError {
    InvalidCpf,
    InvalidPhone,
    InvalidCep,
    InvalidEmail,
}

impl fmt::Display for BrValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCpf => write!(f, "invalid CPF"),
            Self::InvalidPhone => write!(f, "invalid Brazilian phone number"),
            Self::InvalidCep => write!(f, "invalid CEP"),
            Self::InvalidEmail => write!(f, "invalid e-mail address"),
        }
    }
}

impl std::error::Error for BrValidationError {}

/// Keep only ASCII digits.
pub(crate) fn digits_only(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

fn digit_values(digits: &str) -> Vec<u32> {
    digits.chars().filter_map(|c| c.to_digit(10)).collect()
}

fn all_same(digits: &str) -> bool {
    let mut chars = digits.chars();
    match chars.next() {
        Some(first) => chars.all(|c| c == first),
        None => true,
    }
}
