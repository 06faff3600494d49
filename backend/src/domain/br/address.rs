//! Postal address validation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::validate_cep;

/// The 27 federative units.
pub const UF_CODES: [&str; 27] = [
    "AC", "AL", "AP", "AM", "BA", "CE", "DF", "ES", "GO", "MA", "MT", "MS", "MG", "PA", "PB", "PR",
    "PE", "PI", "RJ", "RN", "RS", "RO", "RR", "SC", "SP", "SE", "TO",
];

/// Address as submitted by a client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    pub cep: String,
    pub street: String,
    pub number: String,
    #[serde(default)]
    pub complement: Option<String>,
    pub district: String,
    pub city: String,
    /// Two-letter UF.
    pub state: String,
}

fn shorter_than(value: &str, min: usize) -> bool {
    value.trim().chars().count() < min
}

/// Every problem with `address`; empty when it is acceptable.
#[must_use]
pub fn validate_address(address: &AddressInput) -> Vec<String> {
    let mut errors = Vec::new();
    if !validate_cep(&address.cep) {
        errors.push("invalid CEP".to_owned());
    }
    if shorter_than(&address.street, 5) {
        errors.push("street must have at least 5 characters".to_owned());
    }
    if address.number.trim().is_empty() {
        errors.push("number is required".to_owned());
    }
    if shorter_than(&address.district, 2) {
        errors.push("district must have at least 2 characters".to_owned());
    }
    if shorter_than(&address.city, 2) {
        errors.push("city must have at least 2 characters".to_owned());
    }
    let state = address.state.trim().to_ascii_uppercase();
    if !UF_CODES.contains(&state.as_str()) {
        errors.push("state must be a valid UF".to_owned());
    }
    errors
}
