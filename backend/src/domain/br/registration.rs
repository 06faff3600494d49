//! Whole-form validation for new accounts.

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use utoipa::ToSchema;

use super::{
    AddressInput, check_password_strength, validate_address, validate_cpf, validate_email,
    validate_phone,
};
use crate::domain::account::Gender;

/// Youngest age allowed to register.
pub const MIN_AGE: u32 = 13;

/// Registration form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub cpf: String,
    pub phone: String,
    pub birth_date: NaiveDate,
    pub password: String,
    #[serde(default)]
    pub gender: Option<Gender>,
    pub address: AddressInput,
    /// LGPD consent to data collection; required.
    #[serde(default)]
    pub accepts_data_collection: bool,
    #[serde(default)]
    pub accepts_marketing: bool,
}

/// Whole years between `birth_date` and `today`.
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use streamflix::domain::br::age_on;
///
/// let birth = NaiveDate::from_ymd_opt(2000, 6, 15).unwrap();
/// assert_eq!(age_on(birth, NaiveDate::from_ymd_opt(2026, 6, 14).unwrap()), 25);
/// assert_eq!(age_on(birth, NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()), 26);
/// ```
#[must_use]
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> u32 {
    if birth_date >= today {
        return 0;
    }
    let mut years = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        years -= 1;
    }
    u32::try_from(years).unwrap_or(0)
}

fn name_too_short(name: &str) -> bool {
    name.trim().chars().count() < 2
}

/// Every problem with the form; empty when it can be accepted.
#[must_use]
pub fn validate_registration(input: &RegistrationInput, today: NaiveDate) -> Vec<String> {
    let mut errors = Vec::new();
    if name_too_short(&input.first_name) {
        errors.push("first name must have at least 2 characters".to_owned());
    }
    if name_too_short(&input.last_name) {
        errors.push("last name must have at least 2 characters".to_owned());
    }
    if !validate_email(&input.email) {
        errors.push("invalid e-mail address".to_owned());
    }
    if !validate_cpf(&input.cpf) {
        errors.push("invalid CPF".to_owned());
    }
    if !validate_phone(&input.phone) {
        errors.push("invalid phone number".to_owned());
    }
    if input.birth_date >= today {
        errors.push("birth date must be in the past".to_owned());
    } else if age_on(input.birth_date, today) < MIN_AGE {
        errors.push(format!("minimum age is {MIN_AGE} years"));
    }
    errors.extend(
        check_password_strength(&input.password)
            .into_iter()
            .map(|issue| issue.message().to_owned()),
    );
    errors.extend(validate_address(&input.address));
    if !input.accepts_data_collection {
        errors.push("consent to data collection is required".to_owned());
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).expect("valid date")
    }

    #[fixture]
    fn form() -> RegistrationInput {
        RegistrationInput {
            first_name: "Maria".to_owned(),
            last_name: "Silva".to_owned(),
            email: "maria@example.com".to_owned(),
            cpf: "529.982.247-25".to_owned(),
            phone: "(11) 98765-4321".to_owned(),
            birth_date: NaiveDate::from_ymd_opt(1990, 7, 1).expect("valid date"),
            password: "S3nha!Forte".to_owned(),
            gender: None,
            address: AddressInput {
                cep: "01310-100".to_owned(),
                street: "Avenida Paulista".to_owned(),
                number: "1578".to_owned(),
                complement: None,
                district: "Bela Vista".to_owned(),
                city: "São Paulo".to_owned(),
                state: "SP".to_owned(),
            },
            accepts_data_collection: true,
            accepts_marketing: false,
        }
    }

    #[rstest]
    fn accepts_valid_form(form: RegistrationInput, today: NaiveDate) {
        assert_eq!(validate_registration(&form, today), Vec::<String>::new());
    }

    #[rstest]
    #[case(NaiveDate::from_ymd_opt(2013, 3, 11), "minimum age is 13 years")]
    #[case(NaiveDate::from_ymd_opt(2026, 3, 10), "birth date must be in the past")]
    fn rejects_underage_and_future_births(
        mut form: RegistrationInput,
        today: NaiveDate,
        #[case] birth: Option<NaiveDate>,
        #[case] expected: &str,
    ) {
        form.birth_date = birth.expect("valid date");
        assert_eq!(validate_registration(&form, today), vec![expected.to_owned()]);
    }

    #[rstest]
    fn thirteenth_birthday_is_old_enough(mut form: RegistrationInput, today: NaiveDate) {
        form.birth_date = NaiveDate::from_ymd_opt(2013, 3, 10).expect("valid date");
        assert!(validate_registration(&form, today).is_empty());
    }

    #[rstest]
    fn collects_every_problem(mut form: RegistrationInput, today: NaiveDate) {
        form.first_name = "M".to_owned();
        form.cpf = "111.111.111-11".to_owned();
        form.password = "fraca".to_owned();
        form.accepts_data_collection = false;
        let errors = validate_registration(&form, today);
        assert!(errors.contains(&"first name must have at least 2 characters".to_owned()));
        assert!(errors.contains(&"invalid CPF".to_owned()));
        assert!(errors.contains(&"password must have at least 8 characters".to_owned()));
        assert!(errors.contains(&"consent to data collection is required".to_owned()));
    }
}
