//! Shared fixtures for domain service tests.

use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use mockable::Clock;

use crate::domain::br::AddressInput;
use crate::domain::{Account, Address, Cpf, Email, NewAccount, Phone};

pub(crate) fn fixture_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 15, 9, 30, 0)
        .single()
        .expect("valid fixture timestamp")
}

pub(crate) struct FixtureClock {
    pub(crate) utc_now: DateTime<Utc>,
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc_now.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.utc_now
    }
}

pub(crate) fn fixture_clock() -> Arc<dyn Clock> {
    Arc::new(FixtureClock {
        utc_now: fixture_timestamp(),
    })
}

pub(crate) fn address_input() -> AddressInput {
    AddressInput {
        cep: "01310-100".to_owned(),
        street: "Avenida Paulista".to_owned(),
        number: "1000".to_owned(),
        complement: Some("Apto 42".to_owned()),
        district: "Bela Vista".to_owned(),
        city: "São Paulo".to_owned(),
        state: "SP".to_owned(),
    }
}

/// Account with CPF, phone and address opened at the fixture timestamp.
pub(crate) fn sample_account() -> Account {
    Account::open(
        NewAccount {
            first_name: "Maria".to_owned(),
            last_name: "Silva".to_owned(),
            email: Email::parse("maria@example.com").expect("valid email"),
            phone: Some(Phone::parse("11987654321").expect("valid phone")),
            cpf: Some(Cpf::parse("529.982.247-25").expect("valid cpf")),
            birth_date: NaiveDate::from_ymd_opt(1990, 7, 1),
            gender: None,
            address: Some(Address::from_input(&address_input()).expect("valid address")),
            password_hash: "$argon2id$placeholder".to_owned(),
            accepts_marketing: true,
        },
        fixture_timestamp(),
    )
}
