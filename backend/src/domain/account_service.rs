//! Account registration, login and self-service.
//!
//! [`AccountsService`] implements [`AccountsCommand`] and [`AccountsQuery`].
//! Registration validates the whole form up front and reports every problem
//! at once; login tracks failures on the account and locks it after
//! [`MAX_FAILED_LOGINS`](crate::domain::account::MAX_FAILED_LOGINS)
//! consecutive misses.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde_json::json;
use tracing::{info, warn};

use crate::domain::br::{RegistrationInput, validate_registration};
use crate::domain::password::{hash_password, verify_password};
use crate::domain::ports::{
    AccountRepository, AccountSummary, AccountsCommand, AccountsQuery, AddProfileRequest,
    LoginRequest, RegisterDeviceRequest, SubscriptionSummary,
};
use crate::domain::service_support::{load_account, map_account_repository_error, save_account};
use crate::domain::{
    Account, AccountError, AccountId, AccountStatus, Address, Cpf, Device, Email, Error,
    NewAccount, Phone, Profile,
};

const INVALID_CREDENTIALS: &str = "invalid e-mail or password";

/// Accounts service backed by an [`AccountRepository`].
#[derive(Clone)]
pub struct AccountsService<R> {
    repo: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R> AccountsService<R> {
    pub fn new(repo: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }
}

/// Owner-facing view of `account` at `now`.
#[must_use]
pub fn summarize(account: &Account, now: DateTime<Utc>) -> AccountSummary {
    AccountSummary {
        id: account.id,
        full_name: account.full_name(),
        email: account.email.to_string(),
        cpf: account.formatted_cpf(),
        phone: account.formatted_phone(),
        age: account.age(now.date_naive()),
        subscription: SubscriptionSummary::from(&account.subscription),
        has_access: account.has_access(now),
        entitlements: account.entitlements(now),
        profiles: account.profiles.clone(),
        active_profile: account.active_profile,
        devices: account.devices.clone(),
    }
}

fn account_error(error: AccountError) -> Error {
    let details = match error {
        AccountError::ProfileLimitReached { limit } => {
            json!({ "code": "profile_limit_reached", "limit": limit })
        }
        AccountError::DeviceLimitReached { limit } => {
            json!({ "code": "device_limit_reached", "limit": limit })
        }
        AccountError::InvalidProfileName => json!({ "code": "invalid_profile_name", "field": "name" }),
    };
    let base = match error {
        AccountError::InvalidProfileName => Error::invalid_request(error.to_string()),
        _ => Error::forbidden(error.to_string()),
    };
    base.with_details(details)
}

fn invalid_field(field: &str) -> Error {
    Error::invalid_request(format!("invalid {field}"))
        .with_details(json!({ "field": field, "code": "invalid" }))
}

fn new_account(input: RegistrationInput, password_hash: String) -> Result<NewAccount, Error> {
    Ok(NewAccount {
        email: Email::parse(&input.email).map_err(|_| invalid_field("email"))?,
        phone: Some(Phone::parse(&input.phone).map_err(|_| invalid_field("phone"))?),
        cpf: Some(Cpf::parse(&input.cpf).map_err(|_| invalid_field("cpf"))?),
        address: Some(Address::from_input(&input.address).map_err(|_| invalid_field("address"))?),
        first_name: input.first_name,
        last_name: input.last_name,
        birth_date: Some(input.birth_date),
        gender: input.gender,
        password_hash,
        accepts_marketing: input.accepts_marketing,
    })
}

impl<R> AccountsService<R>
where
    R: AccountRepository,
{
    fn now(&self) -> DateTime<Utc> {
        self.clock.utc()
    }
}

#[async_trait]
impl<R> AccountsCommand for AccountsService<R>
where
    R: AccountRepository,
{
    async fn register(&self, input: RegistrationInput) -> Result<AccountSummary, Error> {
        let now = self.now();
        let issues = validate_registration(&input, now.date_naive());
        if !issues.is_empty() {
            return Err(Error::invalid_request("registration form is invalid")
                .with_details(json!({ "code": "validation_failed", "issues": issues })));
        }

        let email = Email::parse(&input.email).map_err(|_| invalid_field("email"))?;
        if self
            .repo
            .find_by_email(&email)
            .await
            .map_err(map_account_repository_error)?
            .is_some()
        {
            return Err(Error::conflict("an account with this email already exists")
                .with_details(json!({ "field": "email", "code": "duplicate" })));
        }

        let password_hash = hash_password(&input.password)
            .map_err(|err| Error::internal(format!("password hashing failed: {err}")))?;
        let account = Account::open(new_account(input, password_hash)?, now);
        self.repo
            .insert(&account)
            .await
            .map_err(map_account_repository_error)?;
        info!(account_id = %account.id, "account registered");
        Ok(summarize(&account, now))
    }

    async fn authenticate(&self, request: LoginRequest) -> Result<AccountId, Error> {
        let Ok(email) = Email::parse(&request.email) else {
            return Err(Error::unauthorized(INVALID_CREDENTIALS));
        };
        let Some(mut account) = self
            .repo
            .find_by_email(&email)
            .await
            .map_err(map_account_repository_error)?
        else {
            return Err(Error::unauthorized(INVALID_CREDENTIALS));
        };

        let now = self.now();
        if matches!(
            account.status,
            AccountStatus::Suspended | AccountStatus::Banned
        ) {
            warn!(account_id = %account.id, status = ?account.status, "login refused");
            return Err(Error::forbidden("account is not allowed to sign in")
                .with_details(json!({ "code": "account_disabled" })));
        }
        if account.is_locked(now) {
            return Err(
                Error::forbidden("account temporarily locked after repeated failed logins")
                    .with_details(json!({
                        "code": "account_locked",
                        "lockedUntil": account.locked_until,
                    })),
            );
        }

        if !verify_password(&request.password, &account.password_hash) {
            account.record_failed_login(now);
            save_account(self.repo.as_ref(), &mut account, now).await?;
            warn!(
                account_id = %account.id,
                failed_logins = account.failed_logins,
                "failed login"
            );
            return Err(Error::unauthorized(INVALID_CREDENTIALS));
        }

        account.record_successful_login(now);
        save_account(self.repo.as_ref(), &mut account, now).await?;
        info!(account_id = %account.id, "login succeeded");
        Ok(account.id)
    }

    async fn add_profile(&self, request: AddProfileRequest) -> Result<Profile, Error> {
        let mut account = load_account(self.repo.as_ref(), &request.account_id).await?;
        let now = self.now();
        let profile = account
            .add_profile(&request.name, request.avatar, request.age_rating, now)
            .map_err(account_error)?
            .clone();
        save_account(self.repo.as_ref(), &mut account, now).await?;
        Ok(profile)
    }

    async fn register_device(&self, request: RegisterDeviceRequest) -> Result<Device, Error> {
        let mut account = load_account(self.repo.as_ref(), &request.account_id).await?;
        let now = self.now();
        let device = account
            .register_device(
                &request.device_id,
                &request.name,
                request.kind,
                request.ip,
                now,
            )
            .map_err(account_error)?
            .clone();
        save_account(self.repo.as_ref(), &mut account, now).await?;
        Ok(device)
    }
}

#[async_trait]
impl<R> AccountsQuery for AccountsService<R>
where
    R: AccountRepository,
{
    async fn profile(&self, account_id: &AccountId) -> Result<AccountSummary, Error> {
        let account = load_account(self.repo.as_ref(), account_id).await?;
        Ok(summarize(&account, self.now()))
    }
}

#[cfg(test)]
#[path = "account_service_tests.rs"]
mod tests;
