//! Driving ports for account registration, login and self-service.

use async_trait::async_trait;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::SubscriptionSummary;
use crate::domain::br::RegistrationInput;
use crate::domain::{AccountId, AgeRating, Device, DeviceKind, Entitlements, Error, Profile};

/// Login credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddProfileRequest {
    pub account_id: AccountId,
    pub name: String,
    pub avatar: Option<String>,
    pub age_rating: AgeRating,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterDeviceRequest {
    pub account_id: AccountId,
    pub device_id: String,
    pub name: String,
    pub kind: DeviceKind,
    pub ip: Option<String>,
}

/// Account view returned to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: AccountId,
    pub full_name: String,
    pub email: String,
    /// `000.000.000-00`.
    pub cpf: Option<String>,
    pub phone: Option<String>,
    pub age: Option<u32>,
    pub subscription: SubscriptionSummary,
    pub has_access: bool,
    pub entitlements: Entitlements,
    pub profiles: Vec<Profile>,
    pub active_profile: Option<Uuid>,
    pub devices: Vec<Device>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountsCommand: Send + Sync {
    async fn register(&self, input: RegistrationInput) -> Result<AccountSummary, Error>;

    /// Verify credentials and return the account id.
    async fn authenticate(&self, request: LoginRequest) -> Result<AccountId, Error>;

    async fn add_profile(&self, request: AddProfileRequest) -> Result<Profile, Error>;

    async fn register_device(&self, request: RegisterDeviceRequest) -> Result<Device, Error>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountsQuery: Send + Sync {
    async fn profile(&self, account_id: &AccountId) -> Result<AccountSummary, Error>;
}
