//! Account aggregate.
//!
//! One document per customer embedding profiles, the subscription with its
//! payment history, registered devices and consent/analytics data. The
//! document is persisted as a unit and guarded by `revision` for optimistic
//! concurrency.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::br::{self, Cep, Cpf, Email, Phone};
use super::plan::VideoQuality;
use super::{Entitlements, PaymentMethodInfo, Plan, Subscription};

/// Consecutive failed logins that lock an account.
pub const MAX_FAILED_LOGINS: u32 = 5;
/// How long a locked account stays locked.
pub const LOCKOUT_MINUTES: i64 = 15;
/// Default profile avatar.
pub const DEFAULT_AVATAR: &str = "/avatars/default.png";

/// Stable account identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct AccountId(Uuid);

impl AccountId {
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccountId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
    NonBinary,
    PreferNotToSay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Active,
    Inactive,
    Suspended,
    Banned,
}

/// Validated postal address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[schema(value_type = String)]
    pub cep: Cep,
    pub street: String,
    pub number: String,
    #[serde(default)]
    pub complement: Option<String>,
    pub district: String,
    pub city: String,
    pub state: String,
    pub country: String,
}

impl Address {
    /// Build from form input that already passed [`br::validate_address`].
    pub fn from_input(input: &br::AddressInput) -> Result<Self, br::BrValidationError> {
        Ok(Self {
            cep: Cep::parse(&input.cep)?,
            street: input.street.trim().to_owned(),
            number: input.number.trim().to_owned(),
            complement: input
                .complement
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_owned),
            district: input.district.trim().to_owned(),
            city: input.city.trim().to_owned(),
            state: input.state.trim().to_ascii_uppercase(),
            country: "Brasil".to_owned(),
        })
    }
}

/// Content age rating used for parental controls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum AgeRating {
    #[default]
    #[serde(rename = "FREE")]
    Free,
    #[serde(rename = "10")]
    Ten,
    #[serde(rename = "12")]
    Twelve,
    #[serde(rename = "14")]
    Fourteen,
    #[serde(rename = "16")]
    Sixteen,
    #[serde(rename = "18")]
    Eighteen,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackPreferences {
    pub audio_language: String,
    pub subtitle_language: String,
    pub quality: VideoQuality,
    pub autoplay: bool,
    pub volume: u8,
}

impl Default for PlaybackPreferences {
    fn default() -> Self {
        Self {
            audio_language: "pt-BR".to_owned(),
            subtitle_language: "pt-BR".to_owned(),
            quality: VideoQuality::Auto,
            autoplay: true,
            volume: 80,
        }
    }
}

/// Viewer profile within an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    pub avatar: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    pub age_rating: AgeRating,
    pub parental_control: bool,
    pub preferences: PlaybackPreferences,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceKind {
    Web,
    Android,
    AndroidTv,
    Roku,
    Ios,
    SmartTv,
}

/// Device that has signed into the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub device_id: String,
    pub name: String,
    pub kind: DeviceKind,
    pub last_access: DateTime<Utc>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountSettings {
    pub email_notifications: bool,
    pub push_notifications: bool,
    pub new_releases: bool,
    pub recommendations: bool,
    pub public_history: bool,
    pub language: String,
    pub timezone: String,
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            email_notifications: true,
            push_notifications: true,
            new_releases: true,
            recommendations: true,
            public_history: false,
            language: "pt-BR".to_owned(),
            timezone: "America/Sao_Paulo".to_owned(),
        }
    }
}

/// LGPD consent record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LgpdConsent {
    pub data_collection: bool,
    pub marketing: bool,
    pub consented_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    #[serde(default)]
    pub first_access: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_access: Option<DateTime<Utc>>,
    pub watch_minutes: u64,
    pub titles_watched: u32,
    pub login_count: u32,
}

/// Reasons an account mutation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AccountError {
    #[error("profile limit of {limit} reached")]
    ProfileLimitReached { limit: u8 },
    #[error("device limit of {limit} reached")]
    DeviceLimitReached { limit: u8 },
    #[error("profile name must have 1 to 50 characters")]
    InvalidProfileName,
}

/// Customer account document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    #[serde(default)]
    pub phone: Option<Phone>,
    #[serde(default)]
    pub cpf: Option<Cpf>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub address: Option<Address>,
    pub password_hash: String,
    #[serde(default)]
    pub profiles: Vec<Profile>,
    #[serde(default)]
    pub active_profile: Option<Uuid>,
    pub profile_limit: u8,
    pub subscription: Subscription,
    #[serde(default)]
    pub settings: AccountSettings,
    #[serde(default)]
    pub devices: Vec<Device>,
    pub device_limit: u8,
    pub lgpd: LgpdConsent,
    #[serde(default)]
    pub analytics: Analytics,
    pub status: AccountStatus,
    #[serde(default)]
    pub failed_logins: u32,
    #[serde(default)]
    pub locked_until: Option<DateTime<Utc>>,
    pub revision: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to open an account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub phone: Option<Phone>,
    pub cpf: Option<Cpf>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub address: Option<Address>,
    pub password_hash: String,
    pub accepts_marketing: bool,
}

impl Account {
    /// Open a new account on the free trial.
    ///
    /// Trial accounts carry the FREE plan's limits until a paid plan is
    /// activated.
    #[must_use]
    pub fn open(new: NewAccount, now: DateTime<Utc>) -> Self {
        let free = Plan::Free.details();
        Self {
            id: AccountId::random(),
            first_name: new.first_name.trim().to_owned(),
            last_name: new.last_name.trim().to_owned(),
            email: new.email,
            phone: new.phone,
            cpf: new.cpf,
            birth_date: new.birth_date,
            gender: new.gender,
            address: new.address,
            password_hash: new.password_hash,
            profiles: Vec::new(),
            active_profile: None,
            profile_limit: free.profiles,
            subscription: Subscription::trial(now),
            settings: AccountSettings::default(),
            devices: Vec::new(),
            device_limit: free.screens,
            lgpd: LgpdConsent {
                data_collection: true,
                marketing: new.accepts_marketing,
                consented_at: now,
            },
            analytics: Analytics {
                first_access: Some(now),
                ..Analytics::default()
            },
            status: AccountStatus::Active,
            failed_logins: 0,
            locked_until: None,
            revision: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    #[must_use]
    pub fn age(&self, today: NaiveDate) -> Option<u32> {
        self.birth_date.map(|birth| br::age_on(birth, today))
    }

    #[must_use]
    pub fn formatted_cpf(&self) -> Option<String> {
        self.cpf.as_ref().map(Cpf::formatted)
    }

    #[must_use]
    pub fn formatted_phone(&self) -> Option<String> {
        self.phone.as_ref().map(Phone::formatted)
    }

    #[must_use]
    pub fn has_active_subscription(&self, now: DateTime<Utc>) -> bool {
        self.subscription.is_active(now)
    }

    #[must_use]
    pub fn has_access(&self, now: DateTime<Utc>) -> bool {
        self.subscription.has_access(now)
    }

    /// Limits in force, degrading to the FREE plan without access.
    #[must_use]
    pub fn entitlements(&self, now: DateTime<Utc>) -> Entitlements {
        let plan = self.subscription.entitlements(now);
        if plan.plan == Plan::Free {
            return plan;
        }
        Entitlements {
            plan: plan.plan,
            profiles: self.profile_limit,
            screens: self.device_limit,
        }
    }

    #[must_use]
    pub fn can_add_profile(&self, now: DateTime<Utc>) -> bool {
        self.profiles.len() < usize::from(self.entitlements(now).profiles)
    }

    /// Activate a paid period and raise the account's limits to the plan's.
    pub fn activate_subscription(
        &mut self,
        plan: Plan,
        months: u32,
        method: PaymentMethodInfo,
        now: DateTime<Utc>,
    ) {
        self.subscription.activate(plan, months, method, now);
        let details = plan.details();
        self.profile_limit = details.profiles;
        self.device_limit = details.screens;
    }

    /// Add a viewer profile; the first profile becomes active.
    pub fn add_profile(
        &mut self,
        name: &str,
        avatar: Option<String>,
        age_rating: AgeRating,
        now: DateTime<Utc>,
    ) -> Result<&Profile, AccountError> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > 50 {
            return Err(AccountError::InvalidProfileName);
        }
        if !self.can_add_profile(now) {
            return Err(AccountError::ProfileLimitReached {
                limit: self.entitlements(now).profiles,
            });
        }
        let profile = Profile {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            avatar: avatar.unwrap_or_else(|| DEFAULT_AVATAR.to_owned()),
            birth_date: None,
            age_rating,
            parental_control: false,
            preferences: PlaybackPreferences::default(),
        };
        if self.active_profile.is_none() {
            self.active_profile = Some(profile.id);
        }
        self.profiles.push(profile);
        Ok(&self.profiles[self.profiles.len() - 1])
    }

    /// Refresh a known device or register a new one within the screen limit.
    pub fn register_device(
        &mut self,
        device_id: &str,
        name: &str,
        kind: DeviceKind,
        ip: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<&Device, AccountError> {
        let limit = self.entitlements(now).screens;
        let active = self.devices.iter().filter(|device| device.active).count();
        let position = self.devices.iter().position(|d| d.device_id == device_id);
        let index = match position {
            Some(index) => {
                let reviving = !self.devices[index].active;
                if reviving && active >= usize::from(limit) {
                    return Err(AccountError::DeviceLimitReached { limit });
                }
                let device = &mut self.devices[index];
                device.last_access = now;
                device.active = true;
                device.name = name.to_owned();
                if ip.is_some() {
                    device.ip = ip;
                }
                index
            }
            None => {
                if active >= usize::from(limit) {
                    return Err(AccountError::DeviceLimitReached { limit });
                }
                self.devices.push(Device {
                    device_id: device_id.to_owned(),
                    name: name.to_owned(),
                    kind,
                    last_access: now,
                    ip,
                    location: None,
                    active: true,
                });
                self.devices.len() - 1
            }
        };
        Ok(&self.devices[index])
    }

    /// Whether logins are refused at `now` because of repeated failures.
    #[must_use]
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }

    /// Count a failed login; the fifth consecutive failure locks the account.
    pub fn record_failed_login(&mut self, now: DateTime<Utc>) {
        if self.locked_until.is_some_and(|until| until <= now) {
            self.failed_logins = 0;
            self.locked_until = None;
        }
        self.failed_logins = self.failed_logins.saturating_add(1);
        if self.failed_logins >= MAX_FAILED_LOGINS {
            self.locked_until = Some(now + Duration::minutes(LOCKOUT_MINUTES));
        }
    }

    /// Reset the failure counter and record the access.
    pub fn record_successful_login(&mut self, now: DateTime<Utc>) {
        self.failed_logins = 0;
        self.locked_until = None;
        self.analytics.last_access = Some(now);
        self.analytics.login_count = self.analytics.login_count.saturating_add(1);
    }

    /// Stamp a mutation before persisting.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

#[cfg(test)]
#[path = "account_tests.rs"]
mod tests;
