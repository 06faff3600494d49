//! Domain primitives, aggregates and services.
//!
//! Purpose: model accounts, plans, pricing and the subscription lifecycle
//! independently of HTTP and storage. Inbound and outbound adapters depend on
//! this module; it depends on neither.
//!
//! Public surface:
//! - Error / ErrorCode: transport-agnostic failure payload.
//! - Account and its sub-documents (Profile, Device, Subscription).
//! - Plan, Money and pricing helpers.
//! - `br`: Brazilian validators and formatters.
//! - `ports`: driving and driven port traits.
//! - PaymentsService / AccountsService: driving port implementations.

pub mod account;
pub mod account_service;
pub mod br;
pub mod error;
pub mod money;
pub mod password;
pub mod payment;
pub mod payment_service;
pub mod plan;
pub mod ports;
pub mod pricing;
mod service_support;
pub mod subscription;
#[cfg(test)]
pub(crate) mod test_fixtures;
pub mod trace_id;

pub use self::account::{
    Account, AccountError, AccountId, AccountSettings, AccountStatus, Address, AgeRating,
    Analytics, Device, DeviceKind, Gender, LgpdConsent, NewAccount, PlaybackPreferences, Profile,
};
pub use self::account_service::AccountsService;
pub use self::br::{Cep, Cpf, Email, Phone};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::money::Money;
pub use self::payment::{ExternalReference, PaymentEntry, PaymentMethod, PaymentStatus};
pub use self::payment_service::{PaymentUrls, PaymentsService};
pub use self::plan::{Plan, PlanDetails, VideoQuality};
pub use self::pricing::Quote;
pub use self::subscription::{
    Entitlements, GatewayRefs, PaymentMethodInfo, ReconcileOutcome, Subscription,
    SubscriptionError, SubscriptionStatus,
};
pub use self::trace_id::TraceId;

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use streamflix::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
