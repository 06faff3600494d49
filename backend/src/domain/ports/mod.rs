//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports ([`AccountRepository`], [`PaymentGateway`]) are implemented
//! by outbound adapters. Driving ports ([`PaymentsCommand`],
//! [`PaymentsQuery`], [`AccountsCommand`], [`AccountsQuery`]) are
//! implemented by domain services and called by inbound adapters.

mod macros;
pub(crate) use macros::define_port_error;

mod account_repository;
mod accounts;
mod payment_gateway;
mod payments;

#[cfg(test)]
pub use account_repository::MockAccountRepository;
pub use account_repository::{AccountRepository, AccountRepositoryError};
#[cfg(test)]
pub use accounts::{MockAccountsCommand, MockAccountsQuery};
pub use accounts::{
    AccountSummary, AccountsCommand, AccountsQuery, AddProfileRequest, LoginRequest,
    RegisterDeviceRequest,
};
#[cfg(test)]
pub use payment_gateway::MockPaymentGateway;
pub use payment_gateway::{
    BackUrls, CardToken, CardTokenRequest, GatewayPayment, Payer, PayerAddress, PaymentGateway,
    PaymentGatewayError, PaymentInstrument, PaymentRequest, Preference, PreferenceRequest,
};
#[cfg(test)]
pub use payments::{MockPaymentsCommand, MockPaymentsQuery};
pub use payments::{
    BoletoSlip, CancellationReceipt, CardPaymentOutcome, CardPurchaseRequest,
    NotificationOutcome, PaymentHistory, PaymentNotification, PaymentStatusView, PaymentsCommand,
    PaymentsQuery, PixCheckout, PurchaseRequest, SubscriptionSummary,
};
