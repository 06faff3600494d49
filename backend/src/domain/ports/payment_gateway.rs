//! Port for the external payment gateway.
//!
//! The domain talks to the gateway through these request and response
//! shapes. Amounts are [`Money`]; adapters translate to the provider's
//! decimal representation and wire names.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::Money;

use super::define_port_error;

define_port_error! {
    /// Errors raised by payment gateway adapters.
    pub enum PaymentGatewayError {
        /// Network failure before a response arrived.
        Transport { message: String } =>
            "payment gateway transport failed: {message}",
        /// The gateway did not answer in time.
        Timeout { message: String } =>
            "payment gateway timed out: {message}",
        /// The gateway refused the request.
        Rejected { status: u16, message: String } =>
            "payment gateway rejected request ({status}): {message}",
        /// The referenced payment or resource does not exist.
        NotFound { id: String } =>
            "payment gateway resource {id} not found",
        /// The response body could not be decoded.
        Decode { message: String } =>
            "payment gateway response could not be decoded: {message}",
    }
}

/// Payer identity sent with a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payer {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// CPF digits, when known.
    pub cpf: Option<String>,
    /// Phone digits, when known.
    pub phone: Option<String>,
    pub address: Option<PayerAddress>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayerAddress {
    pub zip_code: String,
    pub street_name: String,
    pub street_number: String,
    pub neighborhood: String,
    pub city: String,
    pub federal_unit: String,
}

/// Redirect targets after a hosted checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackUrls {
    pub success: String,
    pub failure: String,
    pub pending: String,
}

/// Hosted-checkout preference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceRequest {
    pub title: String,
    pub description: String,
    pub unit_price: Money,
    pub payer: Payer,
    /// Payment types hidden from the checkout (`credit_card`, `ticket`, ...).
    pub excluded_payment_types: Vec<String>,
    pub installments: u8,
    pub back_urls: BackUrls,
    pub notification_url: String,
    pub external_reference: String,
    pub expires_at: DateTime<Utc>,
    pub months: u32,
}

/// Single-use card token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardToken {
    pub id: String,
    /// Method id the gateway inferred from the card number (`visa`, `master`, ...).
    pub payment_method_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preference {
    pub id: String,
    pub init_point: String,
    pub sandbox_init_point: Option<String>,
}

/// Raw card data to exchange for a single-use token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardTokenRequest {
    pub card_number: String,
    pub security_code: String,
    pub expiration_month: u32,
    pub expiration_year: u32,
    pub holder_name: String,
    pub holder_cpf: Option<String>,
}

/// How a direct payment is settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentInstrument {
    Card {
        token: String,
        installments: u8,
        /// Gateway method id, usually the card brand.
        payment_method_id: String,
    },
    Boleto {
        expires_at: DateTime<Utc>,
    },
}

/// Direct (non-hosted) payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    pub amount: Money,
    pub description: String,
    pub instrument: PaymentInstrument,
    pub payer: Payer,
    pub external_reference: String,
    pub notification_url: String,
    pub months: u32,
}

/// Gateway view of a payment.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayPayment {
    pub id: String,
    /// Provider status (`approved`, `pending`, `rejected`, ...).
    pub status: String,
    pub status_detail: Option<String>,
    pub amount: Money,
    pub payment_method_id: Option<String>,
    pub external_reference: Option<String>,
    /// Months purchased, from the payment metadata.
    pub months: Option<u32>,
    pub date_created: Option<DateTime<Utc>>,
    pub date_approved: Option<DateTime<Utc>>,
    /// Printable slip URL for boletos.
    pub ticket_url: Option<String>,
    pub barcode: Option<String>,
}

/// Port for creating and querying payments at the gateway.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_preference(
        &self,
        request: &PreferenceRequest,
    ) -> Result<Preference, PaymentGatewayError>;

    async fn create_card_token(
        &self,
        request: &CardTokenRequest,
    ) -> Result<CardToken, PaymentGatewayError>;

    async fn create_payment(
        &self,
        request: &PaymentRequest,
    ) -> Result<GatewayPayment, PaymentGatewayError>;

    async fn get_payment(&self, payment_id: &str) -> Result<GatewayPayment, PaymentGatewayError>;

    /// Cancel a recurring (pre-approval) subscription.
    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), PaymentGatewayError>;
}
