//! Wire DTOs for the Mercado Pago REST API.
//!
//! Requests are built from the port request types; responses are decoded
//! here and mapped onto port responses in one pass. Amounts travel as
//! decimal reais on the wire.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Money;
use crate::domain::ports::{
    CardToken, CardTokenRequest, GatewayPayment, Payer, PaymentInstrument, PaymentRequest,
    Preference, PreferenceRequest,
};

const CURRENCY: &str = "BRL";
const BOLETO_METHOD_ID: &str = "bolbradesco";

fn iso(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Serialize)]
pub(super) struct IdentificationDto<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    number: &'a str,
}

impl<'a> IdentificationDto<'a> {
    fn cpf(number: Option<&'a str>) -> Option<Self> {
        number.map(|number| Self {
            kind: "CPF",
            number,
        })
    }
}

#[derive(Debug, Serialize)]
pub(super) struct Metadata {
    months: u32,
}

#[derive(Debug, Serialize)]
struct ItemDto<'a> {
    title: &'a str,
    description: &'a str,
    quantity: u32,
    currency_id: &'static str,
    unit_price: f64,
}

#[derive(Debug, Serialize)]
struct PhoneDto<'a> {
    number: &'a str,
}

#[derive(Debug, Serialize)]
struct PreferencePayerDto<'a> {
    name: &'a str,
    surname: &'a str,
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<PhoneDto<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    identification: Option<IdentificationDto<'a>>,
}

#[derive(Debug, Serialize)]
struct ExcludedTypeDto<'a> {
    id: &'a str,
}

#[derive(Debug, Serialize)]
struct PaymentMethodsDto<'a> {
    excluded_payment_types: Vec<ExcludedTypeDto<'a>>,
    installments: u8,
}

#[derive(Debug, Serialize)]
struct BackUrlsDto<'a> {
    success: &'a str,
    failure: &'a str,
    pending: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct PreferenceRequestDto<'a> {
    items: [ItemDto<'a>; 1],
    payer: PreferencePayerDto<'a>,
    payment_methods: PaymentMethodsDto<'a>,
    back_urls: BackUrlsDto<'a>,
    auto_return: &'static str,
    external_reference: &'a str,
    notification_url: &'a str,
    expires: bool,
    expiration_date_from: String,
    expiration_date_to: String,
    metadata: Metadata,
}

impl<'a> PreferenceRequestDto<'a> {
    pub(super) fn new(request: &'a PreferenceRequest, now: DateTime<Utc>) -> Self {
        let payer = &request.payer;
        Self {
            items: [ItemDto {
                title: &request.title,
                description: &request.description,
                quantity: 1,
                currency_id: CURRENCY,
                unit_price: request.unit_price.to_reais(),
            }],
            payer: PreferencePayerDto {
                name: &payer.first_name,
                surname: &payer.last_name,
                email: &payer.email,
                phone: payer.phone.as_deref().map(|number| PhoneDto { number }),
                identification: IdentificationDto::cpf(payer.cpf.as_deref()),
            },
            payment_methods: PaymentMethodsDto {
                excluded_payment_types: request
                    .excluded_payment_types
                    .iter()
                    .map(|id| ExcludedTypeDto { id })
                    .collect(),
                installments: request.installments,
            },
            back_urls: BackUrlsDto {
                success: &request.back_urls.success,
                failure: &request.back_urls.failure,
                pending: &request.back_urls.pending,
            },
            auto_return: "approved",
            external_reference: &request.external_reference,
            notification_url: &request.notification_url,
            expires: true,
            expiration_date_from: iso(now),
            expiration_date_to: iso(request.expires_at),
            metadata: Metadata {
                months: request.months,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct PreferenceResponseDto {
    id: String,
    init_point: String,
    #[serde(default)]
    sandbox_init_point: Option<String>,
}

impl From<PreferenceResponseDto> for Preference {
    fn from(value: PreferenceResponseDto) -> Self {
        Self {
            id: value.id,
            init_point: value.init_point,
            sandbox_init_point: value.sandbox_init_point,
        }
    }
}

#[derive(Debug, Serialize)]
struct CardholderDto<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    identification: Option<IdentificationDto<'a>>,
}

#[derive(Debug, Serialize)]
pub(super) struct CardTokenRequestDto<'a> {
    card_number: &'a str,
    security_code: &'a str,
    expiration_month: u32,
    expiration_year: u32,
    cardholder: CardholderDto<'a>,
}

impl<'a> From<&'a CardTokenRequest> for CardTokenRequestDto<'a> {
    fn from(request: &'a CardTokenRequest) -> Self {
        Self {
            card_number: &request.card_number,
            security_code: &request.security_code,
            expiration_month: request.expiration_month,
            expiration_year: request.expiration_year,
            cardholder: CardholderDto {
                name: &request.holder_name,
                identification: IdentificationDto::cpf(request.holder_cpf.as_deref()),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct CardTokenResponseDto {
    id: String,
    #[serde(default)]
    payment_method_id: Option<String>,
}

impl From<CardTokenResponseDto> for CardToken {
    fn from(value: CardTokenResponseDto) -> Self {
        Self {
            id: value.id,
            payment_method_id: value.payment_method_id,
        }
    }
}

#[derive(Debug, Serialize)]
struct AddressDto<'a> {
    zip_code: &'a str,
    street_name: &'a str,
    street_number: &'a str,
    neighborhood: &'a str,
    city: &'a str,
    federal_unit: &'a str,
}

#[derive(Debug, Serialize)]
struct PaymentPayerDto<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    identification: Option<IdentificationDto<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<AddressDto<'a>>,
}

impl<'a> PaymentPayerDto<'a> {
    /// Boletos carry the full payer identity; card payments only e-mail and CPF.
    fn new(payer: &'a Payer, full: bool) -> Self {
        Self {
            email: &payer.email,
            first_name: full.then_some(payer.first_name.as_str()),
            last_name: full.then_some(payer.last_name.as_str()),
            identification: IdentificationDto::cpf(payer.cpf.as_deref()),
            address: payer
                .address
                .as_ref()
                .filter(|_| full)
                .map(|address| AddressDto {
                    zip_code: &address.zip_code,
                    street_name: &address.street_name,
                    street_number: &address.street_number,
                    neighborhood: &address.neighborhood,
                    city: &address.city,
                    federal_unit: &address.federal_unit,
                }),
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct PaymentRequestDto<'a> {
    transaction_amount: f64,
    description: &'a str,
    payment_method_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    installments: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date_of_expiration: Option<String>,
    payer: PaymentPayerDto<'a>,
    external_reference: &'a str,
    notification_url: &'a str,
    metadata: Metadata,
}

impl<'a> From<&'a PaymentRequest> for PaymentRequestDto<'a> {
    fn from(request: &'a PaymentRequest) -> Self {
        let (payment_method_id, token, installments, date_of_expiration, full_payer) =
            match &request.instrument {
                PaymentInstrument::Card {
                    token,
                    installments,
                    payment_method_id,
                } => (
                    payment_method_id.as_str(),
                    Some(token.as_str()),
                    Some(*installments),
                    None,
                    false,
                ),
                PaymentInstrument::Boleto { expires_at } => {
                    (BOLETO_METHOD_ID, None, None, Some(iso(*expires_at)), true)
                }
            };
        Self {
            transaction_amount: request.amount.to_reais(),
            description: &request.description,
            payment_method_id,
            token,
            installments,
            date_of_expiration,
            payer: PaymentPayerDto::new(&request.payer, full_payer),
            external_reference: &request.external_reference,
            notification_url: &request.notification_url,
            metadata: Metadata {
                months: request.months,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct PaymentMetadataDto {
    #[serde(default, alias = "meses")]
    months: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TransactionDetailsDto {
    #[serde(default)]
    external_resource_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct BarcodeDto {
    #[serde(default)]
    content: Option<String>,
}

/// Payment resource returned by `/v1/payments`.
#[derive(Debug, Deserialize)]
pub(super) struct PaymentResponseDto {
    id: serde_json::Value,
    status: String,
    #[serde(default)]
    status_detail: Option<String>,
    #[serde(default)]
    transaction_amount: Option<f64>,
    #[serde(default)]
    payment_method_id: Option<String>,
    #[serde(default)]
    external_reference: Option<String>,
    #[serde(default)]
    metadata: Option<PaymentMetadataDto>,
    #[serde(default)]
    date_created: Option<DateTime<Utc>>,
    #[serde(default)]
    date_approved: Option<DateTime<Utc>>,
    #[serde(default)]
    transaction_details: Option<TransactionDetailsDto>,
    #[serde(default)]
    barcode: Option<BarcodeDto>,
}

/// Payment ids are numeric on the wire but opaque strings in the domain.
fn id_to_string(id: serde_json::Value) -> Result<String, String> {
    match id {
        serde_json::Value::String(id) => Ok(id),
        serde_json::Value::Number(id) => Ok(id.to_string()),
        other => Err(format!("unexpected payment id {other}")),
    }
}

impl PaymentResponseDto {
    pub(super) fn into_payment(self) -> Result<GatewayPayment, String> {
        Ok(GatewayPayment {
            id: id_to_string(self.id)?,
            status: self.status,
            status_detail: self.status_detail,
            amount: self
                .transaction_amount
                .map_or(Money::ZERO, Money::from_reais),
            payment_method_id: self.payment_method_id,
            external_reference: self.external_reference,
            months: self.metadata.and_then(|metadata| metadata.months),
            date_created: self.date_created,
            date_approved: self.date_approved,
            ticket_url: self
                .transaction_details
                .and_then(|details| details.external_resource_url),
            barcode: self.barcode.and_then(|barcode| barcode.content),
        })
    }
}

#[derive(Debug, Serialize)]
pub(super) struct PreapprovalUpdateDto {
    pub(super) status: &'static str,
}

/// Error body; Mercado Pago sends `message` and sometimes `cause`.
#[derive(Debug, Deserialize)]
pub(super) struct ErrorResponseDto {
    #[serde(default)]
    pub(super) message: Option<String>,
    #[serde(default)]
    pub(super) error: Option<String>,
}
