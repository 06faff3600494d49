//! Driving ports for subscription payments.
//!
//! Inbound adapters call [`PaymentsCommand`] to start payments, react to
//! gateway notifications and change the subscription, and [`PaymentsQuery`]
//! for read-only views (plans, quotes, status, history).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::br::CardInput;
use crate::domain::{
    AccountId, Error, Money, PaymentEntry, PaymentStatus, Plan, PlanDetails, Quote, Subscription,
    SubscriptionStatus,
};

/// Purchase request shared by PIX and boleto.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseRequest {
    pub account_id: AccountId,
    pub plan: Plan,
    pub months: u32,
}

/// Card purchase request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardPurchaseRequest {
    pub account_id: AccountId,
    pub plan: Plan,
    pub months: u32,
    pub card: CardInput,
    pub installments: u8,
}

/// Hosted PIX checkout created for a purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PixCheckout {
    pub preference_id: String,
    /// URL the customer opens to pay.
    pub init_point: String,
    pub sandbox_init_point: Option<String>,
    #[schema(value_type = i64)]
    pub amount: Money,
    pub expires_at: DateTime<Utc>,
    pub external_reference: String,
}

/// Outcome of a card payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CardPaymentOutcome {
    pub payment_id: String,
    pub status: PaymentStatus,
    pub status_detail: Option<String>,
    #[schema(value_type = i64)]
    pub amount: Money,
    /// Whether the subscription is now active.
    pub activated: bool,
    pub due_date: Option<DateTime<Utc>>,
}

/// Boleto issued for a purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoletoSlip {
    pub payment_id: String,
    #[schema(value_type = i64)]
    pub amount: Money,
    pub ticket_url: Option<String>,
    pub barcode: Option<String>,
    pub expires_at: DateTime<Utc>,
}

/// Notification delivered by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentNotification {
    /// Notification type; only `payment` is acted upon.
    pub topic: String,
    pub payment_id: Option<String>,
}

/// What handling a notification did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationOutcome {
    /// Not a payment notification, or no payment id.
    Ignored,
    /// The external reference does not name a known account.
    UnknownAccount,
    /// The history was reconciled; `activated` reports a new activation.
    Reconciled {
        status: PaymentStatus,
        activated: bool,
    },
}

/// Subscription fields shown to customers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSummary {
    pub plan: Plan,
    pub status: SubscriptionStatus,
    pub due_date: Option<DateTime<Utc>>,
    #[schema(value_type = i64)]
    pub price: Money,
    pub auto_renew: bool,
}

impl From<&Subscription> for SubscriptionSummary {
    fn from(value: &Subscription) -> Self {
        Self {
            plan: value.plan,
            status: value.status,
            due_date: value.due_date,
            price: value.price,
            auto_renew: value.auto_renew,
        }
    }
}

/// Cancellation acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancellationReceipt {
    /// Access continues until this instant.
    pub access_until: Option<DateTime<Utc>>,
    pub reason: Option<String>,
}

/// Gateway status of a single payment.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusView {
    pub id: String,
    pub status: String,
    pub status_detail: Option<String>,
    #[schema(value_type = i64)]
    pub amount: Money,
    pub payment_method_id: Option<String>,
    /// Approval date, or creation date while not approved.
    pub date: Option<DateTime<Utc>>,
    pub approved: bool,
}

/// Current subscription and its payment history, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentHistory {
    pub current: SubscriptionSummary,
    pub entries: Vec<PaymentEntry>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentsCommand: Send + Sync {
    /// Create a PIX-only hosted checkout.
    async fn create_pix(&self, request: PurchaseRequest) -> Result<PixCheckout, Error>;

    /// Tokenise the card and charge it, activating on approval.
    async fn create_card(&self, request: CardPurchaseRequest)
    -> Result<CardPaymentOutcome, Error>;

    /// Issue a boleto for a period of at least twelve months.
    async fn create_boleto(&self, request: PurchaseRequest) -> Result<BoletoSlip, Error>;

    /// Reconcile a gateway notification.
    async fn handle_notification(
        &self,
        notification: PaymentNotification,
    ) -> Result<NotificationOutcome, Error>;

    async fn cancel(
        &self,
        account_id: &AccountId,
        reason: Option<String>,
    ) -> Result<CancellationReceipt, Error>;

    async fn reactivate(&self, account_id: &AccountId) -> Result<SubscriptionSummary, Error>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentsQuery: Send + Sync {
    fn plans(&self) -> Vec<PlanDetails>;

    fn quote(&self, plan: Plan, months: u32, coupon: Option<String>) -> Result<Quote, Error>;

    /// Gateway status of a payment owned by `account_id`.
    async fn payment_status(
        &self,
        account_id: &AccountId,
        payment_id: &str,
    ) -> Result<PaymentStatusView, Error>;

    async fn history(&self, account_id: &AccountId) -> Result<PaymentHistory, Error>;
}
