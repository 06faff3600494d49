//! Subscription payment services.
//!
//! [`PaymentsService`] implements the payment driving ports on top of the
//! account repository and the payment gateway. Every mutation follows a
//! read-modify-write cycle on the account document guarded by its revision.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use mockable::Clock;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::domain::br::{self, CardInput, detect_brand, validate_card};
use crate::domain::ports::{
    AccountRepository, BackUrls, BoletoSlip, CancellationReceipt, CardPaymentOutcome,
    CardPurchaseRequest, CardTokenRequest, GatewayPayment, NotificationOutcome, Payer,
    PayerAddress, PaymentGateway, PaymentHistory, PaymentInstrument, PaymentNotification,
    PaymentRequest, PaymentStatusView, PaymentsCommand, PaymentsQuery, PixCheckout,
    PreferenceRequest, PurchaseRequest, SubscriptionSummary,
};
use crate::domain::pricing::{self, validate_months};
use crate::domain::service_support::{
    load_account, map_account_repository_error, map_gateway_error, save_account,
};
use crate::domain::{
    Account, AccountId, Error, ExternalReference, PaymentEntry, PaymentMethod,
    PaymentMethodInfo, PaymentStatus, Plan, PlanDetails, Quote,
};

/// Minutes a PIX checkout stays payable.
pub const PIX_EXPIRY_MINUTES: i64 = 30;
/// Days until an issued boleto expires.
pub const BOLETO_EXPIRY_DAYS: i64 = 3;
/// Gateway method id used for boletos.
pub const BOLETO_METHOD_ID: &str = "bolbradesco";
/// Maximum card installments.
pub const MAX_INSTALLMENTS: u8 = 12;

const PIX_EXCLUDED_PAYMENT_TYPES: [&str; 3] = ["credit_card", "debit_card", "ticket"];

/// Public URLs used for checkout redirects and gateway notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentUrls {
    frontend: String,
    backend: String,
}

impl PaymentUrls {
    /// Build from base URLs; trailing slashes are ignored.
    pub fn new(frontend: impl AsRef<str>, backend: impl AsRef<str>) -> Self {
        Self {
            frontend: frontend.as_ref().trim_end_matches('/').to_owned(),
            backend: backend.as_ref().trim_end_matches('/').to_owned(),
        }
    }

    /// Checkout redirect targets under `<frontend>/pagamento/`.
    #[must_use]
    pub fn back_urls(&self) -> BackUrls {
        BackUrls {
            success: format!("{}/pagamento/sucesso", self.frontend),
            failure: format!("{}/pagamento/erro", self.frontend),
            pending: format!("{}/pagamento/pendente", self.frontend),
        }
    }

    /// Webhook endpoint advertised to the gateway.
    #[must_use]
    pub fn notification_url(&self) -> String {
        format!("{}/api/pagamentos/webhook", self.backend)
    }
}

/// Payments service implementing [`PaymentsCommand`] and [`PaymentsQuery`].
#[derive(Clone)]
pub struct PaymentsService<R, G> {
    accounts: Arc<R>,
    gateway: Arc<G>,
    clock: Arc<dyn Clock>,
    urls: PaymentUrls,
}

impl<R, G> PaymentsService<R, G> {
    pub fn new(accounts: Arc<R>, gateway: Arc<G>, clock: Arc<dyn Clock>, urls: PaymentUrls) -> Self {
        Self {
            accounts,
            gateway,
            clock,
            urls,
        }
    }
}

fn require_paid_plan(plan: Plan) -> Result<(), Error> {
    if plan.is_paid() {
        Ok(())
    } else {
        Err(
            Error::invalid_request("the free plan does not require payment")
                .with_details(json!({ "field": "plan", "code": "free_plan" })),
        )
    }
}

fn card_error(error: br::CardError) -> Error {
    Error::invalid_request(format!("invalid card: {error}")).with_details(json!({
        "field": "card",
        "code": error.code(),
    }))
}

fn payer_for(account: &Account) -> Payer {
    Payer {
        email: account.email.to_string(),
        first_name: account.first_name.clone(),
        last_name: account.last_name.clone(),
        cpf: account.cpf.as_ref().map(|cpf| cpf.digits().to_owned()),
        phone: account.phone.as_ref().map(|phone| phone.digits().to_owned()),
        address: account.address.as_ref().map(|address| PayerAddress {
            zip_code: address.cep.digits().to_owned(),
            street_name: address.street.clone(),
            street_number: address.number.clone(),
            neighborhood: address.district.clone(),
            city: address.city.clone(),
            federal_unit: address.state.clone(),
        }),
    }
}

impl<R, G> PaymentsService<R, G>
where
    R: AccountRepository,
    G: PaymentGateway,
{
    fn now(&self) -> DateTime<Utc> {
        self.clock.utc()
    }

    async fn load(&self, account_id: &AccountId) -> Result<Account, Error> {
        load_account(self.accounts.as_ref(), account_id).await
    }

    async fn save(&self, account: &mut Account) -> Result<(), Error> {
        save_account(self.accounts.as_ref(), account, self.now()).await
    }

    fn validate_purchase(plan: Plan, months: u32) -> Result<(), Error> {
        require_paid_plan(plan)?;
        validate_months(months)
    }

    async fn tokenise(&self, card: &CardInput, account: &Account) -> Result<(String, String), Error> {
        let token = self
            .gateway
            .create_card_token(&CardTokenRequest {
                card_number: card.digits(),
                security_code: card.cvv.trim().to_owned(),
                expiration_month: card.expiry_month,
                expiration_year: card.full_expiry_year(),
                holder_name: card.holder_name.trim().to_owned(),
                holder_cpf: account.cpf.as_ref().map(|cpf| cpf.digits().to_owned()),
            })
            .await
            .map_err(map_gateway_error)?;
        let method_id = token
            .payment_method_id
            .unwrap_or_else(|| detect_brand(&card.number).as_str().to_owned());
        Ok((token.id, method_id))
    }

    /// Apply a gateway payment to its account, activating on first approval.
    fn apply_gateway_payment(
        account: &mut Account,
        payment: &GatewayPayment,
        reference: &ExternalReference,
        now: DateTime<Utc>,
    ) -> (PaymentStatus, bool) {
        let status = PaymentStatus::from_gateway(&payment.status);
        let method = payment
            .payment_method_id
            .as_deref()
            .map_or(PaymentMethod::MercadoPago, PaymentMethod::from_gateway_method_id);
        let outcome = account.subscription.reconcile(&payment.id, status, || PaymentEntry {
            date: payment.date_created.unwrap_or(now),
            amount: payment.amount,
            method,
            status,
            transaction_id: payment.id.clone(),
            gateway_payment_id: Some(payment.id.clone()),
        });
        let activated = outcome.newly_approved(status);
        if activated {
            let months = payment.months.unwrap_or(1).clamp(1, pricing::MAX_MONTHS);
            account.activate_subscription(
                reference.plan,
                months,
                PaymentMethodInfo::of_kind(method),
                now,
            );
        }
        (status, activated)
    }
}

#[async_trait]
impl<R, G> PaymentsCommand for PaymentsService<R, G>
where
    R: AccountRepository,
    G: PaymentGateway,
{
    async fn create_pix(&self, request: PurchaseRequest) -> Result<PixCheckout, Error> {
        Self::validate_purchase(request.plan, request.months)?;
        let mut account = self.load(&request.account_id).await?;
        let now = self.now();

        let amount = request.plan.monthly_price().times(request.months);
        let reference = ExternalReference::issued_now(account.id, request.plan, now);
        let expires_at = now + Duration::minutes(PIX_EXPIRY_MINUTES);
        let preference = self
            .gateway
            .create_preference(&PreferenceRequest {
                title: format!("StreamFlix Brasil - Plano {}", request.plan.display_name()),
                description: format!(
                    "Assinatura {} por {} mês(es)",
                    request.plan.display_name().to_lowercase(),
                    request.months
                ),
                unit_price: amount,
                payer: payer_for(&account),
                excluded_payment_types: PIX_EXCLUDED_PAYMENT_TYPES
                    .iter()
                    .map(|kind| (*kind).to_owned())
                    .collect(),
                installments: 1,
                back_urls: self.urls.back_urls(),
                notification_url: self.urls.notification_url(),
                external_reference: reference.to_string(),
                expires_at,
                months: request.months,
            })
            .await
            .map_err(map_gateway_error)?;

        account.subscription.gateway.preference_id = Some(preference.id.clone());
        self.save(&mut account).await?;
        info!(
            account_id = %account.id,
            plan = %request.plan,
            months = request.months,
            preference_id = %preference.id,
            "pix checkout created"
        );

        Ok(PixCheckout {
            preference_id: preference.id,
            init_point: preference.init_point,
            sandbox_init_point: preference.sandbox_init_point,
            amount,
            expires_at,
            external_reference: reference.to_string(),
        })
    }

    async fn create_card(
        &self,
        request: CardPurchaseRequest,
    ) -> Result<CardPaymentOutcome, Error> {
        Self::validate_purchase(request.plan, request.months)?;
        if !(1..=MAX_INSTALLMENTS).contains(&request.installments) {
            return Err(Error::invalid_request(format!(
                "installments must be between 1 and {MAX_INSTALLMENTS}"
            ))
            .with_details(json!({ "field": "installments", "value": request.installments })));
        }
        let now = self.now();
        validate_card(&request.card, now.date_naive()).map_err(card_error)?;
        let mut account = self.load(&request.account_id).await?;

        let (token, method_id) = self.tokenise(&request.card, &account).await?;
        let amount = request.plan.monthly_price().times(request.months);
        let reference = ExternalReference::issued_now(account.id, request.plan, now);
        let payment = self
            .gateway
            .create_payment(&PaymentRequest {
                amount,
                description: format!("StreamFlix Brasil - Plano {}", request.plan.display_name()),
                instrument: PaymentInstrument::Card {
                    token,
                    installments: request.installments,
                    payment_method_id: method_id.clone(),
                },
                payer: payer_for(&account),
                external_reference: reference.to_string(),
                notification_url: self.urls.notification_url(),
                months: request.months,
            })
            .await
            .map_err(map_gateway_error)?;

        let status = PaymentStatus::from_gateway(&payment.status);
        account.subscription.record_payment(PaymentEntry {
            date: now,
            amount,
            method: PaymentMethod::CreditCard,
            status,
            transaction_id: payment.id.clone(),
            gateway_payment_id: Some(payment.id.clone()),
        });
        let activated = status == PaymentStatus::Approved;
        if activated {
            account.activate_subscription(
                request.plan,
                request.months,
                PaymentMethodInfo {
                    kind: PaymentMethod::CreditCard,
                    last_four: Some(request.card.last_four()),
                    brand: Some(method_id),
                },
                now,
            );
        }
        self.save(&mut account).await?;
        info!(
            account_id = %account.id,
            payment_id = %payment.id,
            status = %payment.status,
            activated,
            "card payment processed"
        );

        Ok(CardPaymentOutcome {
            payment_id: payment.id,
            status,
            status_detail: payment.status_detail,
            amount,
            activated,
            due_date: activated
                .then_some(account.subscription.due_date)
                .flatten(),
        })
    }

    async fn create_boleto(&self, request: PurchaseRequest) -> Result<BoletoSlip, Error> {
        require_paid_plan(request.plan)?;
        let amount = pricing::boleto_amount(request.plan, request.months)?;
        let mut account = self.load(&request.account_id).await?;
        let payer = payer_for(&account);
        if payer.address.is_none() || payer.cpf.is_none() {
            return Err(Error::invalid_request(
                "boleto payments require a CPF and postal address on the account",
            )
            .with_details(json!({ "code": "missing_payer_data" })));
        }
        let now = self.now();
        let expires_at = now + Duration::days(BOLETO_EXPIRY_DAYS);
        let reference = ExternalReference::issued_now(account.id, request.plan, now);
        let payment = self
            .gateway
            .create_payment(&PaymentRequest {
                amount,
                description: format!(
                    "StreamFlix Brasil - Plano {} Anual",
                    request.plan.display_name()
                ),
                instrument: PaymentInstrument::Boleto { expires_at },
                payer,
                external_reference: reference.to_string(),
                notification_url: self.urls.notification_url(),
                months: request.months,
            })
            .await
            .map_err(map_gateway_error)?;

        account.subscription.record_payment(PaymentEntry {
            date: now,
            amount,
            method: PaymentMethod::Boleto,
            status: PaymentStatus::Pending,
            transaction_id: payment.id.clone(),
            gateway_payment_id: Some(payment.id.clone()),
        });
        self.save(&mut account).await?;
        info!(account_id = %account.id, payment_id = %payment.id, "boleto issued");

        Ok(BoletoSlip {
            payment_id: payment.id,
            amount,
            ticket_url: payment.ticket_url,
            barcode: payment.barcode,
            expires_at,
        })
    }

    async fn handle_notification(
        &self,
        notification: PaymentNotification,
    ) -> Result<NotificationOutcome, Error> {
        if notification.topic != "payment" {
            debug!(topic = %notification.topic, "ignoring non-payment notification");
            return Ok(NotificationOutcome::Ignored);
        }
        let Some(payment_id) = notification.payment_id else {
            warn!("payment notification without a payment id");
            return Ok(NotificationOutcome::Ignored);
        };

        let payment = self
            .gateway
            .get_payment(&payment_id)
            .await
            .map_err(map_gateway_error)?;
        let Some(reference) = payment
            .external_reference
            .as_deref()
            .and_then(|raw| raw.parse::<ExternalReference>().ok())
        else {
            warn!(payment_id = %payment.id, "payment without a usable external reference");
            return Ok(NotificationOutcome::UnknownAccount);
        };

        let Some(mut account) = self
            .accounts
            .find_by_id(&reference.account_id)
            .await
            .map_err(map_account_repository_error)?
        else {
            warn!(
                payment_id = %payment.id,
                account_id = %reference.account_id,
                "payment references an unknown account"
            );
            return Ok(NotificationOutcome::UnknownAccount);
        };

        let now = self.now();
        let (status, activated) = Self::apply_gateway_payment(&mut account, &payment, &reference, now);
        self.save(&mut account).await?;
        info!(
            account_id = %account.id,
            payment_id = %payment.id,
            ?status,
            activated,
            "payment notification reconciled"
        );
        Ok(NotificationOutcome::Reconciled { status, activated })
    }

    async fn cancel(
        &self,
        account_id: &AccountId,
        reason: Option<String>,
    ) -> Result<CancellationReceipt, Error> {
        let mut account = self.load(account_id).await?;
        let now = self.now();
        account.subscription.cancel(now).map_err(|error| {
            Error::invalid_request(error.to_string())
                .with_details(json!({ "code": error.code() }))
        })?;
        if let Some(subscription_id) = account.subscription.gateway.subscription_id.clone() {
            self.gateway
                .cancel_subscription(&subscription_id)
                .await
                .map_err(map_gateway_error)?;
        }
        self.save(&mut account).await?;
        info!(account_id = %account.id, reason = ?reason, "subscription cancelled");
        Ok(CancellationReceipt {
            access_until: account.subscription.due_date,
            reason,
        })
    }

    async fn reactivate(&self, account_id: &AccountId) -> Result<SubscriptionSummary, Error> {
        let mut account = self.load(account_id).await?;
        account.subscription.reactivate(self.now()).map_err(|error| {
            Error::invalid_request(error.to_string())
                .with_details(json!({ "code": error.code() }))
        })?;
        self.save(&mut account).await?;
        info!(account_id = %account.id, "subscription reactivated");
        Ok(SubscriptionSummary::from(&account.subscription))
    }
}

#[async_trait]
impl<R, G> PaymentsQuery for PaymentsService<R, G>
where
    R: AccountRepository,
    G: PaymentGateway,
{
    fn plans(&self) -> Vec<PlanDetails> {
        Plan::ALL.iter().map(|plan| plan.details()).collect()
    }

    fn quote(&self, plan: Plan, months: u32, coupon: Option<String>) -> Result<Quote, Error> {
        pricing::quote(plan, months, coupon.as_deref())
    }

    async fn payment_status(
        &self,
        account_id: &AccountId,
        payment_id: &str,
    ) -> Result<PaymentStatusView, Error> {
        let payment = self
            .gateway
            .get_payment(payment_id)
            .await
            .map_err(map_gateway_error)?;
        let owner = payment
            .external_reference
            .as_deref()
            .and_then(|raw| raw.parse::<ExternalReference>().ok())
            .map(|reference| reference.account_id);
        if owner.as_ref() != Some(account_id) {
            return Err(Error::not_found(format!("payment {payment_id} not found")));
        }
        let approved = payment.status == "approved";
        Ok(PaymentStatusView {
            date: payment.date_approved.or(payment.date_created),
            id: payment.id,
            status: payment.status,
            status_detail: payment.status_detail,
            amount: payment.amount,
            payment_method_id: payment.payment_method_id,
            approved,
        })
    }

    async fn history(&self, account_id: &AccountId) -> Result<PaymentHistory, Error> {
        let account = self.load(account_id).await?;
        Ok(PaymentHistory {
            current: SubscriptionSummary::from(&account.subscription),
            entries: account.subscription.history_newest_first(),
        })
    }
}

#[cfg(test)]
#[path = "payment_service_tests.rs"]
mod tests;
