//! In-process payment gateway for development and integration tests.
//!
//! Mimics the sandbox behaviour of Mercado Pago test cards: the cardholder
//! name selects the outcome (`OTHE` is rejected, `CONT` stays pending, any
//! other name is approved). Boletos are always created pending and PIX
//! preferences point at a local checkout URL.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use rand::Rng;
use tokio::sync::Mutex;
use tracing::info;

use crate::domain::ports::{
    CardToken, CardTokenRequest, GatewayPayment, PaymentGateway, PaymentGatewayError,
    PaymentInstrument, PaymentRequest, Preference, PreferenceRequest,
};

const REJECTED_HOLDER: &str = "OTHE";
const PENDING_HOLDER: &str = "CONT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CardOutcome {
    Approve,
    Reject,
    Hold,
}

impl CardOutcome {
    fn for_holder(name: &str) -> Self {
        match name.trim().to_uppercase().as_str() {
            REJECTED_HOLDER => Self::Reject,
            PENDING_HOLDER => Self::Hold,
            _ => Self::Approve,
        }
    }
}

#[derive(Default)]
struct Ledger {
    tokens: HashMap<String, CardOutcome>,
    payments: HashMap<String, GatewayPayment>,
}

/// Gateway double that keeps every payment in memory.
pub struct FixtureGateway {
    clock: Arc<dyn Clock>,
    checkout_base: String,
    ledger: Mutex<Ledger>,
}

impl FixtureGateway {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            checkout_base: "http://localhost/fixture-checkout".to_owned(),
            ledger: Mutex::new(Ledger::default()),
        }
    }

    /// Force a stored payment into `status`, as a webhook-driven settlement would.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentGatewayError::NotFound`] when the id is unknown.
    pub async fn settle(
        &self,
        payment_id: &str,
        status: &str,
    ) -> Result<GatewayPayment, PaymentGatewayError> {
        let mut ledger = self.ledger.lock().await;
        let payment = ledger
            .payments
            .get_mut(payment_id)
            .ok_or_else(|| PaymentGatewayError::not_found(payment_id))?;
        payment.status = status.to_owned();
        payment.status_detail = Some(if status == "approved" {
            "accredited".to_owned()
        } else {
            status.to_owned()
        });
        if status == "approved" {
            payment.date_approved = Some(self.clock.utc());
        }
        Ok(payment.clone())
    }

    /// Record a payment created outside this process (for example by a hosted checkout).
    pub async fn record(&self, payment: GatewayPayment) {
        self.ledger
            .lock()
            .await
            .payments
            .insert(payment.id.clone(), payment);
    }
}

fn numeric_id() -> String {
    rand::thread_rng()
        .gen_range(1_000_000_000_u64..10_000_000_000)
        .to_string()
}

fn hex_id(len: usize) -> String {
    const ALPHABET: &[u8] = b"0123456789abcdef";
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
        .collect()
}

fn barcode() -> String {
    let mut rng = rand::thread_rng();
    (0..47)
        .map(|_| char::from(b'0' + rng.gen_range(0..10_u8)))
        .collect()
}

#[async_trait]
impl PaymentGateway for FixtureGateway {
    async fn create_preference(
        &self,
        request: &PreferenceRequest,
    ) -> Result<Preference, PaymentGatewayError> {
        let id = format!("fixture-{}", hex_id(24));
        let init_point = format!("{}/{id}", self.checkout_base);
        info!(preference_id = %id, reference = %request.external_reference, "fixture preference created");
        Ok(Preference {
            sandbox_init_point: Some(init_point.clone()),
            id,
            init_point,
        })
    }

    async fn create_card_token(
        &self,
        request: &CardTokenRequest,
    ) -> Result<CardToken, PaymentGatewayError> {
        let id = hex_id(32);
        self.ledger
            .lock()
            .await
            .tokens
            .insert(id.clone(), CardOutcome::for_holder(&request.holder_name));
        Ok(CardToken {
            id,
            payment_method_id: None,
        })
    }

    async fn create_payment(
        &self,
        request: &PaymentRequest,
    ) -> Result<GatewayPayment, PaymentGatewayError> {
        let now = self.clock.utc();
        let id = numeric_id();
        let mut ledger = self.ledger.lock().await;

        let (status, detail, method, ticket_url, code) = match &request.instrument {
            PaymentInstrument::Card {
                token,
                payment_method_id,
                ..
            } => {
                let outcome = ledger.tokens.remove(token).ok_or_else(|| {
                    PaymentGatewayError::rejected(400_u16, format!("unknown card token {token}"))
                })?;
                let (status, detail) = match outcome {
                    CardOutcome::Approve => ("approved", "accredited"),
                    CardOutcome::Reject => ("rejected", "cc_rejected_other_reason"),
                    CardOutcome::Hold => ("in_process", "pending_contingency"),
                };
                (status, detail, payment_method_id.clone(), None, None)
            }
            PaymentInstrument::Boleto { .. } => (
                "pending",
                "pending_waiting_payment",
                "bolbradesco".to_owned(),
                Some(format!("{}/boleto/{id}", self.checkout_base)),
                Some(barcode()),
            ),
        };

        let payment = GatewayPayment {
            id: id.clone(),
            status: status.to_owned(),
            status_detail: Some(detail.to_owned()),
            amount: request.amount,
            payment_method_id: Some(method),
            external_reference: Some(request.external_reference.clone()),
            months: Some(request.months),
            date_created: Some(now),
            date_approved: (status == "approved").then_some(now),
            ticket_url,
            barcode: code,
        };
        ledger.payments.insert(id, payment.clone());
        info!(payment_id = %payment.id, status = %payment.status, "fixture payment created");
        Ok(payment)
    }

    async fn get_payment(&self, payment_id: &str) -> Result<GatewayPayment, PaymentGatewayError> {
        self.ledger
            .lock()
            .await
            .payments
            .get(payment_id)
            .cloned()
            .ok_or_else(|| PaymentGatewayError::not_found(payment_id))
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), PaymentGatewayError> {
        info!(subscription_id, "fixture subscription cancelled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::domain::Money;
    use crate::domain::ports::Payer;
    use crate::domain::test_fixtures::{fixture_clock, fixture_timestamp};

    #[fixture]
    fn gateway() -> FixtureGateway {
        FixtureGateway::new(fixture_clock())
    }

    fn payer() -> Payer {
        Payer {
            email: "maria@example.com".to_owned(),
            first_name: "Maria".to_owned(),
            last_name: "Silva".to_owned(),
            cpf: Some("52998224725".to_owned()),
            phone: None,
            address: None,
        }
    }

    fn token_request(holder: &str) -> CardTokenRequest {
        CardTokenRequest {
            card_number: "4111111111111111".to_owned(),
            security_code: "123".to_owned(),
            expiration_month: 12,
            expiration_year: 2030,
            holder_name: holder.to_owned(),
            holder_cpf: None,
        }
    }

    fn payment_request(instrument: PaymentInstrument) -> PaymentRequest {
        PaymentRequest {
            amount: Money::from_centavos(2990),
            description: "StreamFlix Brasil - Plano Premium".to_owned(),
            instrument,
            payer: payer(),
            external_reference: "ref".to_owned(),
            notification_url: "http://localhost/api/pagamentos/webhook".to_owned(),
            months: 1,
        }
    }

    async fn pay_with(gateway: &FixtureGateway, holder: &str) -> GatewayPayment {
        let token = gateway
            .create_card_token(&token_request(holder))
            .await
            .expect("token");
        gateway
            .create_payment(&payment_request(PaymentInstrument::Card {
                token: token.id,
                installments: 1,
                payment_method_id: "visa".to_owned(),
            }))
            .await
            .expect("payment")
    }

    #[rstest]
    #[case::approved("MARIA SILVA", "approved")]
    #[case::rejected("OTHE", "rejected")]
    #[case::pending("cont", "in_process")]
    #[tokio::test]
    async fn holder_name_selects_card_outcome(
        gateway: FixtureGateway,
        #[case] holder: &str,
        #[case] status: &str,
    ) {
        let payment = pay_with(&gateway, holder).await;
        assert_eq!(payment.status, status);
        assert_eq!(payment.months, Some(1));
        let stored = gateway.get_payment(&payment.id).await.expect("stored");
        assert_eq!(stored, payment);
    }

    #[rstest]
    #[tokio::test]
    async fn tokens_are_single_use(gateway: FixtureGateway) {
        let token = gateway
            .create_card_token(&token_request("APRO"))
            .await
            .expect("token");
        let card = PaymentInstrument::Card {
            token: token.id,
            installments: 1,
            payment_method_id: "visa".to_owned(),
        };
        gateway
            .create_payment(&payment_request(card.clone()))
            .await
            .expect("first use");
        let error = gateway
            .create_payment(&payment_request(card))
            .await
            .expect_err("reused token");
        assert!(matches!(error, PaymentGatewayError::Rejected { .. }));
    }

    #[rstest]
    #[tokio::test]
    async fn boleto_is_pending_until_settled(gateway: FixtureGateway) {
        let payment = gateway
            .create_payment(&payment_request(PaymentInstrument::Boleto {
                expires_at: fixture_timestamp() + Duration::days(3),
            }))
            .await
            .expect("boleto");
        assert_eq!(payment.status, "pending");
        assert!(payment.ticket_url.is_some());
        assert_eq!(payment.barcode.as_deref().map(str::len), Some(47));

        let settled = gateway.settle(&payment.id, "approved").await.expect("settle");
        assert_eq!(settled.date_approved, Some(fixture_timestamp()));
    }

    #[rstest]
    #[tokio::test]
    async fn unknown_payment_is_not_found(gateway: FixtureGateway) {
        let error = gateway.get_payment("404").await.expect_err("missing");
        assert_eq!(error, PaymentGatewayError::not_found("404"));
    }
}
