//! Tests for payment handlers.

use super::*;
use crate::domain::pricing;
use crate::domain::test_fixtures::fixture_timestamp;
use crate::domain::{AccountId, Money, PaymentStatus, Plan, Subscription};
use crate::inbound::http::test_utils::{MockPorts, session_cookie, test_login, test_session_middleware};
use crate::inbound::http::validation::json_error_handler;
use crate::inbound::http::webhook_signature::WebhookVerifier;
use actix_web::http::StatusCode;
use actix_web::{App, test as actix_test, web};
use rstest::rstest;
use serde_json::{Value, json};

const WEBHOOK_SECRET: &str = "webhook-secret";

fn test_app(
    state: HttpState,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(state))
        .app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .wrap(test_session_middleware())
        .service(test_login)
        .service(configure(web::scope("/api/pagamentos")))
}

fn pix_checkout() -> PixCheckout {
    PixCheckout {
        preference_id: "pref-1".to_owned(),
        init_point: "https://mp.example/checkout/pref-1".to_owned(),
        sandbox_init_point: None,
        amount: Money::from_centavos(8_970),
        expires_at: fixture_timestamp(),
        external_reference: "ref".to_owned(),
    }
}

async fn json_body(response: actix_web::dev::ServiceResponse) -> Value {
    let body = actix_test::read_body(response).await;
    serde_json::from_slice(&body).expect("json body")
}

#[actix_web::test]
async fn purchase_requires_login() {
    let app = actix_test::init_service(test_app(MockPorts::default().into_state(WebhookVerifier::default()))).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/pagamentos/pix")
        .set_json(json!({ "plan": "PREMIUM" }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn pix_accepts_portuguese_fields() {
    let account_id = AccountId::random();
    let mut ports = MockPorts::default();
    ports
        .payments
        .expect_create_pix()
        .withf(move |request: &PurchaseRequest| {
            request.account_id == account_id && request.plan == Plan::Premium && request.months == 3
        })
        .times(1)
        .returning(|_| Ok(pix_checkout()));
    let app = actix_test::init_service(test_app(ports.into_state(WebhookVerifier::default()))).await;
    let cookie = session_cookie(&app, &account_id).await;

    let request = actix_test::TestRequest::post()
        .uri("/api/pagamentos/pix")
        .cookie(cookie)
        .set_json(json!({ "plano": "premium", "meses": "3" }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let value = json_body(response).await;
    assert_eq!(
        value.get("initPoint").and_then(Value::as_str),
        Some("https://mp.example/checkout/pref-1")
    );
    assert_eq!(value.get("amount").and_then(Value::as_i64), Some(8_970));
}

#[rstest]
#[case::missing(json!({ "months": 1 }), "missing_field")]
#[case::unknown(json!({ "plan": "GOLD" }), "unknown_plan")]
#[actix_web::test]
async fn pix_rejects_bad_plans(#[case] body: Value, #[case] code: &str) {
    let account_id = AccountId::random();
    let app = actix_test::init_service(test_app(MockPorts::default().into_state(WebhookVerifier::default()))).await;
    let cookie = session_cookie(&app, &account_id).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/pagamentos/pix")
        .cookie(cookie)
        .set_json(body)
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let value = json_body(response).await;
    assert_eq!(value.pointer("/details/code").and_then(Value::as_str), Some(code));
    assert_eq!(value.pointer("/details/field").and_then(Value::as_str), Some("plan"));
}

#[actix_web::test]
async fn malformed_json_uses_error_envelope() {
    let account_id = AccountId::random();
    let app = actix_test::init_service(test_app(MockPorts::default().into_state(WebhookVerifier::default()))).await;
    let cookie = session_cookie(&app, &account_id).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/pagamentos/boleto")
        .cookie(cookie)
        .insert_header(("content-type", "application/json"))
        .set_payload("{\"plan\":")
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let value = json_body(response).await;
    assert_eq!(value.get("code").and_then(Value::as_str), Some("invalid_request"));
    assert_eq!(
        value.pointer("/details/code").and_then(Value::as_str),
        Some("malformed_body")
    );
}

#[actix_web::test]
async fn card_maps_checkout_form() {
    let account_id = AccountId::random();
    let mut ports = MockPorts::default();
    ports
        .payments
        .expect_create_card()
        .withf(move |request: &CardPurchaseRequest| {
            request.account_id == account_id
                && request.plan == Plan::Standard
                && request.months == 1
                && request.installments == 3
                && request.card.number == "4509 9535 6623 3704"
                && request.card.holder_name == "APRO"
                && request.card.expiry_month == 11
                && request.card.expiry_year == 2030
        })
        .times(1)
        .returning(|_| {
            Ok(CardPaymentOutcome {
                payment_id: "42".to_owned(),
                status: PaymentStatus::Approved,
                status_detail: Some("accredited".to_owned()),
                amount: Money::from_centavos(2_290),
                activated: true,
                due_date: Some(fixture_timestamp()),
            })
        });
    let app = actix_test::init_service(test_app(ports.into_state(WebhookVerifier::default()))).await;
    let cookie = session_cookie(&app, &account_id).await;

    let request = actix_test::TestRequest::post()
        .uri("/api/pagamentos/cartao")
        .cookie(cookie)
        .set_json(json!({
            "plano": "PADRAO",
            "parcelas": 3,
            "cartao": {
                "numero": "4509 9535 6623 3704",
                "nomePortador": "APRO",
                "cvv": "123",
                "mesVencimento": "11",
                "anoVencimento": 2030
            }
        }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let value = json_body(response).await;
    assert_eq!(value.get("status").and_then(Value::as_str), Some("APPROVED"));
    assert_eq!(value.get("activated").and_then(Value::as_bool), Some(true));
}

#[actix_web::test]
async fn card_requires_card_details() {
    let account_id = AccountId::random();
    let app = actix_test::init_service(test_app(MockPorts::default().into_state(WebhookVerifier::default()))).await;
    let cookie = session_cookie(&app, &account_id).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/pagamentos/cartao")
        .cookie(cookie)
        .set_json(json!({ "plan": "BASIC" }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let value = json_body(response).await;
    assert_eq!(value.pointer("/details/field").and_then(Value::as_str), Some("card"));
}

#[actix_web::test]
async fn boleto_defaults_to_a_year() {
    let account_id = AccountId::random();
    let mut ports = MockPorts::default();
    ports
        .payments
        .expect_create_boleto()
        .withf(|request: &PurchaseRequest| request.months == 12 && request.plan == Plan::Family)
        .times(1)
        .returning(|_| {
            Ok(BoletoSlip {
                payment_id: "77".to_owned(),
                amount: Money::from_centavos(40_698),
                ticket_url: Some("https://mp.example/boleto/77".to_owned()),
                barcode: Some("2379".to_owned()),
                expires_at: fixture_timestamp(),
            })
        });
    let app = actix_test::init_service(test_app(ports.into_state(WebhookVerifier::default()))).await;
    let cookie = session_cookie(&app, &account_id).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/pagamentos/boleto")
        .cookie(cookie)
        .set_json(json!({ "plano": "FAMILIA" }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let value = json_body(response).await;
    assert_eq!(
        value.get("ticketUrl").and_then(Value::as_str),
        Some("https://mp.example/boleto/77")
    );
}

#[actix_web::test]
async fn webhook_with_valid_signature_is_reconciled() {
    let verifier = WebhookVerifier::new(Some(WEBHOOK_SECRET.to_owned()));
    let signature = verifier.sign(Some("req-1"), Some("123"), "1704908010");
    let mut ports = MockPorts::default();
    ports
        .payments
        .expect_handle_notification()
        .withf(|notification: &PaymentNotification| {
            notification.topic == "payment" && notification.payment_id.as_deref() == Some("123")
        })
        .times(1)
        .returning(|_| {
            Ok(NotificationOutcome::Reconciled {
                status: PaymentStatus::Approved,
                activated: true,
            })
        });
    let app = actix_test::init_service(test_app(ports.into_state(verifier))).await;

    let request = actix_test::TestRequest::post()
        .uri("/api/pagamentos/webhook")
        .insert_header((SIGNATURE_HEADER, signature))
        .insert_header((REQUEST_ID_HEADER, "req-1"))
        .set_json(json!({ "type": "payment", "action": "payment.updated", "data": { "id": 123 } }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = actix_test::read_body(response).await;
    assert_eq!(body.as_ref(), b"OK");
}

#[rstest]
#[case::missing_header(None)]
#[case::forged(Some("ts=1704908010,v1=00ff"))]
#[actix_web::test]
async fn webhook_rejects_bad_signatures(#[case] header: Option<&str>) {
    let mut ports = MockPorts::default();
    ports.payments.expect_handle_notification().times(0);
    let verifier = WebhookVerifier::new(Some(WEBHOOK_SECRET.to_owned()));
    let app = actix_test::init_service(test_app(ports.into_state(verifier))).await;

    let mut request = actix_test::TestRequest::post()
        .uri("/api/pagamentos/webhook")
        .insert_header((REQUEST_ID_HEADER, "req-1"))
        .set_json(json!({ "type": "payment", "data": { "id": "123" } }));
    if let Some(header) = header {
        request = request.insert_header((SIGNATURE_HEADER, header));
    }
    let response = actix_test::call_service(&app, request.to_request()).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let value = json_body(response).await;
    assert_eq!(
        value.pointer("/details/code").and_then(Value::as_str),
        Some("invalid_signature")
    );
}

#[actix_web::test]
async fn webhook_reads_ipn_query_parameters() {
    let mut ports = MockPorts::default();
    ports
        .payments
        .expect_handle_notification()
        .withf(|notification: &PaymentNotification| {
            notification.topic == "payment" && notification.payment_id.as_deref() == Some("555")
        })
        .times(1)
        .returning(|_| Ok(NotificationOutcome::UnknownAccount));
    let app = actix_test::init_service(test_app(ports.into_state(WebhookVerifier::default()))).await;

    let request = actix_test::TestRequest::post()
        .uri("/api/pagamentos/webhook?topic=payment&id=555")
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[rstest]
#[case::gateway_down(Error::service_unavailable("gateway timed out"))]
#[case::lost_update(Error::conflict("account changed concurrently"))]
#[case::unknown_payment(Error::not_found("payment 9 not found"))]
#[case::gateway_rejection(Error::invalid_request("gateway rejected the request"))]
#[case::storage(Error::internal("connection reset"))]
#[actix_web::test]
async fn webhook_failures_ask_for_a_retry(#[case] failure: Error) {
    let mut ports = MockPorts::default();
    ports
        .payments
        .expect_handle_notification()
        .times(1)
        .returning(move |_| Err(failure.clone()));
    let app = actix_test::init_service(test_app(ports.into_state(WebhookVerifier::default()))).await;

    let request = actix_test::TestRequest::post()
        .uri("/api/pagamentos/webhook")
        .set_json(json!({ "type": "payment", "data": { "id": "9" } }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[rstest]
#[case::body_traversal(json!({ "type": "payment", "data": { "id": "../../users/me" } }), "")]
#[case::body_query(json!({ "type": "payment", "data": { "id": "42?x=1" } }), "")]
#[case::query_traversal(json!({}), "?type=payment&data.id=..%2F..%2Fusers%2Fme")]
#[case::ipn_traversal(json!({}), "?topic=payment&id=..%2Fv1%2Fcustomers")]
#[actix_web::test]
async fn webhook_rejects_malformed_payment_ids(#[case] body: Value, #[case] query: &str) {
    let mut ports = MockPorts::default();
    ports.payments.expect_handle_notification().times(0);
    let app = actix_test::init_service(test_app(ports.into_state(WebhookVerifier::default()))).await;

    let request = actix_test::TestRequest::post()
        .uri(&format!("/api/pagamentos/webhook{query}"))
        .set_json(body)
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let value = json_body(response).await;
    assert_eq!(
        value.pointer("/details/field").and_then(Value::as_str),
        Some("paymentId")
    );
}

#[rstest]
#[case::dotted("abc.def")]
#[case::too_long("1234567890123456789012345678901234567890123456789012345678901234567890")]
#[actix_web::test]
async fn status_rejects_malformed_payment_ids(#[case] payment_id: &str) {
    let account_id = AccountId::random();
    let app = actix_test::init_service(test_app(MockPorts::default().into_state(WebhookVerifier::default()))).await;
    let cookie = session_cookie(&app, &account_id).await;
    let request = actix_test::TestRequest::get()
        .uri(&format!("/api/pagamentos/status/{payment_id}"))
        .cookie(cookie)
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let value = json_body(response).await;
    assert_eq!(
        value.pointer("/details/field").and_then(Value::as_str),
        Some("paymentId")
    );
}

#[actix_web::test]
async fn status_returns_gateway_view() {
    let account_id = AccountId::random();
    let mut ports = MockPorts::default();
    ports
        .payments_query
        .expect_payment_status()
        .withf(move |owner: &AccountId, payment_id: &str| *owner == account_id && payment_id == "987")
        .times(1)
        .returning(|_, payment_id| {
            Ok(PaymentStatusView {
                id: payment_id.to_owned(),
                status: "approved".to_owned(),
                status_detail: Some("accredited".to_owned()),
                amount: Money::from_centavos(2_990),
                payment_method_id: Some("pix".to_owned()),
                date: Some(fixture_timestamp()),
                approved: true,
            })
        });
    let app = actix_test::init_service(test_app(ports.into_state(WebhookVerifier::default()))).await;
    let cookie = session_cookie(&app, &account_id).await;
    let request = actix_test::TestRequest::get()
        .uri("/api/pagamentos/status/987")
        .cookie(cookie)
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let value = json_body(response).await;
    assert_eq!(value.get("paymentMethodId").and_then(Value::as_str), Some("pix"));
}

#[actix_web::test]
async fn plans_are_public() {
    let mut ports = MockPorts::default();
    ports
        .payments_query
        .expect_plans()
        .returning(|| Plan::ALL.iter().map(|plan| plan.details()).collect());
    let app = actix_test::init_service(test_app(ports.into_state(WebhookVerifier::default()))).await;
    let request = actix_test::TestRequest::get()
        .uri("/api/pagamentos/planos")
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let value = json_body(response).await;
    assert_eq!(value.as_array().map(Vec::len), Some(Plan::ALL.len()));
}

#[actix_web::test]
async fn quote_passes_coupon_through() {
    let mut ports = MockPorts::default();
    ports
        .payments_query
        .expect_quote()
        .withf(|plan: &Plan, months: &u32, coupon: &Option<String>| {
            *plan == Plan::Basic && *months == 12 && coupon.as_deref() == Some("streamflix20")
        })
        .times(1)
        .returning(|plan, months, coupon| pricing::quote(plan, months, coupon.as_deref()));
    let app = actix_test::init_service(test_app(ports.into_state(WebhookVerifier::default()))).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/pagamentos/calcular-preco")
        .set_json(json!({ "plano": "BASICO", "meses": 12, "cupom": "streamflix20" }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let value = json_body(response).await;
    assert_eq!(value.get("annualDiscountApplied").and_then(Value::as_bool), Some(true));
}

#[rstest]
#[case::no_body(None, None)]
#[case::blank_reason(Some(json!({ "motivo": "  " })), None)]
#[case::portuguese_reason(Some(json!({ "motivo": "caro demais" })), Some("caro demais"))]
#[actix_web::test]
async fn cancel_reads_optional_reason(
    #[case] body: Option<Value>,
    #[case] expected: Option<&'static str>,
) {
    let account_id = AccountId::random();
    let mut ports = MockPorts::default();
    ports
        .payments
        .expect_cancel()
        .withf(move |owner: &AccountId, reason: &Option<String>| {
            *owner == account_id && reason.as_deref() == expected
        })
        .times(1)
        .returning(|_, reason| {
            Ok(CancellationReceipt {
                access_until: Some(fixture_timestamp()),
                reason,
            })
        });
    let app = actix_test::init_service(test_app(ports.into_state(WebhookVerifier::default()))).await;
    let cookie = session_cookie(&app, &account_id).await;
    let mut request = actix_test::TestRequest::post()
        .uri("/api/pagamentos/cancelar")
        .cookie(cookie);
    if let Some(body) = body {
        request = request.set_json(body);
    }
    let response = actix_test::call_service(&app, request.to_request()).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[actix_web::test]
async fn reactivate_surfaces_domain_errors() {
    let account_id = AccountId::random();
    let mut ports = MockPorts::default();
    ports.payments.expect_reactivate().returning(|_| {
        Err(Error::invalid_request("subscription period has expired")
            .with_details(json!({ "code": "period_expired" })))
    });
    let app = actix_test::init_service(test_app(ports.into_state(WebhookVerifier::default()))).await;
    let cookie = session_cookie(&app, &account_id).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/pagamentos/reativar")
        .cookie(cookie)
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let value = json_body(response).await;
    assert_eq!(
        value.pointer("/details/code").and_then(Value::as_str),
        Some("period_expired")
    );
}

#[actix_web::test]
async fn history_returns_current_subscription() {
    let account_id = AccountId::random();
    let mut ports = MockPorts::default();
    ports.payments_query.expect_history().returning(|_| {
        Ok(PaymentHistory {
            current: SubscriptionSummary::from(&Subscription::trial(fixture_timestamp())),
            entries: Vec::new(),
        })
    });
    let app = actix_test::init_service(test_app(ports.into_state(WebhookVerifier::default()))).await;
    let cookie = session_cookie(&app, &account_id).await;
    let request = actix_test::TestRequest::get()
        .uri("/api/pagamentos/historico")
        .cookie(cookie)
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let value = json_body(response).await;
    assert_eq!(value.pointer("/current/plan").and_then(Value::as_str), Some("FREE"));
    assert_eq!(value.get("entries").and_then(Value::as_array).map(Vec::len), Some(0));
}
