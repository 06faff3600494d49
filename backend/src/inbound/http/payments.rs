//! Subscription payment handlers.
//!
//! ```text
//! POST /api/pagamentos/pix {"plan":"PREMIUM","months":1}
//! POST /api/pagamentos/cartao {"plan":"PREMIUM","card":{...},"installments":3}
//! POST /api/pagamentos/boleto {"plan":"PREMIUM","months":12}
//! POST /api/pagamentos/webhook {"type":"payment","data":{"id":"123"}}
//! GET  /api/pagamentos/status/{paymentId}
//! GET  /api/pagamentos/planos
//! POST /api/pagamentos/calcular-preco {"plan":"BASIC","months":12,"coupon":"STREAMFLIX20"}
//! POST /api/pagamentos/cancelar {"reason":"too expensive"}
//! POST /api/pagamentos/reativar
//! GET  /api/pagamentos/historico
//! ```
//!
//! Request bodies accept the Portuguese field names used by existing web
//! clients (`plano`, `meses`, `cartao`, `parcelas`, `cupom`, `motivo`).

use actix_web::http::header::{ContentType, HeaderMap};
use actix_web::{HttpRequest, HttpResponse, Scope, get, post, web};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::domain::br::CardInput;
use crate::domain::ports::{
    BoletoSlip, CancellationReceipt, CardPaymentOutcome, CardPurchaseRequest, NotificationOutcome,
    PaymentHistory, PaymentNotification, PaymentStatusView, PixCheckout, PurchaseRequest,
    SubscriptionSummary,
};
use crate::domain::pricing::ANNUAL_MONTHS;
use crate::domain::{Error, PlanDetails, Quote};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, invalid_value_error, missing_field_error, parse_plan};
use crate::inbound::http::webhook_signature::{REQUEST_ID_HEADER, SIGNATURE_HEADER};

const PLAN_FIELD: FieldName = FieldName::new("plan");
const CARD_FIELD: FieldName = FieldName::new("card");
const PAYMENT_ID_FIELD: FieldName = FieldName::new("paymentId");
const MAX_PAYMENT_ID_LEN: usize = 64;

/// Accept `12` as well as `"12"`, as browser forms tend to send strings.
fn lenient_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr + TryFrom<u64>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    let invalid = || serde::de::Error::custom("expected a positive whole number");
    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(value)) => T::try_from(value).map(Some).map_err(|_| invalid()),
        Some(Raw::Text(text)) => text.trim().parse().map(Some).map_err(|_| invalid()),
    }
}

/// Body for PIX and boleto purchases.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseBody {
    /// Plan identifier, e.g. `PREMIUM` or `FAMILIA`.
    #[serde(default, alias = "plano")]
    pub plan: Option<String>,
    #[serde(default, alias = "meses", deserialize_with = "lenient_number")]
    #[schema(value_type = Option<u32>)]
    pub months: Option<u32>,
}

/// Card details as typed in the checkout form.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CardBody {
    #[serde(alias = "numero")]
    pub number: String,
    #[serde(alias = "nomePortador")]
    pub holder_name: String,
    pub cvv: String,
    #[serde(default, alias = "mesVencimento", deserialize_with = "lenient_number")]
    #[schema(value_type = u32)]
    pub expiry_month: Option<u32>,
    /// Two- or four-digit year.
    #[serde(default, alias = "anoVencimento", deserialize_with = "lenient_number")]
    #[schema(value_type = u32)]
    pub expiry_year: Option<u32>,
}

impl From<CardBody> for CardInput {
    fn from(value: CardBody) -> Self {
        Self {
            number: value.number,
            holder_name: value.holder_name,
            cvv: value.cvv,
            expiry_month: value.expiry_month.unwrap_or_default(),
            expiry_year: value.expiry_year.unwrap_or_default(),
        }
    }
}

/// Body for card purchases.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CardPurchaseBody {
    #[serde(default, alias = "plano")]
    pub plan: Option<String>,
    #[serde(default, alias = "meses", deserialize_with = "lenient_number")]
    #[schema(value_type = Option<u32>)]
    pub months: Option<u32>,
    #[serde(default, alias = "cartao")]
    pub card: Option<CardBody>,
    /// Number of installments, 1 to 12.
    #[serde(default, alias = "parcelas", deserialize_with = "lenient_number")]
    #[schema(value_type = Option<u8>)]
    pub installments: Option<u8>,
}

/// Body for the price calculator.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuoteBody {
    #[serde(default, alias = "plano")]
    pub plan: Option<String>,
    #[serde(default, alias = "meses", deserialize_with = "lenient_number")]
    #[schema(value_type = Option<u32>)]
    pub months: Option<u32>,
    #[serde(default, alias = "cupom")]
    pub coupon: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelBody {
    #[serde(default, alias = "motivo")]
    pub reason: Option<String>,
}

/// Gateway notification body.
///
/// The webhook shape (`{"type":"payment","data":{"id":...}}`) is read from
/// the body; IPN deliveries (`?topic=payment&id=...`) fall back to the query.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct NotificationBody {
    #[serde(default, rename = "type", alias = "topic")]
    pub kind: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub data: Option<NotificationData>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct NotificationData {
    /// Payment id, sent as a number or a string.
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub id: Option<Value>,
}

/// Query parameters the gateway appends to the notification URL.
#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default, rename = "data.id")]
    pub data_id: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_owned()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

impl NotificationBody {
    /// Merge body and query into the domain notification.
    fn into_notification(self, query: NotificationQuery) -> PaymentNotification {
        let topic = self
            .kind
            .or(query.kind)
            .or(query.topic)
            .unwrap_or_default();
        let payment_id = self
            .data
            .and_then(|data| data.id)
            .as_ref()
            .and_then(id_text)
            .or(query.data_id)
            .or(query.id);
        PaymentNotification { topic, payment_id }
    }
}

fn header_text<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn parse_notification_body(body: &[u8]) -> Result<NotificationBody, Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(NotificationBody::default());
    }
    serde_json::from_slice(body).map_err(|err| {
        Error::invalid_request(format!("malformed notification body: {err}"))
            .with_details(serde_json::json!({ "code": "malformed_body" }))
    })
}

fn validate_payment_id(raw: &str) -> Result<&str, Error> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(missing_field_error(PAYMENT_ID_FIELD));
    }
    if trimmed.len() > MAX_PAYMENT_ID_LEN
        || !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(invalid_value_error(
            PAYMENT_ID_FIELD,
            trimmed,
            "must be an alphanumeric gateway payment id",
        ));
    }
    Ok(trimmed)
}

/// Start a PIX checkout for the logged-in account.
#[utoipa::path(
    post,
    path = "/api/pagamentos/pix",
    request_body = PurchaseBody,
    responses(
        (status = 200, description = "Hosted PIX checkout", body = PixCheckout),
        (status = 400, description = "Invalid plan or period", body = ErrorSchema),
        (status = 401, description = "Login required", body = ErrorSchema),
        (status = 503, description = "Payment gateway unavailable", body = ErrorSchema)
    ),
    tags = ["payments"],
    operation_id = "createPixPayment"
)]
#[post("/pix")]
pub async fn create_pix(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<PurchaseBody>,
) -> ApiResult<web::Json<PixCheckout>> {
    let account_id = session.require_account_id()?;
    let body = payload.into_inner();
    let request = PurchaseRequest {
        account_id,
        plan: parse_plan(body.plan.as_deref(), PLAN_FIELD)?,
        months: body.months.unwrap_or(1),
    };
    let checkout = state.payments.create_pix(request).await?;
    Ok(web::Json(checkout))
}

/// Charge a card for the logged-in account.
#[utoipa::path(
    post,
    path = "/api/pagamentos/cartao",
    request_body = CardPurchaseBody,
    responses(
        (status = 200, description = "Card payment outcome", body = CardPaymentOutcome),
        (status = 400, description = "Invalid card, plan or installments", body = ErrorSchema),
        (status = 401, description = "Login required", body = ErrorSchema),
        (status = 503, description = "Payment gateway unavailable", body = ErrorSchema)
    ),
    tags = ["payments"],
    operation_id = "createCardPayment"
)]
#[post("/cartao")]
pub async fn create_card(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CardPurchaseBody>,
) -> ApiResult<web::Json<CardPaymentOutcome>> {
    let account_id = session.require_account_id()?;
    let body = payload.into_inner();
    let plan = parse_plan(body.plan.as_deref(), PLAN_FIELD)?;
    let card = body.card.ok_or_else(|| missing_field_error(CARD_FIELD))?;
    let request = CardPurchaseRequest {
        account_id,
        plan,
        months: body.months.unwrap_or(1),
        card: card.into(),
        installments: body.installments.unwrap_or(1),
    };
    let outcome = state.payments.create_card(request).await?;
    Ok(web::Json(outcome))
}

/// Issue a boleto for an annual or longer period.
#[utoipa::path(
    post,
    path = "/api/pagamentos/boleto",
    request_body = PurchaseBody,
    responses(
        (status = 200, description = "Issued boleto", body = BoletoSlip),
        (status = 400, description = "Invalid plan, period or missing CPF/address", body = ErrorSchema),
        (status = 401, description = "Login required", body = ErrorSchema),
        (status = 503, description = "Payment gateway unavailable", body = ErrorSchema)
    ),
    tags = ["payments"],
    operation_id = "createBoleto"
)]
#[post("/boleto")]
pub async fn create_boleto(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<PurchaseBody>,
) -> ApiResult<web::Json<BoletoSlip>> {
    let account_id = session.require_account_id()?;
    let body = payload.into_inner();
    let request = PurchaseRequest {
        account_id,
        plan: parse_plan(body.plan.as_deref(), PLAN_FIELD)?,
        months: body.months.unwrap_or(ANNUAL_MONTHS),
    };
    let slip = state.payments.create_boleto(request).await?;
    Ok(web::Json(slip))
}

/// Receive a Mercado Pago notification.
///
/// Replies `200 OK` once the notification is handled or deliberately
/// ignored. Processing failures answer `503` so the gateway retries.
#[utoipa::path(
    post,
    path = "/api/pagamentos/webhook",
    request_body = NotificationBody,
    params(
        ("x-signature" = Option<String>, Header, description = "`ts=<unix>,v1=<hex HMAC>`"),
        ("x-request-id" = Option<String>, Header, description = "Gateway request id")
    ),
    responses(
        (status = 200, description = "Notification accepted", body = String),
        (status = 400, description = "Malformed notification", body = ErrorSchema),
        (status = 401, description = "Signature mismatch", body = ErrorSchema),
        (status = 503, description = "Temporary failure, retry later", body = ErrorSchema)
    ),
    tags = ["payments"],
    operation_id = "paymentWebhook",
    security([])
)]
#[post("/webhook")]
pub async fn webhook(
    state: web::Data<HttpState>,
    request: HttpRequest,
    query: web::Query<NotificationQuery>,
    body: web::Bytes,
) -> ApiResult<HttpResponse> {
    let mut notification = parse_notification_body(&body)?.into_notification(query.into_inner());
    if let Some(raw) = notification.payment_id.take() {
        notification.payment_id = Some(validate_payment_id(&raw)?.to_owned());
    }
    let headers = request.headers();
    state.webhook.verify(
        header_text(headers, SIGNATURE_HEADER),
        header_text(headers, REQUEST_ID_HEADER),
        notification.payment_id.as_deref(),
    )?;

    let topic = notification.topic.clone();
    let payment_id = notification.payment_id.clone();
    let outcome = state
        .payments
        .handle_notification(notification)
        .await
        .map_err(|err| {
            warn!(
                ?payment_id,
                code = ?err.code(),
                message = err.message(),
                "notification processing failed"
            );
            Error::service_unavailable("notification could not be processed; retry later")
        })?;
    match outcome {
        NotificationOutcome::Ignored => {
            debug!(%topic, ?payment_id, "notification ignored");
        }
        NotificationOutcome::UnknownAccount => {
            info!(?payment_id, "notification for unknown account");
        }
        NotificationOutcome::Reconciled { status, activated } => {
            info!(?payment_id, ?status, activated, "notification reconciled");
        }
    }
    Ok(HttpResponse::Ok()
        .content_type(ContentType::plaintext())
        .body("OK"))
}

/// Gateway status of one of the caller's payments.
#[utoipa::path(
    get,
    path = "/api/pagamentos/status/{paymentId}",
    params(("paymentId" = String, Path, description = "Gateway payment id")),
    responses(
        (status = 200, description = "Payment status", body = PaymentStatusView),
        (status = 400, description = "Malformed payment id", body = ErrorSchema),
        (status = 401, description = "Login required", body = ErrorSchema),
        (status = 404, description = "Unknown payment", body = ErrorSchema),
        (status = 503, description = "Payment gateway unavailable", body = ErrorSchema)
    ),
    tags = ["payments"],
    operation_id = "paymentStatus"
)]
#[get("/status/{payment_id}")]
pub async fn payment_status(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<PaymentStatusView>> {
    let account_id = session.require_account_id()?;
    let raw = path.into_inner();
    let payment_id = validate_payment_id(&raw)?;
    let view = state
        .payments_query
        .payment_status(&account_id, payment_id)
        .await?;
    Ok(web::Json(view))
}

/// Catalogue of plans with prices and entitlements.
#[utoipa::path(
    get,
    path = "/api/pagamentos/planos",
    responses((status = 200, description = "Available plans", body = [PlanDetails])),
    tags = ["payments"],
    operation_id = "listPlans",
    security([])
)]
#[get("/planos")]
pub async fn list_plans(state: web::Data<HttpState>) -> web::Json<Vec<PlanDetails>> {
    web::Json(state.payments_query.plans())
}

/// Price a purchase, applying the annual discount and an optional coupon.
#[utoipa::path(
    post,
    path = "/api/pagamentos/calcular-preco",
    request_body = QuoteBody,
    responses(
        (status = 200, description = "Price breakdown", body = Quote),
        (status = 400, description = "Invalid plan or period", body = ErrorSchema)
    ),
    tags = ["payments"],
    operation_id = "quotePrice",
    security([])
)]
#[post("/calcular-preco")]
pub async fn quote_price(
    state: web::Data<HttpState>,
    payload: web::Json<QuoteBody>,
) -> ApiResult<web::Json<Quote>> {
    let body = payload.into_inner();
    let plan = parse_plan(body.plan.as_deref(), PLAN_FIELD)?;
    let coupon = body.coupon.filter(|code| !code.trim().is_empty());
    let quote = state
        .payments_query
        .quote(plan, body.months.unwrap_or(1), coupon)?;
    Ok(web::Json(quote))
}

/// Cancel the subscription; access continues until the due date.
#[utoipa::path(
    post,
    path = "/api/pagamentos/cancelar",
    request_body(content = CancelBody, description = "Optional cancellation reason"),
    responses(
        (status = 200, description = "Subscription cancelled", body = CancellationReceipt),
        (status = 400, description = "No active subscription", body = ErrorSchema),
        (status = 401, description = "Login required", body = ErrorSchema),
        (status = 409, description = "Concurrent update", body = ErrorSchema)
    ),
    tags = ["payments"],
    operation_id = "cancelSubscription"
)]
#[post("/cancelar")]
pub async fn cancel_subscription(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: Option<web::Json<CancelBody>>,
) -> ApiResult<web::Json<CancellationReceipt>> {
    let account_id = session.require_account_id()?;
    let reason = payload
        .and_then(|body| body.into_inner().reason)
        .map(|reason| reason.trim().to_owned())
        .filter(|reason| !reason.is_empty());
    let receipt = state.payments.cancel(&account_id, reason).await?;
    Ok(web::Json(receipt))
}

/// Reactivate a cancelled subscription still inside its paid period.
#[utoipa::path(
    post,
    path = "/api/pagamentos/reativar",
    responses(
        (status = 200, description = "Subscription reactivated", body = SubscriptionSummary),
        (status = 400, description = "Not cancelled or period expired", body = ErrorSchema),
        (status = 401, description = "Login required", body = ErrorSchema)
    ),
    tags = ["payments"],
    operation_id = "reactivateSubscription"
)]
#[post("/reativar")]
pub async fn reactivate_subscription(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<SubscriptionSummary>> {
    let account_id = session.require_account_id()?;
    let summary = state.payments.reactivate(&account_id).await?;
    Ok(web::Json(summary))
}

/// Current subscription and payment history, newest first.
#[utoipa::path(
    get,
    path = "/api/pagamentos/historico",
    responses(
        (status = 200, description = "Payment history", body = PaymentHistory),
        (status = 401, description = "Login required", body = ErrorSchema)
    ),
    tags = ["payments"],
    operation_id = "paymentHistory"
)]
#[get("/historico")]
pub async fn payment_history(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<PaymentHistory>> {
    let account_id = session.require_account_id()?;
    let history = state.payments_query.history(&account_id).await?;
    Ok(web::Json(history))
}

/// Register every payment route on `scope`.
pub fn configure(scope: Scope) -> Scope {
    scope
        .service(create_pix)
        .service(create_card)
        .service(create_boleto)
        .service(webhook)
        .service(payment_status)
        .service(list_plans)
        .service(quote_price)
        .service(cancel_subscription)
        .service(reactivate_subscription)
        .service(payment_history)
}

#[cfg(test)]
mod tests;
