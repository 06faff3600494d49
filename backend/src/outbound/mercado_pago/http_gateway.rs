//! Reqwest-backed Mercado Pago adapter.
//!
//! This adapter owns transport details only: bearer authentication,
//! idempotency keys, timeout and HTTP error mapping, and JSON decoding into
//! gateway port types.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockable::Clock;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use super::dto::{
    CardTokenRequestDto, CardTokenResponseDto, ErrorResponseDto, PaymentRequestDto,
    PaymentResponseDto, PreapprovalUpdateDto, PreferenceRequestDto, PreferenceResponseDto,
};
use crate::domain::ports::{
    CardToken, CardTokenRequest, GatewayPayment, PaymentGateway, PaymentGatewayError,
    PaymentRequest, Preference, PreferenceRequest,
};

/// Production API root.
pub const DEFAULT_MERCADO_PAGO_BASE_URL: &str = "https://api.mercadopago.com";
const IDEMPOTENCY_HEADER: &str = "X-Idempotency-Key";

/// Mercado Pago adapter that talks to one API root with one access token.
pub struct MercadoPagoHttpGateway {
    client: Client,
    base_url: Url,
    access_token: String,
    clock: Arc<dyn Clock>,
}

impl MercadoPagoHttpGateway {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    /// ```rust,ignore
    /// let gateway = MercadoPagoHttpGateway::new(base_url, token, timeout, clock)?;
    /// ```
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        base_url: Url,
        access_token: impl Into<String>,
        timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            access_token: access_token.into(),
            clock,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, PaymentGatewayError> {
        self.base_url
            .join(path)
            .map_err(|err| PaymentGatewayError::transport(format!("invalid endpoint {path}: {err}")))
    }

    /// URL of one resource, with `id` pushed as a single encoded segment.
    fn resource_url(&self, collection: &[&str], id: &str) -> Result<Url, PaymentGatewayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                PaymentGatewayError::transport(format!(
                    "base URL {} cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(collection)
            .push(id);
        Ok(url)
    }

    fn authorised(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.access_token)
            .header(reqwest::header::ACCEPT, "application/json")
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, PaymentGatewayError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        let request = self
            .authorised(self.client.post(url))
            .header(IDEMPOTENCY_HEADER, Uuid::new_v4().to_string())
            .json(body);
        send(request, path).await
    }
}

async fn send<T: DeserializeOwned>(
    request: RequestBuilder,
    path: &str,
) -> Result<T, PaymentGatewayError> {
    let response = request.send().await.map_err(map_transport_error)?;
    let status = response.status();
    let body = response.bytes().await.map_err(map_transport_error)?;
    debug!(path, status = status.as_u16(), "mercado pago responded");
    if !status.is_success() {
        return Err(map_status_error(status, body.as_ref(), path));
    }
    decode(body.as_ref())
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, PaymentGatewayError> {
    serde_json::from_slice(body).map_err(|error| {
        PaymentGatewayError::decode(format!("invalid Mercado Pago JSON payload: {error}"))
    })
}

fn into_payment(dto: PaymentResponseDto) -> Result<GatewayPayment, PaymentGatewayError> {
    dto.into_payment().map_err(PaymentGatewayError::decode)
}

#[async_trait]
impl PaymentGateway for MercadoPagoHttpGateway {
    async fn create_preference(
        &self,
        request: &PreferenceRequest,
    ) -> Result<Preference, PaymentGatewayError> {
        let body = PreferenceRequestDto::new(request, self.clock.utc());
        let dto: PreferenceResponseDto = self.post_json("checkout/preferences", &body).await?;
        Ok(dto.into())
    }

    async fn create_card_token(
        &self,
        request: &CardTokenRequest,
    ) -> Result<CardToken, PaymentGatewayError> {
        let body = CardTokenRequestDto::from(request);
        let dto: CardTokenResponseDto = self.post_json("v1/card_tokens", &body).await?;
        Ok(dto.into())
    }

    async fn create_payment(
        &self,
        request: &PaymentRequest,
    ) -> Result<GatewayPayment, PaymentGatewayError> {
        let body = PaymentRequestDto::from(request);
        let dto: PaymentResponseDto = self.post_json("v1/payments", &body).await?;
        into_payment(dto)
    }

    async fn get_payment(&self, payment_id: &str) -> Result<GatewayPayment, PaymentGatewayError> {
        let url = self.resource_url(&["v1", "payments"], payment_id)?;
        let path = url.path().to_owned();
        let dto: PaymentResponseDto = send(self.authorised(self.client.get(url)), &path)
            .await
            .map_err(|err| match err {
                PaymentGatewayError::NotFound { .. } => PaymentGatewayError::not_found(payment_id),
                other => other,
            })?;
        into_payment(dto)
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), PaymentGatewayError> {
        let url = self.resource_url(&["preapproval"], subscription_id)?;
        let path = url.path().to_owned();
        let request = self
            .authorised(self.client.put(url))
            .json(&PreapprovalUpdateDto {
                status: "cancelled",
            });
        let _: serde_json::Value = send(request, &path).await?;
        Ok(())
    }
}

fn map_transport_error(error: reqwest::Error) -> PaymentGatewayError {
    if error.is_timeout() {
        PaymentGatewayError::timeout(error.to_string())
    } else {
        PaymentGatewayError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8], path: &str) -> PaymentGatewayError {
    let detail = serde_json::from_slice::<ErrorResponseDto>(body)
        .ok()
        .and_then(|dto| dto.message.or(dto.error))
        .unwrap_or_else(|| body_preview(body));
    let message = if detail.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), detail)
    };

    match status {
        StatusCode::NOT_FOUND => PaymentGatewayError::not_found(path),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            PaymentGatewayError::timeout(message)
        }
        _ if status.is_server_error() => PaymentGatewayError::transport(message),
        _ => PaymentGatewayError::rejected(status.as_u16(), message),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    //! Coverage for the non-network mapping helpers.

    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::not_found(StatusCode::NOT_FOUND, "NotFound")]
    #[case::request_timeout(StatusCode::REQUEST_TIMEOUT, "Timeout")]
    #[case::gateway_timeout(StatusCode::GATEWAY_TIMEOUT, "Timeout")]
    #[case::bad_request(StatusCode::BAD_REQUEST, "Rejected")]
    #[case::unauthorised(StatusCode::UNAUTHORIZED, "Rejected")]
    #[case::server_error(StatusCode::INTERNAL_SERVER_ERROR, "Transport")]
    fn maps_http_statuses_to_gateway_errors(#[case] status: StatusCode, #[case] expected: &str) {
        let error = map_status_error(status, br#"{"message":"invalid token"}"#, "v1/payments");
        let matched = match expected {
            "NotFound" => matches!(error, PaymentGatewayError::NotFound { .. }),
            "Timeout" => matches!(error, PaymentGatewayError::Timeout { .. }),
            "Rejected" => matches!(error, PaymentGatewayError::Rejected { .. }),
            "Transport" => matches!(error, PaymentGatewayError::Transport { .. }),
            _ => panic!("unsupported test expectation: {expected}"),
        };
        assert!(matched, "{status} should map to {expected}, got {error:?}");
    }

    #[test]
    fn rejection_keeps_provider_message() {
        let error = map_status_error(
            StatusCode::BAD_REQUEST,
            br#"{"message":"invalid card_number","error":"bad_request"}"#,
            "v1/card_tokens",
        );
        assert_eq!(
            error,
            PaymentGatewayError::rejected(400_u16, "status 400: invalid card_number")
        );
    }

    #[test]
    fn non_json_bodies_are_previewed() {
        let long = "x ".repeat(200);
        let error = map_status_error(StatusCode::FORBIDDEN, long.as_bytes(), "v1/payments");
        let PaymentGatewayError::Rejected { message, .. } = error else {
            panic!("expected Rejected, got {error:?}");
        };
        assert!(message.ends_with("..."));
        assert!(message.chars().count() < 200);
    }

    #[test]
    fn decode_failures_map_to_decode() {
        let error = decode::<PaymentResponseDto>(b"<html>").expect_err("not json");
        assert!(matches!(error, PaymentGatewayError::Decode { .. }));
    }

    #[test]
    fn joins_paths_under_the_api_root() {
        let gateway = MercadoPagoHttpGateway::new(
            Url::parse("https://api.mercadopago.com/").expect("valid url"),
            "TEST-token",
            Duration::from_secs(5),
            Arc::new(mockable::DefaultClock),
        )
        .expect("client builds");
        let url = gateway.endpoint("v1/payments").expect("joins");
        assert_eq!(url.as_str(), "https://api.mercadopago.com/v1/payments");
    }

    fn gateway_at(base: &str) -> MercadoPagoHttpGateway {
        MercadoPagoHttpGateway::new(
            Url::parse(base).expect("valid url"),
            "TEST-token",
            Duration::from_secs(5),
            Arc::new(mockable::DefaultClock),
        )
        .expect("client builds")
    }

    #[rstest]
    #[case::plain("42", "https://api.mercadopago.com/v1/payments/42")]
    #[case::traversal(
        "../../users/me",
        "https://api.mercadopago.com/v1/payments/..%2F..%2Fusers%2Fme"
    )]
    #[case::query("42?access_token=x", "https://api.mercadopago.com/v1/payments/42%3Faccess_token=x")]
    #[case::bare_dots("..", "https://api.mercadopago.com/v1/payments")]
    fn payment_ids_stay_inside_the_payments_path(#[case] id: &str, #[case] expected: &str) {
        let url = gateway_at("https://api.mercadopago.com")
            .resource_url(&["v1", "payments"], id)
            .expect("builds");
        assert_eq!(url.as_str(), expected);
        assert!(url.query().is_none());
    }

    #[test]
    fn preapproval_urls_respect_a_prefixed_base() {
        let url = gateway_at("http://localhost:9000/mp/")
            .resource_url(&["preapproval"], "pre/1")
            .expect("builds");
        assert_eq!(url.as_str(), "http://localhost:9000/mp/preapproval/pre%2F1");
    }
}
