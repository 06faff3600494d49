//! Shared harness for HTTP integration suites.
//!
//! Builds the application over the real domain services with the in-memory
//! account repository and the fixture payment gateway, so requests exercise
//! validation, pricing and the subscription lifecycle end to end.

use std::sync::Arc;

use actix_http::Request;
use actix_session::SessionMiddleware;
use actix_session::storage::CookieSessionStore;
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, test as actix_test, web};
use hmac::{Hmac, Mac};
use mockable::{Clock, DefaultClock};
use serde_json::{Value, json};
use sha2::Sha256;

use streamflix::Trace;
use streamflix::domain::{AccountsService, PaymentUrls, PaymentsService};
use streamflix::inbound::http::state::{HttpState, HttpStatePorts};
use streamflix::inbound::http::validation::json_error_handler;
use streamflix::inbound::http::webhook_signature::WebhookVerifier;
use streamflix::inbound::http::{accounts, payments};
use streamflix::outbound::memory::InMemoryAccountRepository;
use streamflix::outbound::mercado_pago::FixtureGateway;

/// Handles to the adapters behind the application under test.
pub struct Stack {
    pub gateway: Arc<FixtureGateway>,
    state: HttpState,
    key: Key,
}

impl Stack {
    /// Wire the services; `secret` enables webhook signature checks.
    pub fn new(secret: Option<&str>) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
        let repo = Arc::new(InMemoryAccountRepository::new());
        let gateway = Arc::new(FixtureGateway::new(clock.clone()));
        let payments = Arc::new(PaymentsService::new(
            repo.clone(),
            gateway.clone(),
            clock.clone(),
            PaymentUrls::new("http://localhost:3000", "http://localhost:8080"),
        ));
        let accounts = Arc::new(AccountsService::new(repo, clock));
        let state = HttpState::new(
            HttpStatePorts {
                payments: payments.clone(),
                payments_query: payments,
                accounts: accounts.clone(),
                accounts_query: accounts,
            },
            WebhookVerifier::new(secret.map(str::to_owned)),
        );
        Self {
            gateway,
            state,
            key: Key::generate(),
        }
    }

    pub fn app(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        > + use<>,
    > {
        let key = self.key.clone();
        let session = move || {
            SessionMiddleware::builder(CookieSessionStore::default(), key.clone())
                .cookie_name("session".into())
                .cookie_secure(false)
                .build()
        };
        App::new()
            .app_data(web::Data::new(self.state.clone()))
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .wrap(Trace)
            .service(payments::configure(web::scope("/api/pagamentos")).wrap(session()))
            .service(accounts::configure(web::scope("/api/contas")).wrap(session()))
    }
}

/// A valid registration form for Maria Silva.
pub fn registration_json() -> Value {
    json!({
        "firstName": "Maria",
        "lastName": "Silva",
        "email": "maria@example.com",
        "cpf": "529.982.247-25",
        "phone": "(11) 98765-4321",
        "birthDate": "1990-07-01",
        "password": "Senha@Forte1",
        "address": {
            "cep": "01310-100",
            "street": "Avenida Paulista",
            "number": "1000",
            "district": "Bela Vista",
            "city": "São Paulo",
            "state": "SP"
        },
        "acceptsDataCollection": true
    })
}

/// Card body whose holder name selects the fixture outcome.
pub fn card_json(holder: &str) -> Value {
    json!({
        "number": "4235 6477 2802 5682",
        "holderName": holder,
        "cvv": "123",
        "expiryMonth": 11,
        "expiryYear": 2035
    })
}

pub async fn json_body(response: ServiceResponse) -> Value {
    let body = actix_test::read_body(response).await;
    serde_json::from_slice(&body).expect("json body")
}

/// Register Maria and return the session cookie issued on success.
pub async fn register<S>(app: &S) -> Cookie<'static>
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let request = actix_test::TestRequest::post()
        .uri("/api/contas")
        .set_json(registration_json())
        .to_request();
    let response = actix_test::call_service(app, request).await;
    assert_eq!(response.status().as_u16(), 201, "registration should succeed");
    response
        .response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .expect("session cookie")
        .into_owned()
}

pub async fn get_json<S>(app: &S, uri: &str, cookie: &Cookie<'static>) -> (u16, Value)
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let request = actix_test::TestRequest::get()
        .uri(uri)
        .cookie(cookie.clone())
        .to_request();
    let response = actix_test::call_service(app, request).await;
    let status = response.status().as_u16();
    (status, json_body(response).await)
}

pub async fn post_json<S>(
    app: &S,
    uri: &str,
    cookie: &Cookie<'static>,
    body: Value,
) -> (u16, Value)
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let request = actix_test::TestRequest::post()
        .uri(uri)
        .cookie(cookie.clone())
        .set_json(body)
        .to_request();
    let response = actix_test::call_service(app, request).await;
    let status = response.status().as_u16();
    (status, json_body(response).await)
}

/// `x-signature` header value for a notification, as Mercado Pago computes it.
pub fn signature(secret: &str, data_id: &str, request_id: &str, ts: &str) -> String {
    let manifest = format!("id:{};request-id:{request_id};ts:{ts};", data_id.to_ascii_lowercase());
    let mut mac =
        <Hmac<Sha256> as Mac>::new_from_slice(secret.as_bytes()).expect("hmac accepts any key");
    mac.update(manifest.as_bytes());
    format!("ts={ts},v1={}", hex::encode(mac.finalize().into_bytes()))
}
