//! Tests for account handlers.

use super::*;
use crate::domain::account_service::summarize;
use crate::domain::test_fixtures::{fixture_timestamp, sample_account};
use crate::domain::{AccountId, Error};
use crate::inbound::http::test_utils::{MockPorts, session_cookie, test_login, test_session_middleware};
use crate::inbound::http::webhook_signature::WebhookVerifier;
use actix_web::http::StatusCode;
use actix_web::{App, test as actix_test, web};
use rstest::rstest;
use serde_json::{Value, json};

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
        .wrap(test_session_middleware())
        .service(test_login)
        .service(configure(web::scope("/api/contas")))
}

fn registration_json() -> Value {
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

async fn json_body(response: actix_web::dev::ServiceResponse) -> Value {
    let body = actix_test::read_body(response).await;
    serde_json::from_slice(&body).expect("json body")
}

#[actix_web::test]
async fn register_creates_account_and_session() {
    let account = sample_account();
    let summary = summarize(&account, fixture_timestamp());
    let mut ports = MockPorts::default();
    ports
        .accounts
        .expect_register()
        .withf(|input: &RegistrationInput| input.email == "maria@example.com" && input.accepts_data_collection)
        .times(1)
        .returning(move |_| Ok(summary.clone()));
    let app = actix_test::init_service(test_app(ports.into_state(WebhookVerifier::default()))).await;

    let request = actix_test::TestRequest::post()
        .uri("/api/contas")
        .set_json(registration_json())
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(
        response.response().cookies().any(|cookie| cookie.name() == "session"),
        "registration should log the account in"
    );
    let value = json_body(response).await;
    assert_eq!(value.get("cpf").and_then(Value::as_str), Some("529.982.247-25"));
    assert_eq!(value.get("fullName").and_then(Value::as_str), Some("Maria Silva"));
}

#[actix_web::test]
async fn register_reports_conflicts() {
    let mut ports = MockPorts::default();
    ports
        .accounts
        .expect_register()
        .returning(|_| Err(Error::conflict("e-mail already registered")));
    let app = actix_test::init_service(test_app(ports.into_state(WebhookVerifier::default()))).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/contas")
        .set_json(registration_json())
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn login_then_me_returns_the_account() {
    let account = sample_account();
    let account_id = account.id;
    let summary = summarize(&account, fixture_timestamp());
    let mut ports = MockPorts::default();
    ports
        .accounts
        .expect_authenticate()
        .withf(|request: &LoginRequest| {
            request.email == "maria@example.com" && request.password == "Senha@Forte1"
        })
        .times(1)
        .returning(move |_| Ok(account_id));
    ports
        .accounts_query
        .expect_profile()
        .withf(move |id: &AccountId| *id == account_id)
        .times(2)
        .returning(move |_| Ok(summary.clone()));
    let app = actix_test::init_service(test_app(ports.into_state(WebhookVerifier::default()))).await;

    let login_request = actix_test::TestRequest::post()
        .uri("/api/contas/login")
        .set_json(json!({ "email": " maria@example.com ", "senha": "Senha@Forte1" }))
        .to_request();
    let response = actix_test::call_service(&app, login_request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .expect("session cookie")
        .into_owned();

    let me = actix_test::TestRequest::get()
        .uri("/api/contas/me")
        .cookie(cookie)
        .to_request();
    let response = actix_test::call_service(&app, me).await;
    assert_eq!(response.status(), StatusCode::OK);
    let value = json_body(response).await;
    assert_eq!(value.get("email").and_then(Value::as_str), Some("maria@example.com"));
}

#[rstest]
#[case::blank_email(json!({ "email": "  ", "password": "x" }), "email")]
#[case::missing_password(json!({ "email": "maria@example.com" }), "password")]
#[actix_web::test]
async fn login_requires_both_fields(#[case] body: Value, #[case] field: &str) {
    let app = actix_test::init_service(test_app(MockPorts::default().into_state(WebhookVerifier::default()))).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/contas/login")
        .set_json(body)
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let value = json_body(response).await;
    assert_eq!(value.pointer("/details/field").and_then(Value::as_str), Some(field));
}

#[actix_web::test]
async fn wrong_credentials_are_unauthorised() {
    let mut ports = MockPorts::default();
    ports
        .accounts
        .expect_authenticate()
        .returning(|_| Err(Error::unauthorized("invalid e-mail or password")));
    let app = actix_test::init_service(test_app(ports.into_state(WebhookVerifier::default()))).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/contas/login")
        .set_json(json!({ "email": "maria@example.com", "password": "wrong" }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(
        response.response().cookies().all(|cookie| cookie.name() != "session"),
        "failed login must not set a session"
    );
}

#[actix_web::test]
async fn me_requires_login() {
    let app = actix_test::init_service(test_app(MockPorts::default().into_state(WebhookVerifier::default()))).await;
    let request = actix_test::TestRequest::get().uri("/api/contas/me").to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn add_profile_defaults_rating() {
    let account_id = AccountId::random();
    let profile = sample_account()
        .profiles
        .first()
        .cloned()
        .expect("main profile");
    let mut ports = MockPorts::default();
    ports
        .accounts
        .expect_add_profile()
        .withf(move |request: &AddProfileRequest| {
            request.account_id == account_id
                && request.name == "Crianças"
                && request.avatar.is_none()
                && request.age_rating == AgeRating::Free
        })
        .times(1)
        .returning(move |_| Ok(profile.clone()));
    let app = actix_test::init_service(test_app(ports.into_state(WebhookVerifier::default()))).await;
    let cookie = session_cookie(&app, &account_id).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/contas/me/perfis")
        .cookie(cookie)
        .set_json(json!({ "nome": " Crianças ", "avatar": "" }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[actix_web::test]
async fn register_device_records_peer_address() {
    let account_id = AccountId::random();
    let mut ports = MockPorts::default();
    ports
        .accounts
        .expect_register_device()
        .withf(move |request: &RegisterDeviceRequest| {
            request.account_id == account_id
                && request.device_id == "tv-1"
                && request.kind == DeviceKind::SmartTv
                && request.ip.as_deref() == Some("203.0.113.7")
        })
        .times(1)
        .returning(|request| {
            Ok(Device {
                device_id: request.device_id,
                name: request.name,
                kind: request.kind,
                last_access: fixture_timestamp(),
                ip: request.ip,
                location: None,
                active: true,
            })
        });
    let app = actix_test::init_service(test_app(ports.into_state(WebhookVerifier::default()))).await;
    let cookie = session_cookie(&app, &account_id).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/contas/me/dispositivos")
        .cookie(cookie)
        .insert_header(("x-forwarded-for", "203.0.113.7"))
        .set_json(json!({ "dispositivoId": "tv-1", "nome": "Sala", "tipo": "SMART_TV" }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let value = json_body(response).await;
    assert_eq!(value.get("kind").and_then(Value::as_str), Some("SMART_TV"));
}
