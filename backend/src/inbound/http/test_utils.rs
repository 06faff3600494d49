//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceResponse};
use actix_web::{HttpResponse, post, test, web};

use crate::domain::ports::{
    MockAccountsCommand, MockAccountsQuery, MockPaymentsCommand, MockPaymentsQuery,
};
use crate::domain::{AccountId, Error};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::{HttpState, HttpStatePorts};
use crate::inbound::http::webhook_signature::WebhookVerifier;

/// Build a session middleware configured for tests.
///
/// - Generates a fresh signing/encryption key per invocation.
/// - Sets the cookie name to `session` and disables the `Secure` flag for
///   local HTTP tests.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

/// Logs the caller in as the account named in the path.
#[post("/__test/login/{account_id}")]
pub async fn test_login(session: SessionContext, path: web::Path<String>) -> ApiResult<HttpResponse> {
    let account_id: AccountId = path
        .into_inner()
        .parse()
        .map_err(|_| Error::invalid_request("account id must be a UUID"))?;
    session.persist_account(&account_id)?;
    Ok(HttpResponse::NoContent().finish())
}

/// Session cookie for `account_id`, obtained through [`test_login`].
pub async fn session_cookie(
    app: &impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
    account_id: &AccountId,
) -> Cookie<'static> {
    let request = test::TestRequest::post()
        .uri(&format!("/__test/login/{account_id}"))
        .to_request();
    let response = test::call_service(app, request).await;
    assert!(response.status().is_success(), "test login failed");
    response
        .response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .map(Cookie::into_owned)
        .expect("session cookie")
}

/// Driving-port mocks that handler tests configure before building state.
#[derive(Default)]
pub struct MockPorts {
    pub payments: MockPaymentsCommand,
    pub payments_query: MockPaymentsQuery,
    pub accounts: MockAccountsCommand,
    pub accounts_query: MockAccountsQuery,
}

impl MockPorts {
    pub fn into_state(self, webhook: WebhookVerifier) -> HttpState {
        HttpState::new(
            HttpStatePorts {
                payments: Arc::new(self.payments),
                payments_query: Arc::new(self.payments_query),
                accounts: Arc::new(self.accounts),
                accounts_query: Arc::new(self.accounts_query),
            },
            webhook,
        )
    }
}
