//! Server construction and middleware wiring.

mod config;
mod state_builders;

pub use config::{GatewayConfig, ServerConfig};

use state_builders::build_http_state;

use actix_session::{
    SessionMiddleware,
    config::{CookieContentSecurity, PersistentSession},
    storage::CookieSessionStore,
};
use actix_web::cookie::{Key, SameSite};
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};

use streamflix::Trace;
#[cfg(debug_assertions)]
use streamflix::doc::ApiDoc;
use streamflix::inbound::http::health::{HealthState, live, ready};
use streamflix::inbound::http::state::HttpState;
use streamflix::inbound::http::validation::json_error_handler;
use streamflix::inbound::http::{accounts, payments};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    key: Key,
    cookie_secure: bool,
    same_site: SameSite,
    session_ttl_hours: u32,
}

fn session_middleware(deps: &AppDependencies) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), deps.key.clone())
        .cookie_name("session".into())
        .cookie_path("/".into())
        .cookie_secure(deps.cookie_secure)
        .cookie_http_only(true)
        .cookie_content_security(CookieContentSecurity::Private)
        .cookie_same_site(deps.same_site)
        .session_lifecycle(PersistentSession::default().session_ttl(
            actix_web::cookie::time::Duration::hours(i64::from(deps.session_ttl_hours)),
        ))
        .build()
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let payments_api =
        payments::configure(web::scope("/api/pagamentos")).wrap(session_middleware(&deps));
    let accounts_api =
        accounts::configure(web::scope("/api/contas")).wrap(session_middleware(&deps));

    let app = App::new()
        .app_data(deps.health_state)
        .app_data(deps.http_state)
        .app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .wrap(Trace)
        .service(payments_api)
        .service(accounts_api)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

/// Construct an Actix HTTP server using the provided health state and configuration.
///
/// # Parameters
/// - `health_state`: shared readiness state updated once the server is initialised.
/// - `config`: pre-built [`ServerConfig`] with session, binding and adapter settings.
///
/// # Returns
/// A spawned [`Server`] that must be awaited to drive the listener.
///
/// # Errors
/// Propagates [`std::io::Error`] when building the adapters, binding the
/// socket or starting the server fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let http_state = build_http_state(&config)?;
    let deps = AppDependencies {
        health_state: health_state.clone(),
        http_state,
        key: config.key,
        cookie_secure: config.cookie_secure,
        same_site: config.same_site,
        session_ttl_hours: config.session_ttl_hours,
    };

    let server = HttpServer::new(move || build_app(deps.clone()))
        .bind(config.bind_addr)?
        .run();

    health_state.mark_ready();
    Ok(server)
}

#[cfg(test)]
mod tests {
    //! End-to-end checks of the assembled application.

    use std::net::SocketAddr;
    use std::time::Duration;

    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use url::Url;
    use serde_json::Value;
    use streamflix::domain::PaymentUrls;
    use streamflix::inbound::http::session_config::BuildMode;

    use super::*;

    fn deps() -> AppDependencies {
        let gateway = GatewayConfig::new(
            Url::parse("https://api.mercadopago.com/").expect("static url"),
            Duration::from_secs(1),
            PaymentUrls::new("http://localhost:3000", "http://localhost:8080"),
        )
        .with_build_mode(BuildMode::Debug);
        let config = ServerConfig::new(
            Key::generate(),
            false,
            SameSite::Lax,
            SocketAddr::from(([127, 0, 0, 1], 0)),
            gateway,
        );
        let health_state = web::Data::new(HealthState::new());
        health_state.mark_ready();
        AppDependencies {
            health_state,
            http_state: build_http_state(&config).expect("state should build"),
            key: config.key,
            cookie_secure: false,
            same_site: SameSite::Lax,
            session_ttl_hours: 24,
        }
    }

    #[actix_web::test]
    async fn plans_are_public_and_traced() {
        let app = actix_test::init_service(build_app(deps())).await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri("/api/pagamentos/planos").to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(streamflix::middleware::TRACE_ID_HEADER));
        let body: Value = actix_test::read_body_json(response).await;
        assert!(body.as_array().is_some_and(|plans| !plans.is_empty()));
    }

    #[actix_web::test]
    async fn protected_routes_require_a_session() {
        let app = actix_test::init_service(build_app(deps())).await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri("/api/contas/me").to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn malformed_json_uses_the_error_envelope() {
        let app = actix_test::init_service(build_app(deps())).await;
        let request = actix_test::TestRequest::post()
            .uri("/api/pagamentos/calcular-preco")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let response = actix_test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body.get("code").and_then(Value::as_str), Some("invalid_request"));
    }

    #[actix_web::test]
    async fn readiness_probe_is_served() {
        let app = actix_test::init_service(build_app(deps())).await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri("/health/ready").to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
