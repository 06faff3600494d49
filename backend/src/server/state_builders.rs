//! Builders for HTTP state ports backed by the configured adapters.
//!
//! The account repository is Diesel-backed when a pool is configured and
//! in-memory otherwise. The payment gateway talks to Mercado Pago when an
//! access token is configured. Debug builds fall back to the local fixture;
//! release builds refuse to start without a token.

use std::sync::Arc;

use actix_web::web;
use mockable::{Clock, DefaultClock};
use tracing::warn;

use streamflix::domain::ports::{AccountRepository, PaymentGateway};
use streamflix::domain::{AccountsService, PaymentUrls, PaymentsService};
use streamflix::inbound::http::session_config::BuildMode;
use streamflix::inbound::http::state::{HttpState, HttpStatePorts};
use streamflix::inbound::http::webhook_signature::WebhookVerifier;
use streamflix::outbound::memory::InMemoryAccountRepository;
use streamflix::outbound::mercado_pago::{FixtureGateway, MercadoPagoHttpGateway};
use streamflix::outbound::persistence::DieselAccountRepository;

use super::ServerConfig;

/// Wire the payment and account services over one repository and gateway.
fn ports_for<R, G>(
    repo: Arc<R>,
    gateway: Arc<G>,
    clock: Arc<dyn Clock>,
    urls: PaymentUrls,
) -> HttpStatePorts
where
    R: AccountRepository + 'static,
    G: PaymentGateway + 'static,
{
    let payments = Arc::new(PaymentsService::new(
        repo.clone(),
        gateway,
        clock.clone(),
        urls,
    ));
    let accounts = Arc::new(AccountsService::new(repo, clock));
    HttpStatePorts {
        payments: payments.clone(),
        payments_query: payments,
        accounts: accounts.clone(),
        accounts_query: accounts,
    }
}

fn ports_with_gateway<R>(
    config: &ServerConfig,
    repo: Arc<R>,
    clock: Arc<dyn Clock>,
) -> std::io::Result<HttpStatePorts>
where
    R: AccountRepository + 'static,
{
    let gateway = &config.gateway;
    let urls = gateway.urls.clone();
    match gateway.access_token.as_deref() {
        Some(token) => {
            let http = MercadoPagoHttpGateway::new(
                gateway.base_url.clone(),
                token,
                gateway.timeout,
                clock.clone(),
            )
            .map_err(|err| {
                std::io::Error::other(format!("failed to build Mercado Pago client: {err}"))
            })?;
            Ok(ports_for(repo, Arc::new(http), clock, urls))
        }
        None if gateway.build_mode == BuildMode::Release => Err(std::io::Error::other(
            "a Mercado Pago access token is required in release builds",
        )),
        None => {
            warn!("no Mercado Pago access token configured; using the fixture payment gateway");
            let fixture = Arc::new(FixtureGateway::new(clock.clone()));
            Ok(ports_for(repo, fixture, clock, urls))
        }
    }
}

fn build_ports(config: &ServerConfig) -> std::io::Result<HttpStatePorts> {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    match &config.db_pool {
        Some(pool) => {
            let repo = Arc::new(DieselAccountRepository::new(pool.clone()));
            ports_with_gateway(config, repo, clock)
        }
        None => {
            warn!("no database configured; accounts are kept in memory");
            ports_with_gateway(config, Arc::new(InMemoryAccountRepository::new()), clock)
        }
    }
}

/// Build the shared HTTP state from the configured adapters.
///
/// # Errors
///
/// Returns [`std::io::Error`] when the Mercado Pago client cannot be built
/// or a release build has no access token.
pub(super) fn build_http_state(config: &ServerConfig) -> std::io::Result<web::Data<HttpState>> {
    let ports = build_ports(config)?;
    let verifier = WebhookVerifier::new(config.gateway.webhook_secret.clone());
    if !verifier.is_enabled() {
        warn!("no webhook secret configured; notification signatures are not checked");
    }
    Ok(web::Data::new(HttpState::new(ports, verifier)))
}
