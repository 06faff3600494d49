//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{AccountsCommand, AccountsQuery, PaymentsCommand, PaymentsQuery};
use crate::inbound::http::webhook_signature::WebhookVerifier;

/// Parameter object bundling the driving ports used by HTTP handlers.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub payments: Arc<dyn PaymentsCommand>,
    pub payments_query: Arc<dyn PaymentsQuery>,
    pub accounts: Arc<dyn AccountsCommand>,
    pub accounts_query: Arc<dyn AccountsQuery>,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub payments: Arc<dyn PaymentsCommand>,
    pub payments_query: Arc<dyn PaymentsQuery>,
    pub accounts: Arc<dyn AccountsCommand>,
    pub accounts_query: Arc<dyn AccountsQuery>,
    pub webhook: WebhookVerifier,
}

impl From<HttpStatePorts> for HttpState {
    fn from(ports: HttpStatePorts) -> Self {
        Self::new(ports, WebhookVerifier::default())
    }
}

impl HttpState {
    /// Construct state from a ports bundle and the webhook verifier.
    ///
    /// # Examples
    /// ```no_run
    /// use std::sync::Arc;
    ///
    /// use mockable::DefaultClock;
    /// use streamflix::domain::{AccountsService, PaymentUrls, PaymentsService};
    /// use streamflix::inbound::http::state::{HttpState, HttpStatePorts};
    /// use streamflix::inbound::http::webhook_signature::WebhookVerifier;
    /// use streamflix::outbound::memory::InMemoryAccountRepository;
    /// use streamflix::outbound::mercado_pago::FixtureGateway;
    ///
    /// let clock = Arc::new(DefaultClock);
    /// let repo = Arc::new(InMemoryAccountRepository::default());
    /// let gateway = Arc::new(FixtureGateway::new(clock.clone()));
    /// let payments = Arc::new(PaymentsService::new(
    ///     repo.clone(),
    ///     gateway,
    ///     clock.clone(),
    ///     PaymentUrls::new("http://localhost:3000", "http://localhost:8080"),
    /// ));
    /// let accounts = Arc::new(AccountsService::new(repo, clock));
    /// let state = HttpState::new(
    ///     HttpStatePorts {
    ///         payments: payments.clone(),
    ///         payments_query: payments,
    ///         accounts: accounts.clone(),
    ///         accounts_query: accounts,
    ///     },
    ///     WebhookVerifier::new(Some("secret".to_owned())),
    /// );
    /// assert!(state.webhook.is_enabled());
    /// ```
    pub fn new(ports: HttpStatePorts, webhook: WebhookVerifier) -> Self {
        let HttpStatePorts {
            payments,
            payments_query,
            accounts,
            accounts_query,
        } = ports;
        Self {
            payments,
            payments_query,
            accounts,
            accounts_query,
            webhook,
        }
    }
}
