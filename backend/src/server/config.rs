//! HTTP server configuration object and helpers.

use std::net::SocketAddr;
use std::time::Duration;

use actix_web::cookie::{Key, SameSite};
use url::Url;
use streamflix::domain::PaymentUrls;
use streamflix::inbound::http::session_config::BuildMode;
use streamflix::outbound::persistence::DbPool;

/// Mercado Pago wiring. Without an access token debug builds use the
/// in-memory fixture gateway; release builds refuse to start.
#[derive(Clone)]
pub struct GatewayConfig {
    pub(crate) access_token: Option<String>,
    pub(crate) build_mode: BuildMode,
    pub(crate) base_url: Url,
    pub(crate) timeout: Duration,
    pub(crate) webhook_secret: Option<String>,
    pub(crate) urls: PaymentUrls,
}

impl GatewayConfig {
    #[must_use]
    pub fn new(base_url: Url, timeout: Duration, urls: PaymentUrls) -> Self {
        Self {
            access_token: None,
            build_mode: BuildMode::from_debug_assertions(),
            base_url,
            timeout,
            webhook_secret: None,
            urls,
        }
    }

    #[must_use]
    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token;
        self
    }

    #[must_use]
    pub fn with_build_mode(mut self, mode: BuildMode) -> Self {
        self.build_mode = mode;
        self
    }

    #[must_use]
    pub fn with_webhook_secret(mut self, secret: Option<String>) -> Self {
        self.webhook_secret = secret;
        self
    }
}

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) key: Key,
    pub(crate) cookie_secure: bool,
    pub(crate) same_site: SameSite,
    pub(crate) session_ttl_hours: u32,
    pub(crate) bind_addr: SocketAddr,
    pub(crate) db_pool: Option<DbPool>,
    pub(crate) gateway: GatewayConfig,
}

impl ServerConfig {
    /// Construct a server configuration using application preferences.
    #[must_use]
    pub fn new(
        key: Key,
        cookie_secure: bool,
        same_site: SameSite,
        bind_addr: SocketAddr,
        gateway: GatewayConfig,
    ) -> Self {
        Self {
            key,
            cookie_secure,
            same_site,
            session_ttl_hours: 24,
            bind_addr,
            db_pool: None,
            gateway,
        }
    }

    /// Attach a database connection pool.
    ///
    /// When provided, accounts are persisted through Diesel instead of the
    /// in-memory repository.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    #[must_use]
    pub fn with_session_ttl_hours(mut self, hours: u32) -> Self {
        self.session_ttl_hours = hours;
        self
    }

    /// Return the socket address the server will bind to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
