//! Server settings loaded via OrthoConfig.
//!
//! Every value can come from a `STREAMFLIX_*` environment variable, a
//! configuration file or the command line. Session cookie toggles are read
//! separately by [`crate::inbound::http::session_config`].

use std::net::SocketAddr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

const DEFAULT_BIND_ADDR: SocketAddr =
    SocketAddr::V4(std::net::SocketAddrV4::new(std::net::Ipv4Addr::UNSPECIFIED, 8080));
const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";
const DEFAULT_BACKEND_URL: &str = "http://localhost:8080";
const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 10;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

/// Runtime settings for the StreamFlix server.
#[derive(Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "STREAMFLIX")]
pub struct StreamflixSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<SocketAddr>,
    /// PostgreSQL URL; accounts are kept in memory when absent.
    pub database_url: Option<String>,
    pub db_max_connections: Option<u32>,
    /// Mercado Pago access token; a local fixture gateway is used when absent.
    pub mercado_pago_access_token: Option<String>,
    /// Mercado Pago API root, overridable for sandboxes and tests.
    pub mercado_pago_base_url: Option<String>,
    /// Secret used to verify webhook `x-signature` headers.
    pub webhook_secret: Option<String>,
    /// Public web app URL used for checkout redirects.
    pub frontend_url: Option<String>,
    /// Public URL of this server used for webhook registration.
    pub backend_url: Option<String>,
    pub gateway_timeout_secs: Option<u64>,
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|value| value.trim()).filter(|value| !value.is_empty())
}

impl StreamflixSettings {
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr.unwrap_or(DEFAULT_BIND_ADDR)
    }

    pub fn database_url(&self) -> Option<&str> {
        non_blank(self.database_url.as_ref())
    }

    pub fn db_max_connections(&self) -> u32 {
        self.db_max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
    }

    pub fn mercado_pago_access_token(&self) -> Option<&str> {
        non_blank(self.mercado_pago_access_token.as_ref())
    }

    pub fn mercado_pago_base_url(&self) -> Option<&str> {
        non_blank(self.mercado_pago_base_url.as_ref())
    }

    pub fn webhook_secret(&self) -> Option<&str> {
        non_blank(self.webhook_secret.as_ref())
    }

    pub fn frontend_url(&self) -> &str {
        non_blank(self.frontend_url.as_ref()).unwrap_or(DEFAULT_FRONTEND_URL)
    }

    pub fn backend_url(&self) -> &str {
        non_blank(self.backend_url.as_ref()).unwrap_or(DEFAULT_BACKEND_URL)
    }

    /// Timeout applied to each gateway request; zero falls back to the default.
    pub fn gateway_timeout(&self) -> Duration {
        let secs = self
            .gateway_timeout_secs
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_GATEWAY_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }
}

impl std::fmt::Debug for StreamflixSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redacted = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("StreamflixSettings")
            .field("bind_addr", &self.bind_addr)
            .field("database_url", &redacted(&self.database_url))
            .field("db_max_connections", &self.db_max_connections)
            .field(
                "mercado_pago_access_token",
                &redacted(&self.mercado_pago_access_token),
            )
            .field("mercado_pago_base_url", &self.mercado_pago_base_url)
            .field("webhook_secret", &redacted(&self.webhook_secret))
            .field("frontend_url", &self.frontend_url)
            .field("backend_url", &self.backend_url)
            .field("gateway_timeout_secs", &self.gateway_timeout_secs)
            .finish()
    }
}
