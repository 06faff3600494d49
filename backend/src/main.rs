//! StreamFlix entry-point: loads settings, prepares adapters and serves the
//! payments and accounts APIs.

mod server;

use std::time::Duration;

use actix_web::web;
use color_eyre::eyre::{Context, Result, eyre};
use mockable::DefaultEnv;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};
use url::Url;

use server::{GatewayConfig, ServerConfig, create_server};
use streamflix::domain::PaymentUrls;
use streamflix::inbound::http::health::HealthState;
use streamflix::inbound::http::session_config::{
    BuildMode, key_fingerprint, session_settings_from_env,
};
use streamflix::outbound::mercado_pago::DEFAULT_MERCADO_PAGO_BASE_URL;
use streamflix::outbound::persistence::{DbPool, PoolConfig, run_pending_migrations};
use streamflix::settings::StreamflixSettings;

const DB_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = StreamflixSettings::load_from_iter(std::env::args_os())
        .map_err(|err| eyre!("failed to load settings: {err}"))?;
    let build_mode = BuildMode::from_debug_assertions();
    let session = session_settings_from_env(&DefaultEnv::new(), build_mode)
        .wrap_err("invalid session configuration")?;
    info!(
        fingerprint = %key_fingerprint(&session.key),
        ttl_hours = session.ttl_hours,
        "session key loaded"
    );

    let base_url = settings
        .mercado_pago_base_url()
        .unwrap_or(DEFAULT_MERCADO_PAGO_BASE_URL);
    let base_url = Url::parse(base_url)
        .wrap_err_with(|| format!("invalid Mercado Pago base URL: {base_url}"))?;
    let gateway = GatewayConfig::new(
        base_url,
        settings.gateway_timeout(),
        PaymentUrls::new(settings.frontend_url(), settings.backend_url()),
    )
    .with_access_token(settings.mercado_pago_access_token().map(str::to_owned))
    .with_build_mode(build_mode)
    .with_webhook_secret(settings.webhook_secret().map(str::to_owned));

    let mut config = ServerConfig::new(
        session.key,
        session.cookie_secure,
        session.same_site,
        settings.bind_addr(),
        gateway,
    )
    .with_session_ttl_hours(session.ttl_hours);

    if let Some(database_url) = settings.database_url() {
        run_pending_migrations(database_url)
            .await
            .wrap_err("failed to apply database migrations")?;
        let pool = DbPool::new(
            PoolConfig::new(database_url)
                .with_max_size(settings.db_max_connections())
                .with_connection_timeout(DB_CONNECT_TIMEOUT),
        )
        .await
        .wrap_err("failed to connect to the database")?;
        config = config.with_db_pool(pool);
    }

    info!(bind_addr = %config.bind_addr(), "starting StreamFlix server");
    let health_state = web::Data::new(HealthState::new());
    create_server(health_state, config)?.await?;
    Ok(())
}
