//! Mercado Pago outbound adapters.
//!
//! [`MercadoPagoHttpGateway`] talks to the real REST API; [`FixtureGateway`]
//! keeps payments in memory for local runs and tests. Both implement the
//! `PaymentGateway` port.

mod dto;
mod fixture;
mod http_gateway;

pub use fixture::FixtureGateway;
pub use http_gateway::{DEFAULT_MERCADO_PAGO_BASE_URL, MercadoPagoHttpGateway};
