//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL account repository using Diesel
//! - **memory**: in-process account repository for local runs and tests
//! - **mercado_pago**: payment gateway over the Mercado Pago REST API, plus
//!   an in-memory fixture
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod memory;
pub mod mercado_pago;
pub mod persistence;
