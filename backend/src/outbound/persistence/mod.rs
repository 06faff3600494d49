//! PostgreSQL persistence adapters using Diesel.
//!
//! Accounts are stored as revisioned JSONB documents through `diesel-async`
//! with a `bb8` pool. Row structs and table definitions stay private to
//! this module; only the repository, pool and migration entry points are
//! exported.
//!
//! ```ignore
//! use streamflix::outbound::persistence::{DbPool, DieselAccountRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/streamflix")).await?;
//! let repo = DieselAccountRepository::new(pool);
//! ```

mod diesel_account_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_account_repository::DieselAccountRepository;
pub use migrations::{MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
