//! Port for account document persistence.
//!
//! Each account is stored as one document. Writes carry the revision the
//! caller read so concurrent updates to the same account are detected rather
//! than silently overwritten.

use async_trait::async_trait;

use crate::domain::{Account, AccountId, Email};

use super::define_port_error;

define_port_error! {
    /// Errors raised by account repository adapters.
    pub enum AccountRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "account repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "account repository query failed: {message}",
        /// A unique field (e-mail or CPF) is already taken.
        Duplicate { field: String } =>
            "an account with this {field} already exists",
        /// The account to update no longer exists.
        Missing { id: String } =>
            "account {id} does not exist",
        /// Optimistic concurrency check failed.
        RevisionMismatch { expected: u32, actual: u32 } =>
            "revision mismatch: expected {expected}, found {actual}",
    }
}

/// Port for account storage and retrieval.
///
/// # Revision semantics
///
/// - New accounts are inserted at revision 1.
/// - [`AccountRepository::update`] only succeeds when the stored revision
///   equals `expected_revision`; the caller sets `account.revision` to the
///   next value before calling.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, AccountRepositoryError>;

    async fn find_by_email(&self, email: &Email)
    -> Result<Option<Account>, AccountRepositoryError>;

    /// Insert a new account, failing with
    /// [`AccountRepositoryError::Duplicate`] when the e-mail or CPF is taken.
    async fn insert(&self, account: &Account) -> Result<(), AccountRepositoryError>;

    /// Replace the stored document guarded by `expected_revision`.
    async fn update(
        &self,
        account: &Account,
        expected_revision: u32,
    ) -> Result<(), AccountRepositoryError>;
}
