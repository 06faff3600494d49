//! PostgreSQL-backed [`AccountRepository`] using Diesel.
//!
//! Each account is one JSONB document. E-mail and CPF are mirrored into
//! indexed columns so the database enforces their uniqueness, and updates
//! are guarded by the `revision` column.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, DatabaseErrorInformation, Error as DieselError};
use diesel_async::RunQueryDsl;
use tracing::{debug, warn};

use crate::domain::ports::{AccountRepository, AccountRepositoryError};
use crate::domain::{Account, AccountId, Email};

use super::models::{AccountRow, AccountUpdate, NewAccountRow};
use super::pool::{DbPool, PoolError};
use super::schema::accounts;

/// Diesel implementation of the account repository port.
#[derive(Clone)]
pub struct DieselAccountRepository {
    pool: DbPool,
}

impl DieselAccountRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> AccountRepositoryError {
    AccountRepositoryError::connection(error.into_message())
}

/// Which unique column a violation refers to.
fn duplicate_field(info: &dyn DatabaseErrorInformation) -> &'static str {
    let constraint = info.constraint_name().unwrap_or_default();
    if constraint.contains("cpf") || info.message().contains("cpf") {
        "cpf"
    } else {
        "email"
    }
}

fn map_diesel_error(error: DieselError) -> AccountRepositoryError {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            AccountRepositoryError::duplicate(duplicate_field(&*info))
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            AccountRepositoryError::connection("database connection error")
        }
        DieselError::QueryBuilderError(_) => AccountRepositoryError::query("database query error"),
        _ => AccountRepositoryError::query("database error"),
    }
}

#[expect(
    clippy::cast_sign_loss,
    reason = "revision column has a positive check constraint"
)]
fn revision_from_db(revision: i32) -> u32 {
    revision as u32
}

fn revision_for_db(revision: u32) -> Result<i32, AccountRepositoryError> {
    i32::try_from(revision)
        .map_err(|_| AccountRepositoryError::query(format!("revision {revision} out of range")))
}

fn row_to_account(row: AccountRow) -> Result<Account, AccountRepositoryError> {
    let mut account: Account = serde_json::from_value(row.document).map_err(|err| {
        warn!(account_id = %row.id, error = %err, "stored account document is unreadable");
        AccountRepositoryError::query(format!("account document is unreadable: {err}"))
    })?;
    account.revision = revision_from_db(row.revision);
    Ok(account)
}

fn document_for(account: &Account) -> Result<serde_json::Value, AccountRepositoryError> {
    serde_json::to_value(account)
        .map_err(|err| AccountRepositoryError::query(format!("account serialisation failed: {err}")))
}

#[async_trait]
impl AccountRepository for DieselAccountRepository {
    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, AccountRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<AccountRow> = accounts::table
            .filter(accounts::id.eq(id.as_uuid()))
            .select(AccountRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_account).transpose()
    }

    async fn find_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<Account>, AccountRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<AccountRow> = accounts::table
            .filter(accounts::email.eq(email.as_str()))
            .select(AccountRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_account).transpose()
    }

    async fn insert(&self, account: &Account) -> Result<(), AccountRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let new_row = NewAccountRow {
            id: *account.id.as_uuid(),
            email: account.email.as_str(),
            cpf: account.cpf.as_ref().map(|cpf| cpf.digits()),
            document: document_for(account)?,
            revision: revision_for_db(account.revision)?,
            created_at: account.created_at,
            updated_at: account.updated_at,
        };
        diesel::insert_into(accounts::table)
            .values(&new_row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn update(
        &self,
        account: &Account,
        expected_revision: u32,
    ) -> Result<(), AccountRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let id = *account.id.as_uuid();
        let changes = AccountUpdate {
            email: account.email.as_str(),
            cpf: account.cpf.as_ref().map(|cpf| cpf.digits()),
            document: document_for(account)?,
            revision: revision_for_db(account.revision)?,
            updated_at: account.updated_at,
        };
        let updated_rows = diesel::update(accounts::table)
            .filter(
                accounts::id
                    .eq(id)
                    .and(accounts::revision.eq(revision_for_db(expected_revision)?)),
            )
            .set(&changes)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        if updated_rows > 0 {
            return Ok(());
        }

        let current: Option<i32> = accounts::table
            .filter(accounts::id.eq(id))
            .select(accounts::revision)
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Err(match current {
            Some(actual) => {
                AccountRepositoryError::revision_mismatch(expected_revision, revision_from_db(actual))
            }
            None => AccountRepositoryError::missing(id.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    struct Violation {
        message: &'static str,
        constraint: Option<&'static str>,
    }

    impl DatabaseErrorInformation for Violation {
        fn message(&self) -> &str {
            self.message
        }
        fn details(&self) -> Option<&str> {
            None
        }
        fn hint(&self) -> Option<&str> {
            None
        }
        fn table_name(&self) -> Option<&str> {
            Some("accounts")
        }
        fn column_name(&self) -> Option<&str> {
            None
        }
        fn constraint_name(&self) -> Option<&str> {
            self.constraint
        }
        fn statement_position(&self) -> Option<i32> {
            None
        }
    }

    fn unique_violation(constraint: Option<&'static str>, message: &'static str) -> DieselError {
        DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new(Violation {
                message,
                constraint,
            }),
        )
    }

    #[rstest]
    #[case(Some("accounts_email_key"), "duplicate key", "email")]
    #[case(Some("accounts_cpf_key"), "duplicate key", "cpf")]
    #[case(None, "duplicate key value violates unique constraint on cpf", "cpf")]
    fn unique_violations_name_the_field(
        #[case] constraint: Option<&'static str>,
        #[case] message: &'static str,
        #[case] field: &str,
    ) {
        let error = map_diesel_error(unique_violation(constraint, message));
        assert_eq!(error, AccountRepositoryError::duplicate(field));
    }

    #[rstest]
    fn pool_errors_are_connection_errors() {
        let error = map_pool_error(PoolError::checkout("connection refused"));
        assert_eq!(error, AccountRepositoryError::connection("connection refused"));
    }

    #[rstest]
    fn not_found_is_a_query_error() {
        let error = map_diesel_error(DieselError::NotFound);
        assert!(matches!(error, AccountRepositoryError::Query { .. }));
    }

    #[rstest]
    fn unreadable_document_is_a_query_error() {
        let row = AccountRow {
            id: uuid::Uuid::new_v4(),
            document: serde_json::json!({ "id": "not an account" }),
            revision: 1,
        };
        assert!(matches!(
            row_to_account(row),
            Err(AccountRepositoryError::Query { .. })
        ));
    }

    #[rstest]
    fn revision_overflow_is_rejected() {
        assert!(revision_for_db(u32::MAX).is_err());
        assert_eq!(revision_for_db(7).ok(), Some(7));
    }
}
