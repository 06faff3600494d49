//! Shared helpers for services that load and save account documents.

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::domain::ports::{AccountRepository, AccountRepositoryError, PaymentGatewayError};
use crate::domain::{Account, AccountId, Error};

pub(crate) fn map_account_repository_error(error: AccountRepositoryError) -> Error {
    match error {
        AccountRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("account repository unavailable: {message}"))
        }
        AccountRepositoryError::Query { message } => {
            Error::internal(format!("account repository error: {message}"))
        }
        AccountRepositoryError::Duplicate { field } => {
            Error::conflict(format!("an account with this {field} already exists"))
                .with_details(json!({ "field": field, "code": "duplicate" }))
        }
        AccountRepositoryError::Missing { id } => {
            Error::not_found(format!("account {id} not found"))
        }
        AccountRepositoryError::RevisionMismatch { expected, actual } => {
            Error::conflict("account was modified concurrently").with_details(json!({
                "expectedRevision": expected,
                "actualRevision": actual,
                "code": "revision_mismatch",
            }))
        }
    }
}

pub(crate) fn map_gateway_error(error: PaymentGatewayError) -> Error {
    match error {
        PaymentGatewayError::Transport { message } | PaymentGatewayError::Timeout { message } => {
            Error::service_unavailable(format!("payment gateway unavailable: {message}"))
        }
        PaymentGatewayError::Rejected { status, message } if status >= 500 => {
            Error::service_unavailable(format!("payment gateway failed: {message}"))
        }
        PaymentGatewayError::Rejected { status, message } => {
            Error::invalid_request("payment gateway rejected the request").with_details(json!({
                "gatewayStatus": status,
                "reason": message,
                "code": "gateway_rejected",
            }))
        }
        PaymentGatewayError::NotFound { id } => Error::not_found(format!("payment {id} not found")),
        PaymentGatewayError::Decode { message } => {
            Error::internal(format!("payment gateway response unreadable: {message}"))
        }
    }
}

pub(crate) async fn load_account<R>(repo: &R, id: &AccountId) -> Result<Account, Error>
where
    R: AccountRepository + ?Sized,
{
    repo.find_by_id(id)
        .await
        .map_err(map_account_repository_error)?
        .ok_or_else(|| Error::not_found("account not found"))
}

/// Persist `account`, bumping its revision.
pub(crate) async fn save_account<R>(
    repo: &R,
    account: &mut Account,
    now: DateTime<Utc>,
) -> Result<(), Error>
where
    R: AccountRepository + ?Sized,
{
    let expected = account.revision;
    account.revision = expected + 1;
    account.touch(now);
    if let Err(error) = repo.update(account, expected).await {
        account.revision = expected;
        return Err(map_account_repository_error(error));
    }
    Ok(())
}
