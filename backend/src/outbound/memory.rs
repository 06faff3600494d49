//! In-process account repository.
//!
//! Used when no database URL is configured and by HTTP integration tests.
//! Enforces the same e-mail/CPF uniqueness and revision checks as the
//! PostgreSQL adapter.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::ports::{AccountRepository, AccountRepositoryError};
use crate::domain::{Account, AccountId, Email};

#[derive(Debug, Default)]
pub struct InMemoryAccountRepository {
    accounts: RwLock<HashMap<Uuid, Account>>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts.
    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn conflicting_field(existing: &Account, candidate: &Account) -> Option<&'static str> {
    if existing.id == candidate.id {
        return None;
    }
    if existing.email == candidate.email {
        return Some("email");
    }
    match (&existing.cpf, &candidate.cpf) {
        (Some(a), Some(b)) if a == b => Some("cpf"),
        _ => None,
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, AccountRepositoryError> {
        Ok(self.accounts.read().await.get(id.as_uuid()).cloned())
    }

    async fn find_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<Account>, AccountRepositoryError> {
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|account| &account.email == email)
            .cloned())
    }

    async fn insert(&self, account: &Account) -> Result<(), AccountRepositoryError> {
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(account.id.as_uuid()) {
            return Err(AccountRepositoryError::duplicate("id"));
        }
        if let Some(field) = accounts
            .values()
            .find_map(|existing| conflicting_field(existing, account))
        {
            return Err(AccountRepositoryError::duplicate(field));
        }
        accounts.insert(*account.id.as_uuid(), account.clone());
        Ok(())
    }

    async fn update(
        &self,
        account: &Account,
        expected_revision: u32,
    ) -> Result<(), AccountRepositoryError> {
        let mut accounts = self.accounts.write().await;
        if let Some(field) = accounts
            .values()
            .find_map(|existing| conflicting_field(existing, account))
        {
            return Err(AccountRepositoryError::duplicate(field));
        }
        let Some(stored) = accounts.get_mut(account.id.as_uuid()) else {
            return Err(AccountRepositoryError::missing(account.id.to_string()));
        };
        if stored.revision != expected_revision {
            return Err(AccountRepositoryError::revision_mismatch(
                expected_revision,
                stored.revision,
            ));
        }
        *stored = account.clone();
        Ok(())
    }
}
