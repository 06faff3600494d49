//! Internal Diesel row structs for the accounts table.
//!
//! These never leave the persistence layer.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::accounts;

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = accounts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct AccountRow {
    pub id: Uuid,
    pub document: serde_json::Value,
    pub revision: i32,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = accounts)]
pub(crate) struct NewAccountRow<'a> {
    pub id: Uuid,
    pub email: &'a str,
    pub cpf: Option<&'a str>,
    pub document: serde_json::Value,
    pub revision: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Changeset for a revision-guarded document replacement.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = accounts)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct AccountUpdate<'a> {
    pub email: &'a str,
    pub cpf: Option<&'a str>,
    pub document: serde_json::Value,
    pub revision: i32,
    pub updated_at: DateTime<Utc>,
}
