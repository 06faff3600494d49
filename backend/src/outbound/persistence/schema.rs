//! Diesel table definitions.
//!
//! Must match `backend/migrations` exactly.

diesel::table! {
    /// Account documents keyed by id; e-mail and CPF are lifted out for
    /// uniqueness constraints and lookups.
    accounts (id) {
        id -> Uuid,
        email -> Text,
        cpf -> Nullable<Text>,
        document -> Jsonb,
        revision -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}
