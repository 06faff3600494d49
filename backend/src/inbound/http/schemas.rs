//! OpenAPI schema definitions for the error envelope.
//!
//! [`crate::domain::Error`] stays free of framework derives; these wrappers
//! mirror its serialised shape so handlers can reference it in
//! `#[utoipa::path]` responses.

use utoipa::ToSchema;

/// OpenAPI schema for [`crate::domain::ErrorCode`].
#[derive(ToSchema)]
#[schema(as = crate::domain::ErrorCode)]
pub enum ErrorCodeSchema {
    /// The request is malformed or fails validation.
    #[schema(rename = "invalid_request")]
    InvalidRequest,
    /// Login is missing or the credentials are wrong.
    #[schema(rename = "unauthorized")]
    Unauthorized,
    /// The account is locked, suspended or otherwise barred.
    #[schema(rename = "forbidden")]
    Forbidden,
    #[schema(rename = "not_found")]
    NotFound,
    /// The account was changed concurrently or already exists.
    #[schema(rename = "conflict")]
    Conflict,
    /// The database or the payment gateway is unavailable.
    #[schema(rename = "service_unavailable")]
    ServiceUnavailable,
    #[schema(rename = "internal_error")]
    InternalError,
}

/// OpenAPI schema for [`crate::domain::Error`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Error)]
#[schema(rename_all = "camelCase")]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct ErrorSchema {
    #[schema(example = "invalid_request")]
    code: ErrorCodeSchema,
    #[schema(example = "boleto requires at least 12 months")]
    message: String,
    /// Correlation identifier echoed in the `trace-id` header.
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    trace_id: Option<String>,
    /// Field-level details such as `{"field": "cpf", "code": "invalid_cpf"}`.
    details: Option<serde_json::Value>,
}
