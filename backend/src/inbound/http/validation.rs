//! Shared validation helpers for inbound HTTP adapters.

use actix_web::{HttpRequest, error::JsonPayloadError};
use serde_json::json;
use tracing::debug;

use crate::domain::{Error, Plan};

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    MissingField,
    UnknownPlan,
    InvalidValue,
    MalformedBody,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MissingField => "missing_field",
            ErrorCode::UnknownPlan => "unknown_plan",
            ErrorCode::InvalidValue => "invalid_value",
            ErrorCode::MalformedBody => "malformed_body",
        }
    }
}

/// Newtype wrapper for HTTP field names to provide type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(self) -> &'static str {
        self.0
    }
}

fn field_error(field: FieldName, code: ErrorCode, message: String, value: Option<&str>) -> Error {
    let mut details = json!({
        "field": field.as_str(),
        "code": code.as_str(),
    });
    if let (Some(value), Some(map)) = (value, details.as_object_mut()) {
        map.insert("value".to_owned(), json!(value));
    }
    Error::invalid_request(message).with_details(details)
}

pub(crate) fn missing_field_error(field: FieldName) -> Error {
    field_error(
        field,
        ErrorCode::MissingField,
        format!("missing required field: {}", field.as_str()),
        None,
    )
}

pub(crate) fn invalid_value_error(field: FieldName, value: &str, message: &str) -> Error {
    field_error(
        field,
        ErrorCode::InvalidValue,
        format!("{}: {message}", field.as_str()),
        Some(value),
    )
}

/// Parse a plan identifier, accepting English and Portuguese names.
pub(crate) fn parse_plan(value: Option<&str>, field: FieldName) -> Result<Plan, Error> {
    let raw = value
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| missing_field_error(field))?;
    raw.parse::<Plan>().map_err(|_| {
        field_error(
            field,
            ErrorCode::UnknownPlan,
            format!("unknown plan: {raw}"),
            Some(raw),
        )
    })
}

/// Turn JSON extractor failures into the shared error envelope.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    debug!(error = %err, "rejected request body");
    let message = match &err {
        JsonPayloadError::ContentType => "request body must be application/json".to_owned(),
        JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. } => {
            "request body is too large".to_owned()
        }
        other => format!("malformed request body: {other}"),
    };
    let error = Error::invalid_request(message)
        .with_details(json!({ "code": ErrorCode::MalformedBody.as_str() }));
    actix_web::error::InternalError::from_response(err, actix_web::ResponseError::error_response(&error))
        .into()
}
