//! Request validation.

use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::{Error, Result, ValidationErrorCode};
use crate::events::Payload;
use crate::limits::{DEFAULT_LIST_LIMIT, MAX_BATCH_EVENTS, MAX_LIST_LIMIT, MAX_PAYLOAD_BYTES};

/// Validates the serialized size of a caller payload.
pub fn validate_payload_size(payload: &Payload) -> std::result::Result<(), ValidationError> {
    if payload.is_empty() {
        return Ok(());
    }

    let size = serde_json::to_vec(payload).map(|v| v.len()).unwrap_or(0);

    if size > MAX_PAYLOAD_BYTES {
        let mut err = ValidationError::new("payload_too_large");
        err.message = Some(
            format!(
                "payload {}KB exceeds {}KB limit",
                size / 1024,
                MAX_PAYLOAD_BYTES / 1024
            )
            .into(),
        );
        return Err(err);
    }
    Ok(())
}

/// Runs derive validations and reports the first offending field.
pub fn validate_request<T: Validate>(request: &T) -> Result<()> {
    request.validate().map_err(from_validation_errors)
}

/// Converts validator output into a field-named validation error.
pub fn from_validation_errors(errors: ValidationErrors) -> Error {
    let mut fields: Vec<String> = errors
        .field_errors()
        .keys()
        .map(|k| k.to_string())
        .collect();
    fields.sort();

    let field = fields
        .first()
        .map(|f| camel_case(f))
        .unwrap_or_else(|| "body".to_string());

    Error::validation(field, errors.to_string())
}

/// Rejects empty or oversized batches before any work is scheduled.
///
/// `max` is capped at [`MAX_BATCH_EVENTS`].
pub fn validate_batch_len(len: usize, max: usize) -> Result<()> {
    let max = max.min(MAX_BATCH_EVENTS);
    if len == 0 {
        return Err(Error::validation_code(
            ValidationErrorCode::BatchSize,
            "events",
            "batch must contain at least one event",
        ));
    }
    if len > max {
        return Err(Error::validation_code(
            ValidationErrorCode::BatchSize,
            "events",
            format!("batch has {} events, exceeds {} limit", len, max),
        ));
    }
    Ok(())
}

/// Resolves a sessions-by-user page size.
pub fn resolve_list_limit(limit: Option<usize>) -> Result<usize> {
    match limit {
        None => Ok(DEFAULT_LIST_LIMIT),
        Some(n) if (1..=MAX_LIST_LIMIT).contains(&n) => Ok(n),
        Some(n) => Err(Error::validation(
            "limit",
            format!("limit {} outside 1..={}", n, MAX_LIST_LIMIT),
        )),
    }
}

fn camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper = false;
    for c in snake.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
