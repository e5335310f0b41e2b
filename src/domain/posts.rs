//! Field-level validation rules for post records.

use thiserror::Error;
use url::Url;

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_EXCERPT_LEN: usize = 500;
pub const MAX_SLUG_LEN: usize = 120;
pub const MAX_AUTHOR_LEN: usize = 120;
pub const MAX_CATEGORY_LEN: usize = 80;

/// A validation failure naming the offending field.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("field `{field}` is invalid: {message}")]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub fn ensure_non_empty(value: &str, field: &'static str) -> Result<(), FieldError> {
    if value.trim().is_empty() {
        return Err(FieldError::new(field, "must not be empty"));
    }
    Ok(())
}

pub fn ensure_bounded(value: &str, max: usize, field: &'static str) -> Result<(), FieldError> {
    if value.chars().count() > max {
        return Err(FieldError::new(
            field,
            format!("must be at most {max} characters"),
        ));
    }
    Ok(())
}

/// Validate an optional URL-shaped field; empty strings count as absent.
pub fn ensure_well_formed_url(
    value: Option<&str>,
    field: &'static str,
) -> Result<(), FieldError> {
    let Some(raw) = value else { return Ok(()) };
    if raw.trim().is_empty() {
        return Ok(());
    }
    let parsed =
        Url::parse(raw).map_err(|err| FieldError::new(field, format!("not a valid URL: {err}")))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(FieldError::new(field, "must use http or https"));
    }
    Ok(())
}
