//! HTTP route handlers.

pub mod health;
pub mod metrics;
pub mod payments;
pub mod purchases;

use std::str::FromStr;

use crate::error::ApiError;

/// Parses a path segment into a typed id, rejecting malformed values.
pub(crate) fn parse_id<T: FromStr>(raw: &str) -> Result<T, ApiError>
where
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))
}
