use core::str::FromStr;

use stockdesk_core::DomainError;

use crate::app::errors;

/// Parse a path segment into a typed id, producing the standard 400
/// response on failure.
pub fn parse_id<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse::<T>().map_err(errors::domain_error_to_response)
}
