//! Identity middleware.
//!
//! Authentication happens upstream (API gateway); this service trusts the
//! `x-user-id` / `x-user-email` headers the gateway injects and turns them
//! into a [`RequestContext`]. Requests without a valid pair are rejected
//! with 401 before any domain route runs.

use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use stockdesk_core::{Identity, UserId};

use crate::app::errors;
use crate::context::RequestContext;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";

pub async fn identity_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    match identity_from_headers(req.headers()) {
        Ok(identity) => {
            req.extensions_mut().insert(RequestContext::new(identity));
            next.run(req).await
        }
        Err(message) => errors::json_error(StatusCode::UNAUTHORIZED, "unauthorized", message),
    }
}

fn identity_from_headers(headers: &HeaderMap) -> Result<Identity, &'static str> {
    let user_id = headers
        .get(USER_ID_HEADER)
        .ok_or("missing x-user-id header")?
        .to_str()
        .map_err(|_| "invalid x-user-id header")?;
    let user_id: UserId = user_id.parse().map_err(|_| "invalid x-user-id header")?;

    let email = headers
        .get(USER_EMAIL_HEADER)
        .ok_or("missing x-user-email header")?
        .to_str()
        .map_err(|_| "invalid x-user-email header")?
        .trim();
    if email.is_empty() {
        return Err("invalid x-user-email header");
    }

    Ok(Identity::new(user_id, email))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(id: Option<&str>, email: Option<&str>) -> HeaderMap {
        let mut map = HeaderMap::new();
        if let Some(id) = id {
            map.insert(USER_ID_HEADER, HeaderValue::from_str(id).unwrap());
        }
        if let Some(email) = email {
            map.insert(USER_EMAIL_HEADER, HeaderValue::from_str(email).unwrap());
        }
        map
    }

    #[test]
    fn valid_headers_produce_an_identity() {
        let id = UserId::new();
        let identity = identity_from_headers(&headers(
            Some(&id.to_string()),
            Some("ops@example.test"),
        ))
        .unwrap();
        assert_eq!(identity.user_id(), id);
        assert_eq!(identity.email(), "ops@example.test");
    }

    #[test]
    fn missing_or_malformed_headers_are_rejected() {
        assert!(identity_from_headers(&headers(None, Some("a@b.test"))).is_err());
        assert!(identity_from_headers(&headers(Some("not-a-uuid"), Some("a@b.test"))).is_err());
        let id = UserId::new().to_string();
        assert!(identity_from_headers(&headers(Some(&id), None)).is_err());
        assert!(identity_from_headers(&headers(Some(&id), Some("  "))).is_err());
    }
}
