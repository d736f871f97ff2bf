//! Bearer-token gate for the HTTP API.
//!
//! A single shared token is configured at startup. When none is configured
//! every request is admitted (local development).

use axum::http::HeaderMap;
use subtle::ConstantTimeEq;
use thiserror::Error;


/// Token extraction and verification errors
#[derive(Debug, Error, PartialEq, Clone)]
pub enum TokenError {
    /// Authorization header not present
    #[error("Authorization token not provided")]
    Missing,
    /// Not "Bearer <token>" or not valid header text
    #[error("Invalid authorization token format")]
    InvalidFormat,
    /// Token is empty string
    #[error("Authorization token is empty")]
    Empty,
    /// Well-formed token that does not match the configured one
    #[error("Authorization token rejected")]
    Rejected,
}

/// Extract bearer token from HTTP Authorization header
///
/// Expected format: "Authorization: Bearer <token>"
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, TokenError> {
    let auth_header = headers
        .get("authorization")
        .ok_or(TokenError::Missing)?
        .to_str()
        .map_err(|_| TokenError::InvalidFormat)?;

    parse_bearer_token(auth_header)
}

/// Checks the request against the configured API token.
///
/// `expected == None` admits everything.
pub fn authorize(headers: &HeaderMap, expected: Option<&str>) -> Result<(), TokenError> {
    let Some(expected) = expected else {
        return Ok(());
    };

    let provided = extract_bearer_token(headers)?;
    if bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        Err(TokenError::Rejected)
    }
}

fn parse_bearer_token(header_value: &str) -> Result<String, TokenError> {
    let (scheme, token) = header_value
        .split_once(' ')
        .ok_or(TokenError::InvalidFormat)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(TokenError::InvalidFormat);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(TokenError::Empty);
    }

    Ok(token.to_string())
}
