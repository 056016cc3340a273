use std::{
    fmt::{self, Debug},
    str::FromStr,
};

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use extra::ErrorResponse;
use sha2::{Digest, Sha256};

/// SHA-256 of the configured admin token. The token itself is not kept.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminToken([u8; 32]);

/// Capability required by every mutating endpoint.
///
/// Extracted from `Authorization: Token <admin-token>`.
#[derive(Debug)]
pub struct Admin;

#[derive(thiserror::Error, Debug)]
pub enum AdminError {
    #[error("missing credentials. expected `Authorization: Token <admin-token>`")]
    MissingCredentials,

    #[error("Authorization header value must be utf-8")]
    NonUTF8HeaderValue,

    #[error("invalid Authorization type, only `Token` is allowed")]
    InvalidAuthorizationType,

    #[error("invalid admin token")]
    InvalidToken,
}

impl AdminToken {
    pub fn new(token: &str) -> Self {
        Self(Sha256::digest(token.as_bytes()).into())
    }

    pub fn matches(&self, candidate: &str) -> bool {
        let candidate: [u8; 32] = Sha256::digest(candidate.as_bytes()).into();
        candidate == self.0
    }
}

impl FromStr for AdminToken {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().is_empty() {
            true => Err("admin token must not be empty"),
            false => Ok(Self::new(s)),
        }
    }
}

impl Debug for AdminToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AdminToken(<REDACTED>)")
    }
}

impl<S> FromRequestParts<S> for Admin
where
    AdminToken: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AdminError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(header_value) = parts.headers.get(AUTHORIZATION) else {
            return Err(AdminError::MissingCredentials);
        };

        let header_value = header_value
            .to_str()
            .map_err(|_| AdminError::NonUTF8HeaderValue)?;

        let token = header_value
            .strip_prefix("Token ")
            .ok_or(AdminError::InvalidAuthorizationType)?;

        match AdminToken::from_ref(state).matches(token.trim()) {
            true => Ok(Admin),
            false => Err(AdminError::InvalidToken),
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        match self {
            AdminError::MissingCredentials
            | AdminError::NonUTF8HeaderValue
            | AdminError::InvalidAuthorizationType => {
                tracing::info!("{:?}", self);
                ErrorResponse::respond(StatusCode::UNAUTHORIZED, self)
            }
            AdminError::InvalidToken => {
                tracing::warn!("{:?}", self);
                ErrorResponse::respond(StatusCode::FORBIDDEN, self)
            }
        }
    }
}
