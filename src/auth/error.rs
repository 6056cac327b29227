// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! Every rejection produced while verifying a bearer token is an
//! [`AuthError`]. Verification failures map to `401 Unauthorized`; a role
//! gate refusal maps to `403 Forbidden`.

use axum::{
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::jwks::KeySetError;

/// Authentication error type.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No `Authorization` header on the request
    #[error("Authorization header required")]
    MissingHeader,

    /// Header present but not `Bearer <token>`
    #[error("Invalid authorization format (expected 'Bearer <token>')")]
    MalformedHeader,

    /// `Bearer` scheme with nothing after it
    #[error("Empty bearer token")]
    EmptyToken,

    /// Token does not decode into header, claims and signature
    #[error("Token is malformed")]
    MalformedToken,

    /// Header declares a non-RSA signature algorithm
    #[error("Unsupported token signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Header carries no `kid`
    #[error("Token header is missing a key identifier")]
    MissingKeyId,

    /// Signing key could not be resolved (unknown kid or key-set fetch failure)
    #[error("Token signing key could not be resolved")]
    KeyResolution(#[from] KeySetError),

    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Token is expired")]
    TokenExpired,

    #[error("Token is not yet valid")]
    TokenNotYetValid,

    #[error("Invalid token issuer")]
    IssuerMismatch { expected: String, actual: String },

    #[error("Invalid token audience")]
    AudienceMismatch { expected: String },

    #[error("Token subject (sub) is missing")]
    MissingSubject,

    /// A handler asked for the auth context but the request never went
    /// through the authentication middleware.
    #[error("Request is not authenticated")]
    Unauthenticated,

    /// Authenticated, but the required role is not held
    #[error("Forbidden: missing required role")]
    Forbidden { required_role: String },
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Machine-stable code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "missing_authorization_header",
            AuthError::MalformedHeader => "malformed_authorization_header",
            AuthError::EmptyToken => "empty_bearer_token",
            AuthError::MalformedToken => "malformed_token",
            AuthError::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            AuthError::MissingKeyId => "missing_key_id",
            AuthError::KeyResolution(_) => "key_resolution_failed",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::IssuerMismatch { .. } => "issuer_mismatch",
            AuthError::AudienceMismatch { .. } => "audience_mismatch",
            AuthError::MissingSubject => "missing_subject",
            AuthError::Unauthenticated => "unauthenticated",
            AuthError::Forbidden { .. } => "forbidden",
        }
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Forbidden { .. } => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
