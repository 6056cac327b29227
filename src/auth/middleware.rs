// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication middleware for Axum.
//!
//! Apply to a router subtree with `from_fn_with_state`:
//!
//! ```rust,ignore
//! let protected = Router::new()
//!     .route("/me", get(me))
//!     .layer(axum::middleware::from_fn_with_state(auth_state, require_auth));
//! ```
//!
//! Requests that fail verification are answered with the [`AuthError`]
//! response and never reach the inner service.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::instrument;

use super::context::bind_claims;
use super::error::AuthError;
use super::verifier::TokenVerifier;

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    pub verifier: Arc<TokenVerifier>,
}

impl AuthState {
    pub fn new(verifier: Arc<TokenVerifier>) -> Self {
        Self { verifier }
    }
}

/// Verify the bearer token and bind the subject and roles to the request.
#[instrument(skip_all, name = "auth.middleware")]
pub async fn require_auth(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let authorization = match request.headers().get(AUTHORIZATION) {
        None => None,
        Some(value) => match value.to_str() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::debug!("Authorization header is not valid ASCII");
                return AuthError::MalformedHeader.into_response();
            }
        },
    };

    match state.verifier.verify(authorization).await {
        Ok(claims) => {
            bind_claims(request.extensions_mut(), claims);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}
