// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Realm role gate.
//!
//! [`require_role`] builds a tower layer that lets a request through only if
//! the authentication middleware bound a role list containing the required
//! role. It must sit inside [`require_auth`](super::middleware::require_auth):
//!
//! ```rust,ignore
//! Router::new()
//!     .route("/events", post(create_event).route_layer(require_role("Organiser")))
//!     .layer(axum::middleware::from_fn_with_state(auth_state, require_auth));
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    extract::Request,
    response::{IntoResponse, Response},
};
use tower::{Layer, Service};
use tracing::debug;

use super::context::AuthContextExt;
use super::error::AuthError;

/// Gate requests on the realm role `role`.
pub fn require_role(role: impl Into<String>) -> RequireRoleLayer {
    RequireRoleLayer {
        role: Arc::from(role.into()),
    }
}

/// Layer produced by [`require_role`].
#[derive(Debug, Clone)]
pub struct RequireRoleLayer {
    role: Arc<str>,
}

impl RequireRoleLayer {
    pub fn role(&self) -> &str {
        &self.role
    }
}

impl<S> Layer<S> for RequireRoleLayer {
    type Service = RequireRole<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequireRole {
            inner,
            role: self.role.clone(),
        }
    }
}

/// Service produced by [`RequireRoleLayer`].
#[derive(Debug, Clone)]
pub struct RequireRole<S> {
    inner: S,
    role: Arc<str>,
}

impl<S> Service<Request> for RequireRole<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        // Absent and empty role lists both fail here
        if request.has_role(&self.role) {
            return Box::pin(self.inner.call(request));
        }

        debug!(
            required_role = %self.role,
            subject = request.subject().unwrap_or_default(),
            "Required role not held"
        );
        let response = AuthError::Forbidden {
            required_role: self.role.to_string(),
        }
        .into_response();
        Box::pin(async move { Ok(response) })
    }
}
