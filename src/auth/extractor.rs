// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for the authenticated caller.
//!
//! Use the `Auth` extractor in handlers behind
//! [`require_auth`](super::middleware::require_auth):
//!
//! ```rust,ignore
//! async fn my_handler(Auth(caller): Auth) -> impl IntoResponse {
//!     // caller.subject, caller.roles
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use super::context::AuthContext;
use super::error::AuthError;

/// The [`AuthContext`] bound by the authentication middleware.
///
/// Rejects with `401 unauthenticated` if the route is not behind the
/// middleware, so a missing layer fails closed.
#[derive(Debug, Clone)]
pub struct Auth(pub AuthContext);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        AuthContext::from_extensions(&parts.extensions)
            .map(Auth)
            .ok_or(AuthError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::context::{AuthenticatedSubject, RealmRoles};
    use axum::http::Request;

    fn parts() -> Parts {
        Request::builder().uri("/test").body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn rejects_request_without_context() {
        let mut parts = parts();
        let result = Auth::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthError::Unauthenticated)));
    }

    #[tokio::test]
    async fn reads_context_from_extensions() {
        let mut parts = parts();
        parts
            .extensions
            .insert(AuthenticatedSubject("user-from-middleware".to_string()));
        parts
            .extensions
            .insert(RealmRoles(vec!["Organiser".to_string()]));

        let Auth(caller) = Auth::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(caller.subject, "user-from-middleware");
        assert!(caller.has_role("Organiser"));
    }

    #[tokio::test]
    async fn roles_stay_absent_when_not_bound() {
        let mut parts = parts();
        parts
            .extensions
            .insert(AuthenticatedSubject("user-1".to_string()));

        let Auth(caller) = Auth::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(caller.roles, None);
    }
}
