// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request-scoped authentication context.
//!
//! After a token verifies, the subject is stored in the request extensions
//! as [`AuthenticatedSubject`]. The realm roles are stored as [`RealmRoles`]
//! only when the token carried at least one, so "no roles claim" and "roles
//! present" stay distinguishable. Readers go through [`AuthContextExt`],
//! whose accessors return `None` for an absent value.

use axum::http::{request::Parts, Extensions, Request};
use serde::Serialize;
use utoipa::ToSchema;

use super::claims::TokenClaims;

/// Subject of the verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedSubject(pub String);

/// Non-empty realm roles of the verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealmRoles(pub Vec<String>);

/// Bind verified claims to the request extensions.
pub fn bind_claims(extensions: &mut Extensions, claims: TokenClaims) {
    extensions.insert(AuthenticatedSubject(claims.subject));
    if !claims.roles.is_empty() {
        extensions.insert(RealmRoles(claims.roles));
    }
}

/// Read access to the authentication context of a request.
pub trait AuthContextExt {
    fn auth_extensions(&self) -> &Extensions;

    /// Subject of the verified token, if the request was authenticated.
    fn subject(&self) -> Option<&str> {
        self.auth_extensions()
            .get::<AuthenticatedSubject>()
            .map(|s| s.0.as_str())
    }

    /// Realm roles, if the verified token carried any.
    fn roles(&self) -> Option<&[String]> {
        self.auth_extensions()
            .get::<RealmRoles>()
            .map(|r| r.0.as_slice())
    }

    fn has_role(&self, role: &str) -> bool {
        self.roles()
            .is_some_and(|roles| roles.iter().any(|r| r == role))
    }
}

impl AuthContextExt for Extensions {
    fn auth_extensions(&self) -> &Extensions {
        self
    }
}

impl AuthContextExt for Parts {
    fn auth_extensions(&self) -> &Extensions {
        &self.extensions
    }
}

impl<B> AuthContextExt for Request<B> {
    fn auth_extensions(&self) -> &Extensions {
        self.extensions()
    }
}

/// Owned snapshot of the authentication context, as handed to handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AuthContext {
    /// Token subject
    #[schema(example = "f1c2d3e4-0000-4000-8000-000000000001")]
    pub subject: String,
    /// Realm roles; omitted when the token carried none
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = json!(["Organiser"]))]
    pub roles: Option<Vec<String>>,
}

impl AuthContext {
    /// Snapshot the context, or `None` if the request was never authenticated.
    pub fn from_extensions(extensions: &Extensions) -> Option<Self> {
        Some(Self {
            subject: extensions.subject()?.to_string(),
            roles: extensions.roles().map(<[String]>::to_vec),
        })
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles
            .as_ref()
            .is_some_and(|roles| roles.iter().any(|r| r == role))
    }
}
