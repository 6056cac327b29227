// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer token authentication against an OpenID Connect provider.
//!
//! ## Auth Flow
//!
//! 1. Client sends `Authorization: Bearer <access token>`
//! 2. [`require_auth`] hands the header to the [`TokenVerifier`], which:
//!    - resolves the signing key by `kid` through the [`KeyCache`], fetching
//!      the provider's key set on a miss
//!    - verifies the RSA signature, validity window, issuer and audience
//! 3. The subject and realm roles are bound to the request extensions
//! 4. [`require_role`] gates routes on a realm role; handlers read the caller
//!    with the [`Auth`] extractor
//!
//! ## Security
//!
//! - Only RSA signature algorithms are accepted
//! - Verification failures answer 401, role refusals answer 403
//! - Key-set fetches are time-bounded

pub mod cache;
pub mod claims;
pub mod context;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod middleware;
pub mod roles;
pub mod verifier;

pub use cache::KeyCache;
pub use claims::TokenClaims;
pub use context::{AuthContext, AuthContextExt};
pub use error::AuthError;
pub use extractor::Auth;
pub use jwks::{HttpKeySource, KeySetError, KeySource, SigningKey};
pub use middleware::{require_auth, AuthState};
pub use roles::{require_role, RequireRoleLayer};
pub use verifier::TokenVerifier;
