// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Event Service Auth - bearer token verification for the event service
//!
//! Verifies access tokens issued by an OpenID Connect provider against its
//! published RSA signing keys, binds the caller's subject and realm roles to
//! the request, and gates routes on realm roles.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Key set, token verification, middleware and role gate
//! - `config` - Environment configuration
//! - `state` - Shared application state

pub mod api;
pub mod auth;
pub mod config;
pub mod state;

#[cfg(test)]
mod testutil;
