// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::Json;

use crate::auth::{Auth, AuthContext};

/// Get the authenticated caller.
#[utoipa::path(
    get,
    path = "/api/v1/me",
    tag = "Identity",
    responses(
        (status = 200, description = "Authenticated caller", body = AuthContext),
        (status = 401, description = "Missing or invalid bearer token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn me(Auth(caller): Auth) -> Json<AuthContext> {
    Json(caller)
}

/// Get the authenticated caller, if they hold the `Organiser` realm role.
#[utoipa::path(
    get,
    path = "/api/v1/organiser",
    tag = "Identity",
    responses(
        (status = 200, description = "Caller holds the Organiser role", body = AuthContext),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 403, description = "Caller lacks the Organiser role")
    ),
    security(("bearer_auth" = []))
)]
pub async fn organiser(Auth(caller): Auth) -> Json<AuthContext> {
    Json(caller)
}
