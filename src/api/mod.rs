// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{middleware::from_fn_with_state, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    api::health::{HealthChecks, HealthResponse, MetaResponse, ReadyResponse},
    auth::{require_auth, require_role, AuthContext},
    state::AppState,
};

pub mod health;
pub mod me;

/// Realm role allowed to manage events.
pub const ORGANISER_ROLE: &str = "Organiser";

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/me", get(me::me))
        .route(
            "/organiser",
            get(me::organiser).route_layer(require_role(ORGANISER_ROLE)),
        )
        .route_layer(from_fn_with_state(state.auth.clone(), require_auth));

    Router::new()
        .route("/livez", get(health::liveness))
        .route("/readyz", get(health::readiness))
        .route("/healthz", get(health::readiness))
        .route("/_meta", get(health::meta))
        .nest("/api/v1", v1_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::liveness,
        health::readiness,
        health::meta,
        me::me,
        me::organiser
    ),
    components(
        schemas(
            AuthContext,
            HealthResponse,
            ReadyResponse,
            HealthChecks,
            MetaResponse
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Health", description = "Liveness, readiness and service metadata"),
        (name = "Identity", description = "Authenticated caller")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
