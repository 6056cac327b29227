// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, http::Request, response::Response, Router};
use chrono::Utc;
use event_service_auth::{
    api::router,
    auth::{HttpKeySource, KeyCache, TokenVerifier},
    state::AppState,
};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const REALM_PATH: &str = "/realms/events";
pub const KEY_SET_PATH: &str = "/realms/events/protocol/openid-connect/certs";
pub const AUDIENCE: &str = "events-api";

pub const PRIMARY_KID: &str = "primary-2026";
pub const ROTATED_KID: &str = "rotated-2026";

pub const PRIMARY_PEM: &str = include_str!("../fixtures/signing_key_primary.pem");
pub const ROTATED_PEM: &str = include_str!("../fixtures/signing_key_rotated.pem");

pub const PRIMARY_MODULUS: &str = "0ArBmDjg6MAbZxu-_YYRPzjEUZADjmyi5wzIzm4pVZkAz7UpYlduhHIOXeWbN1TvT818Om9t5kSdW1sm_FELumgFsjbVeqLJJOIL3vDLNhes6u6b_AaP9a6zRBNq8s155bczVUgDFK1GroQJWMTQi9UmlZR56-csiJnT2tjZ2a65d3n2YvQH32UzkxDLBz3XHLvkbq-Ezhcwau3UOSzYfGdQCoBtWTwRD6F2VyjKs2MhAkgoNHGKUTiObp_FPkLPWK1uT03_XTyZjuVbfpijnPqPRh5_szqDsrrwbzwxGS9R0dzp-qa6QeGIVn2WkHFhYoXTL_l4s2Fmppf3oOWjtw";
pub const ROTATED_MODULUS: &str = "pbHTKDRoH_h6TXH7DXualab0JRvq8OgvzkFVRWKpwmzwckMniW5kflCbB-EOlGfScB3ZG5lWx_czI5L08bDa2au4UwJ6-PehGe7TSMU_W2D00Ox7J9TWpf4fifLj_OpOjQi3HXCVeBy-ILWIYJV0ozUwzzyK_1RJjXmfZMWLmsQOVgj7Xdv4B8oh-zChOzQchqWjOy6jg1QJfjHfsFVxupMdJV_AgyK3qzqm2KFdVsvUUkriQ5Z7phVuKzOI4gkQ0OxVpsuVZAQDhfo74ioLSvBpVXSWe1vOhB5RA_fH6rOlGztYFRBfMBZ1t0o39NX46aRpsAoHLL_IpfaVR1fosQ";

pub fn issuer(server: &MockServer) -> String {
    format!("{}{}", server.uri(), REALM_PATH)
}

/// Key-set document as the provider publishes it.
pub fn key_set_document(keys: &[(&str, &str)]) -> Value {
    let keys: Vec<Value> = keys
        .iter()
        .map(|(kid, n)| {
            json!({
                "kid": kid,
                "kty": "RSA",
                "alg": "RS256",
                "use": "sig",
                "n": n,
                "e": "AQAB",
                "x5c": ["MIIC..."]
            })
        })
        .collect();
    json!({ "keys": keys })
}

pub fn primary_document() -> Value {
    key_set_document(&[(PRIMARY_KID, PRIMARY_MODULUS)])
}

/// Serve `document` on the key-set endpoint, expecting `calls` fetches.
pub async fn mount_key_set(server: &MockServer, document: Value, calls: u64) {
    Mock::given(method("GET"))
        .and(path(KEY_SET_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(document))
        .expect(calls)
        .mount(server)
        .await;
}

pub fn claims(issuer: &str, roles: Option<&[&str]>) -> Value {
    let now = Utc::now().timestamp();
    let mut claims = json!({
        "iss": issuer,
        "sub": "user-123",
        "aud": "account",
        "azp": AUDIENCE,
        "exp": now + 600,
        "nbf": now - 60,
        "iat": now - 60,
        "typ": "Bearer"
    });
    if let Some(roles) = roles {
        claims["realm_access"] = json!({ "roles": roles });
    }
    claims
}

pub fn sign(pem: &str, kid: &str, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    let key = EncodingKey::from_rsa_pem(pem.as_bytes()).expect("fixture PEM is valid");
    encode(&header, claims, &key).expect("signing fixture token")
}

/// Router wired to the key-set endpoint of `server`.
pub fn app(server: &MockServer, audience: Option<&str>) -> (Router, Arc<KeyCache>) {
    let issuer = issuer(server);
    let source = HttpKeySource::with_timeout(
        format!("{}{}", server.uri(), KEY_SET_PATH),
        false,
        Duration::from_secs(2),
    )
    .expect("key source");
    let keys = Arc::new(KeyCache::new(Arc::new(source)));

    let mut verifier = TokenVerifier::new(keys.clone(), issuer);
    if let Some(audience) = audience {
        verifier = verifier.with_audience(audience);
    }
    (router(AppState::new(Arc::new(verifier))), keys)
}

pub async fn get(app: &Router, uri: &str, token: Option<&str>) -> Response {
    let mut request = Request::builder().uri(uri);
    if let Some(token) = token {
        request = request.header("authorization", format!("Bearer {token}"));
    }
    app.clone()
        .oneshot(request.body(Body::empty()).expect("request"))
        .await
        .expect("infallible")
}

pub async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}
