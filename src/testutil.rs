// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for unit tests: RSA signing keys, a token builder and an
//! in-memory key source.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};

use crate::auth::jwks::{KeySet, KeySetError, KeySource, SigningKey};

pub const ISSUER: &str = "https://idp.example.com/realms/events";
pub const AUDIENCE: &str = "events-api";

pub const PRIMARY_KID: &str = "primary-2026";
pub const ROTATED_KID: &str = "rotated-2026";
pub const PUBLIC_EXPONENT: &str = "AQAB";

pub const PRIMARY_PEM: &str = include_str!("../tests/fixtures/signing_key_primary.pem");
pub const ROTATED_PEM: &str = include_str!("../tests/fixtures/signing_key_rotated.pem");

pub const PRIMARY_MODULUS: &str = "0ArBmDjg6MAbZxu-_YYRPzjEUZADjmyi5wzIzm4pVZkAz7UpYlduhHIOXeWbN1TvT818Om9t5kSdW1sm_FELumgFsjbVeqLJJOIL3vDLNhes6u6b_AaP9a6zRBNq8s155bczVUgDFK1GroQJWMTQi9UmlZR56-csiJnT2tjZ2a65d3n2YvQH32UzkxDLBz3XHLvkbq-Ezhcwau3UOSzYfGdQCoBtWTwRD6F2VyjKs2MhAkgoNHGKUTiObp_FPkLPWK1uT03_XTyZjuVbfpijnPqPRh5_szqDsrrwbzwxGS9R0dzp-qa6QeGIVn2WkHFhYoXTL_l4s2Fmppf3oOWjtw";
pub const ROTATED_MODULUS: &str = "pbHTKDRoH_h6TXH7DXualab0JRvq8OgvzkFVRWKpwmzwckMniW5kflCbB-EOlGfScB3ZG5lWx_czI5L08bDa2au4UwJ6-PehGe7TSMU_W2D00Ox7J9TWpf4fifLj_OpOjQi3HXCVeBy-ILWIYJV0ozUwzzyK_1RJjXmfZMWLmsQOVgj7Xdv4B8oh-zChOzQchqWjOy6jg1QJfjHfsFVxupMdJV_AgyK3qzqm2KFdVsvUUkriQ5Z7phVuKzOI4gkQ0OxVpsuVZAQDhfo74ioLSvBpVXSWe1vOhB5RA_fH6rOlGztYFRBfMBZ1t0o39NX46aRpsAoHLL_IpfaVR1fosQ";

pub fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Claims of a token that passes every check with the default verifier.
pub fn valid_claims() -> Value {
    json!({
        "iss": ISSUER,
        "sub": "user-123",
        "aud": AUDIENCE,
        "azp": "events-frontend",
        "exp": now_secs() + 600,
        "nbf": now_secs() - 60,
        "iat": now_secs() - 60,
        "realm_access": { "roles": ["Organiser", "offline_access"] }
    })
}

/// Sign `claims` with an RSA key from PEM.
pub fn sign_token_with(pem: &str, kid: Option<&str>, algorithm: Algorithm, claims: &Value) -> String {
    let mut header = Header::new(algorithm);
    header.kid = kid.map(str::to_string);
    let key = EncodingKey::from_rsa_pem(pem.as_bytes()).expect("fixture PEM is valid");
    encode(&header, claims, &key).expect("signing fixture token")
}

/// RS256 token signed with the primary key.
pub fn sign_token(claims: &Value) -> String {
    sign_token_with(PRIMARY_PEM, Some(PRIMARY_KID), Algorithm::RS256, claims)
}

pub fn primary_key() -> SigningKey {
    SigningKey::from_rsa_components(PRIMARY_KID, PRIMARY_MODULUS, PUBLIC_EXPONENT)
        .expect("fixture modulus is valid")
}

pub fn rotated_key() -> SigningKey {
    SigningKey::from_rsa_components(ROTATED_KID, ROTATED_MODULUS, PUBLIC_EXPONENT)
        .expect("fixture modulus is valid")
}

pub fn key_set(keys: impl IntoIterator<Item = SigningKey>) -> KeySet {
    keys.into_iter()
        .map(|k| (k.key_id().to_string(), Arc::new(k)))
        .collect()
}

/// In-memory [`KeySource`] that counts fetches and can be re-pointed at a
/// different key set between calls. An optional delay stands in for a slow
/// provider; pair it with a paused clock.
pub struct FakeKeySource {
    response: Mutex<Result<KeySet, KeySetError>>,
    delay: Mutex<Duration>,
    fetches: AtomicUsize,
}

impl FakeKeySource {
    pub fn serving(keys: KeySet) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Ok(keys)),
            delay: Mutex::new(Duration::ZERO),
            fetches: AtomicUsize::new(0),
        })
    }

    pub fn failing(error: KeySetError) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Err(error)),
            delay: Mutex::new(Duration::ZERO),
            fetches: AtomicUsize::new(0),
        })
    }

    pub fn set_response(&self, response: Result<KeySet, KeySetError>) {
        *self.response.lock().expect("fake key source lock") = response;
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().expect("fake key source lock") = delay;
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeySource for FakeKeySource {
    async fn fetch_keys(&self) -> Result<KeySet, KeySetError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().expect("fake key source lock");
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.response.lock().expect("fake key source lock").clone()
    }
}
