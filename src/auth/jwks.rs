// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signing key source: fetching and decoding the provider's key set.
//!
//! The identity provider publishes its public signing keys as a JSON Web Key
//! Set at `<issuer>/protocol/openid-connect/certs`. [`HttpKeySource`] performs
//! one time-bounded GET per call and turns every usable RSA entry into a
//! [`SigningKey`]. It keeps no state; [`KeyCache`](super::KeyCache) decides
//! when to call it.
//!
//! ## Decoding rules
//!
//! - Entries whose `kty` is not `RSA` are skipped silently
//! - `n` and `e` are base64url (unpadded) big-endian integers
//! - An entry that fails to decode is skipped; the rest of the set survives
//! - A set with no usable RSA key at all is an error

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64ct::{Base64UrlUnpadded, Encoding};
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Path appended to the issuer URL to reach the key set.
pub const KEY_SET_PATH: &str = "/protocol/openid-connect/certs";

/// Upper bound on a single key-set fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Decoded keys by key identifier.
pub type KeySet = HashMap<String, Arc<SigningKey>>;

/// Failures fetching or resolving signing keys.
#[derive(Debug, Clone, thiserror::Error)]
pub enum KeySetError {
    /// The source could not be constructed (empty endpoint, HTTP client setup)
    #[error("invalid key set source: {0}")]
    InvalidSource(String),

    /// Transport failure or non-success HTTP status
    #[error("failed to fetch key set: {0}")]
    Fetch(String),

    #[error("key set fetch timed out after {0:?}")]
    Timeout(Duration),

    /// Body was not a key-set JSON document
    #[error("failed to decode key set: {0}")]
    Decode(String),

    #[error("no usable RSA keys in key set")]
    NoUsableKeys,

    /// Key set fetched, but the requested kid is not in it
    #[error("no signing key found for kid {0:?}")]
    UnknownKeyId(String),
}

/// Why a single key-set entry was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyDecodeError {
    #[error("missing RSA component {0:?}")]
    MissingComponent(&'static str),

    #[error("RSA modulus is not valid base64url")]
    InvalidModulusEncoding,

    #[error("RSA exponent is not valid base64url")]
    InvalidExponentEncoding,

    #[error("RSA modulus is zero")]
    EmptyModulus,

    #[error("RSA exponent must be a positive integer that fits in 64 bits")]
    InvalidExponent,
}

/// Key-set document as served by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct JwkSetDocument {
    #[serde(default)]
    pub keys: Vec<Jwk>,
}

/// One entry of the key-set document.
///
/// Only the fields needed to build an RSA verification key are read; other
/// members (`x5c`, `x5t`, ...) are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    #[serde(default)]
    pub kid: String,
    #[serde(default)]
    pub kty: String,
    #[serde(default)]
    pub alg: Option<String>,
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
    /// Modulus (base64url)
    #[serde(default)]
    pub n: Option<String>,
    /// Public exponent (base64url)
    #[serde(default)]
    pub e: Option<String>,
}

/// Key family of a [`SigningKey`]. Only RSA keys are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    Rsa,
}

/// A decoded public signing key. Immutable once constructed.
#[derive(Clone)]
pub struct SigningKey {
    key_id: String,
    algorithm: KeyAlgorithm,
    /// Big-endian magnitude, no leading zero bytes
    modulus: Vec<u8>,
    public_exponent: u64,
    decoding_key: DecodingKey,
}

impl SigningKey {
    /// Build an RSA key from base64url-encoded modulus and exponent.
    pub fn from_rsa_components(
        key_id: impl Into<String>,
        modulus_b64: &str,
        exponent_b64: &str,
    ) -> Result<Self, KeyDecodeError> {
        let modulus = Base64UrlUnpadded::decode_vec(modulus_b64)
            .map_err(|_| KeyDecodeError::InvalidModulusEncoding)?;
        let exponent = Base64UrlUnpadded::decode_vec(exponent_b64)
            .map_err(|_| KeyDecodeError::InvalidExponentEncoding)?;

        let modulus = strip_leading_zeros(&modulus);
        if modulus.is_empty() {
            return Err(KeyDecodeError::EmptyModulus);
        }

        let exponent = strip_leading_zeros(&exponent);
        let public_exponent = exponent_value(exponent)?;

        Ok(Self {
            key_id: key_id.into(),
            algorithm: KeyAlgorithm::Rsa,
            decoding_key: DecodingKey::from_rsa_raw_components(modulus, exponent),
            modulus: modulus.to_vec(),
            public_exponent,
        })
    }

    /// Build a key from a key-set entry.
    pub fn from_jwk(jwk: &Jwk) -> Result<Self, KeyDecodeError> {
        let n = jwk
            .n
            .as_deref()
            .ok_or(KeyDecodeError::MissingComponent("n"))?;
        let e = jwk
            .e
            .as_deref()
            .ok_or(KeyDecodeError::MissingComponent("e"))?;
        Self::from_rsa_components(jwk.kid.clone(), n, e)
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    /// Modulus as big-endian bytes.
    pub fn modulus(&self) -> &[u8] {
        &self.modulus
    }

    /// Modulus size in bits.
    pub fn modulus_bits(&self) -> usize {
        // strip_leading_zeros guarantees a non-zero first byte
        let leading = self.modulus.first().map_or(0, |b| b.leading_zeros() as usize);
        self.modulus.len() * 8 - leading
    }

    pub fn public_exponent(&self) -> u64 {
        self.public_exponent
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("key_id", &self.key_id)
            .field("algorithm", &self.algorithm)
            .field("modulus_bits", &self.modulus_bits())
            .field("public_exponent", &self.public_exponent)
            .finish()
    }
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

fn exponent_value(bytes: &[u8]) -> Result<u64, KeyDecodeError> {
    if bytes.is_empty() || bytes.len() > 8 {
        return Err(KeyDecodeError::InvalidExponent);
    }
    Ok(bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
}

/// Turn a key-set document into a [`KeySet`], skipping unusable entries.
pub fn decode_key_set(document: JwkSetDocument) -> Result<KeySet, KeySetError> {
    let mut keys = KeySet::new();

    for jwk in &document.keys {
        if !jwk.kty.eq_ignore_ascii_case("RSA") {
            continue;
        }
        if jwk.kid.is_empty() {
            warn!("Skipping RSA key without kid");
            continue;
        }
        match SigningKey::from_jwk(jwk) {
            Ok(key) => {
                keys.insert(jwk.kid.clone(), Arc::new(key));
            }
            Err(e) => {
                warn!(kid = %jwk.kid, error = %e, "Skipping undecodable RSA key");
            }
        }
    }

    if keys.is_empty() {
        return Err(KeySetError::NoUsableKeys);
    }
    Ok(keys)
}

/// Key-set URL for an issuer.
pub fn key_set_url(issuer: &str) -> String {
    format!("{}{}", issuer.trim().trim_end_matches('/'), KEY_SET_PATH)
}

/// Source of the provider's current signing keys.
///
/// Implementations return the full current set on every call.
#[async_trait]
pub trait KeySource: Send + Sync {
    async fn fetch_keys(&self) -> Result<KeySet, KeySetError>;
}

/// Fetches the key set over HTTPS.
#[derive(Clone)]
pub struct HttpKeySource {
    endpoint: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpKeySource {
    /// Create a source for a key-set endpoint.
    ///
    /// `skip_tls_verify` disables certificate verification and is meant for
    /// development against self-signed providers only.
    pub fn new(endpoint: impl Into<String>, skip_tls_verify: bool) -> Result<Self, KeySetError> {
        Self::with_timeout(endpoint, skip_tls_verify, DEFAULT_FETCH_TIMEOUT)
    }

    /// Create a source for the key set of `issuer`.
    pub fn for_issuer(issuer: &str, skip_tls_verify: bool) -> Result<Self, KeySetError> {
        Self::new(key_set_url(issuer), skip_tls_verify)
    }

    /// Create with a custom fetch timeout.
    pub fn with_timeout(
        endpoint: impl Into<String>,
        skip_tls_verify: bool,
        timeout: Duration,
    ) -> Result<Self, KeySetError> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(KeySetError::InvalidSource(
                "key set endpoint is empty".to_string(),
            ));
        }

        if skip_tls_verify {
            warn!(url = %endpoint, "TLS certificate verification disabled for key set fetch");
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(skip_tls_verify)
            .build()
            .map_err(|e| KeySetError::InvalidSource(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            endpoint,
            timeout,
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn classify(&self, error: reqwest::Error) -> KeySetError {
        if error.is_timeout() {
            KeySetError::Timeout(self.timeout)
        } else {
            KeySetError::Fetch(error.to_string())
        }
    }
}

#[async_trait]
impl KeySource for HttpKeySource {
    async fn fetch_keys(&self) -> Result<KeySet, KeySetError> {
        debug!(url = %self.endpoint, "Fetching signing key set");

        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(KeySetError::Fetch(format!(
                "HTTP {status} from key set endpoint"
            )));
        }

        let body = response.bytes().await.map_err(|e| self.classify(e))?;
        let document: JwkSetDocument =
            serde_json::from_slice(&body).map_err(|e| KeySetError::Decode(e.to_string()))?;

        let keys = decode_key_set(document)?;
        info!(url = %self.endpoint, key_count = keys.len(), "Fetched signing key set");
        Ok(keys)
    }
}
