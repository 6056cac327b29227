// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token verification.
//!
//! [`TokenVerifier::verify`] walks a fixed sequence of checks and stops at
//! the first failure:
//!
//! 1. `Authorization` header shape (`Bearer <token>`)
//! 2. Non-empty token
//! 3. Structural parse; RSA-family `alg`; `kid` present
//! 4. Signing key resolution through the [`KeyCache`]
//! 5. Signature
//! 6. `exp` / `nbf` against the current time
//! 7. Issuer
//! 8. Audience, with authorized-party fallback
//! 9. Subject present
//!
//! Steps 1–3 never touch the network.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, Validation};
use serde::Deserialize;
use tracing::debug;

use super::cache::KeyCache;
use super::claims::{RawClaims, TokenClaims};
use super::error::AuthError;
use super::jwks::SigningKey;

/// Tokens above this size are rejected before any decoding.
pub const MAX_TOKEN_SIZE_BYTES: usize = 16 * 1024;

/// Signature algorithms accepted in the token header. Anything else,
/// including HMAC and `none`, is refused before key lookup.
const RSA_ALGORITHMS: [&str; 6] = ["RS256", "RS384", "RS512", "PS256", "PS384", "PS512"];

/// The JOSE header members we read.
#[derive(Debug, Deserialize)]
struct TokenHeader {
    #[serde(default)]
    alg: String,
    #[serde(default)]
    kid: Option<String>,
}

/// Verifies bearer tokens against the provider's signing keys.
pub struct TokenVerifier {
    keys: Arc<KeyCache>,
    issuer: String,
    audience: Option<String>,
    leeway: TimeDelta,
}

impl TokenVerifier {
    /// Create a verifier expecting tokens from `issuer`.
    ///
    /// An empty issuer disables the issuer check.
    pub fn new(keys: Arc<KeyCache>, issuer: impl Into<String>) -> Self {
        Self {
            keys,
            issuer: issuer.into().trim().to_string(),
            audience: None,
            leeway: TimeDelta::zero(),
        }
    }

    /// Require tokens to be meant for `audience`. A blank value leaves the
    /// audience check off.
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        let audience = audience.into().trim().to_string();
        self.audience = (!audience.is_empty()).then_some(audience);
        self
    }

    /// Tolerate clock skew on `exp` and `nbf`.
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = TimeDelta::from_std(leeway).unwrap_or(TimeDelta::zero());
        self
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> Option<&str> {
        self.audience.as_deref()
    }

    pub fn key_cache(&self) -> &Arc<KeyCache> {
        &self.keys
    }

    /// Verify the raw `Authorization` header value of a request.
    pub async fn verify(&self, authorization: Option<&str>) -> Result<TokenClaims, AuthError> {
        self.verify_at(authorization, Utc::now()).await
    }

    /// Verify as of `now`.
    pub async fn verify_at(
        &self,
        authorization: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<TokenClaims, AuthError> {
        let result = self.run_checks(authorization, now).await;
        match &result {
            Ok(claims) => debug!(subject = %claims.subject, "Token verified"),
            Err(AuthError::KeyResolution(source)) => {
                debug!(error_code = "key_resolution_failed", error = %source, "Token rejected");
            }
            Err(e) => debug!(error_code = e.error_code(), error = %e, "Token rejected"),
        }
        result
    }

    async fn run_checks(
        &self,
        authorization: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<TokenClaims, AuthError> {
        let token = bearer_token(authorization)?;

        let (header, _) = parse_unverified(token)?;
        if !RSA_ALGORITHMS.contains(&header.alg.as_str()) {
            return Err(AuthError::UnsupportedAlgorithm(header.alg));
        }
        let kid = header
            .kid
            .filter(|kid| !kid.is_empty())
            .ok_or(AuthError::MissingKeyId)?;

        let key = self.keys.lookup(&kid).await?;

        let raw = verify_signature(token, &header.alg, &key)?;
        let claims = TokenClaims::try_from(raw)?;

        self.check_validity_window(&claims, now)?;
        self.check_issuer(&claims)?;
        self.check_audience(&claims)?;

        if claims.subject.is_empty() {
            return Err(AuthError::MissingSubject);
        }
        Ok(claims)
    }

    fn check_validity_window(
        &self,
        claims: &TokenClaims,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        // A bound pushed past the representable range by the leeway saturates
        if let Some(expires_at) = claims.expires_at {
            let expired = expires_at
                .checked_add_signed(self.leeway)
                .is_some_and(|deadline| deadline <= now);
            if expired {
                return Err(AuthError::TokenExpired);
            }
        }
        if let Some(not_before) = claims.not_before {
            let pending = not_before
                .checked_sub_signed(self.leeway)
                .is_some_and(|start| start > now);
            if pending {
                return Err(AuthError::TokenNotYetValid);
            }
        }
        Ok(())
    }

    fn check_issuer(&self, claims: &TokenClaims) -> Result<(), AuthError> {
        if !self.issuer.is_empty() && !claims.issuer.is_empty() && claims.issuer != self.issuer {
            return Err(AuthError::IssuerMismatch {
                expected: self.issuer.clone(),
                actual: claims.issuer.clone(),
            });
        }
        Ok(())
    }

    fn check_audience(&self, claims: &TokenClaims) -> Result<(), AuthError> {
        match &self.audience {
            Some(expected) if !claims.accepts_audience(expected) => {
                Err(AuthError::AudienceMismatch {
                    expected: expected.clone(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// Extract the token from an `Authorization` header value.
pub fn bearer_token(authorization: Option<&str>) -> Result<&str, AuthError> {
    let value = authorization
        .filter(|v| !v.is_empty())
        .ok_or(AuthError::MissingHeader)?;

    let (scheme, token) = value.split_once(' ').ok_or(AuthError::MalformedHeader)?;
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return Err(AuthError::MalformedHeader);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::EmptyToken);
    }
    Ok(token)
}

/// Split and decode a compact JWS without checking its signature.
fn parse_unverified(token: &str) -> Result<(TokenHeader, RawClaims), AuthError> {
    if token.len() > MAX_TOKEN_SIZE_BYTES {
        return Err(AuthError::MalformedToken);
    }

    let mut sections = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) = (
        sections.next(),
        sections.next(),
        sections.next(),
        sections.next(),
    ) else {
        return Err(AuthError::MalformedToken);
    };
    if signature.is_empty() {
        return Err(AuthError::MalformedToken);
    }

    let header: TokenHeader = decode_section(header)?;
    let claims: RawClaims = decode_section(payload)?;
    Ok((header, claims))
}

fn decode_section<T: for<'de> Deserialize<'de>>(section: &str) -> Result<T, AuthError> {
    let bytes = Base64UrlUnpadded::decode_vec(section).map_err(|_| AuthError::MalformedToken)?;
    serde_json::from_slice(&bytes).map_err(|_| AuthError::MalformedToken)
}

/// Check the signature with `key` and return the signed claims.
fn verify_signature(token: &str, alg: &str, key: &SigningKey) -> Result<RawClaims, AuthError> {
    let algorithm = Algorithm::from_str(alg)
        .map_err(|_| AuthError::UnsupportedAlgorithm(alg.to_string()))?;

    // Temporal, issuer and audience checks are ours, in our order
    let mut validation = Validation::new(algorithm);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<RawClaims>(token, key.decoding_key(), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) | ErrorKind::InvalidToken => {
                AuthError::MalformedToken
            }
            // Anything else means the key did not verify this signature
            _ => AuthError::InvalidSignature,
        })
}
