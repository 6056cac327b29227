// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access token claims.
//!
//! [`RawClaims`] mirrors the JSON payload the provider issues and tolerates
//! its encoding variations (`aud` as string or array, fractional
//! timestamps). [`TokenClaims`] is the validated, strongly typed view handed
//! to the rest of the service.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::error::AuthError;

/// Wire form of the claims we inspect. Unknown claims are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawClaims {
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub aud: Option<Audience>,
    /// Authorized party: the client the token was issued to
    #[serde(default)]
    pub azp: Option<String>,
    #[serde(default)]
    pub exp: Option<NumericDate>,
    #[serde(default)]
    pub nbf: Option<NumericDate>,
    #[serde(default)]
    pub realm_access: Option<RealmAccess>,
}

/// `aud` may be a single string or an array of strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Audience {
    One(String),
    Many(Vec<String>),
}

/// Seconds since the epoch, integral or fractional.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub(crate) enum NumericDate {
    Seconds(i64),
    Fractional(f64),
}

impl NumericDate {
    fn to_datetime(self) -> Option<DateTime<Utc>> {
        let seconds = match self {
            NumericDate::Seconds(s) => s,
            NumericDate::Fractional(f) if f.is_finite() => f.floor() as i64,
            NumericDate::Fractional(_) => return None,
        };
        DateTime::from_timestamp(seconds, 0)
    }
}

/// Realm-level role assignments.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RealmAccess {
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Verified claims of one access token.
///
/// Produced fresh by every verification and valid only for the request that
/// carried the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub issuer: String,
    pub subject: String,
    pub audiences: BTreeSet<String>,
    pub authorized_party: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub not_before: Option<DateTime<Utc>>,
    /// Realm roles in token order; empty when the token carries none
    pub roles: Vec<String>,
}

impl TokenClaims {
    /// Whether `expected` is an audience of this token, falling back to the
    /// authorized party for providers that put a generic value in `aud`.
    pub fn accepts_audience(&self, expected: &str) -> bool {
        self.audiences.contains(expected) || self.authorized_party.as_deref() == Some(expected)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

impl TryFrom<RawClaims> for TokenClaims {
    type Error = AuthError;

    fn try_from(raw: RawClaims) -> Result<Self, Self::Error> {
        let audiences = match raw.aud {
            None => BTreeSet::new(),
            Some(Audience::One(aud)) => BTreeSet::from([aud]),
            Some(Audience::Many(auds)) => auds.into_iter().collect(),
        };

        let expires_at = raw
            .exp
            .map(|d| d.to_datetime().ok_or(AuthError::MalformedToken))
            .transpose()?;
        let not_before = raw
            .nbf
            .map(|d| d.to_datetime().ok_or(AuthError::MalformedToken))
            .transpose()?;

        Ok(Self {
            issuer: raw.iss.unwrap_or_default(),
            subject: raw.sub.unwrap_or_default(),
            audiences,
            authorized_party: raw.azp.filter(|azp| !azp.is_empty()),
            expires_at,
            not_before,
            roles: raw.realm_access.map(|r| r.roles).unwrap_or_default(),
        })
    }
}
