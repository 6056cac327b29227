// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use axum::extract::FromRef;
use chrono::{DateTime, Utc};

use crate::auth::{AuthState, KeyCache, TokenVerifier};

#[derive(Clone)]
pub struct AppState {
    pub auth: AuthState,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(verifier: Arc<TokenVerifier>) -> Self {
        Self {
            auth: AuthState::new(verifier),
            started_at: Utc::now(),
        }
    }

    pub fn key_cache(&self) -> &Arc<KeyCache> {
        self.auth.verifier.key_cache()
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}
