// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use crate::error::{ClientError, Result};
use crate::storage::Storage;
use std::sync::Arc;
use tracing::debug;

const TOKEN_KEY: &str = "token";
const PROFILE_KEY: &str = "profileId";

/// Client-side session state: the bearer token and the selected profile.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn Storage>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("logged_in", &self.token().is_some())
            .finish()
    }
}

impl SessionStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn token(&self) -> Option<String> {
        self.storage
            .get_item(TOKEN_KEY)
            .filter(|token| !token.is_empty())
    }

    /// The auth gate: every authenticated operation goes through here.
    pub fn require_token(&self) -> Result<String> {
        self.token().ok_or(ClientError::NotAuthenticated)
    }

    pub fn set_token(&self, token: &str) -> Result<()> {
        self.storage.set_item(TOKEN_KEY, token)?;
        debug!("Session token stored");
        Ok(())
    }

    pub fn profile_id(&self) -> Option<String> {
        self.storage
            .get_item(PROFILE_KEY)
            .filter(|id| !id.is_empty())
    }

    pub fn set_profile_id(&self, id: &str) -> Result<()> {
        self.storage.set_item(PROFILE_KEY, id)?;
        Ok(())
    }

    /// Forgets everything, cached responses included.
    pub fn logout(&self) -> Result<()> {
        self.storage.clear()?;
        debug!("Session cleared");
        Ok(())
    }
}
