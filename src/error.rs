// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use thiserror::Error;

/// Errors raised while talking to the backend API or local storage.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Not logged in. Run `iptv-client login` first.")]
    NotAuthenticated,

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid JSON in response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Server answered with a non-2xx status. `message` carries the
    /// `error` field of the body when there was one.
    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Unexpected response shape for {path}")]
    UnexpectedShape { path: String },
}

impl ClientError {
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, ClientError::NotAuthenticated)
            || matches!(self, ClientError::Status { status: 401, .. })
    }
}

/// Failures of the catalog views, worded the way they are shown to the user.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to load categories")]
    Categories(#[source] Option<ClientError>),

    #[error("Failed to load streams")]
    Streams(#[source] Option<ClientError>),

    #[error("Search failed")]
    Search(#[source] Option<ClientError>),

    #[error("Failed to load details")]
    Details(#[source] Option<ClientError>),
}

/// Failures of account, profile and favourite operations.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Enter email & password")]
    MissingCredentials,

    #[error("All IPTV fields are required.")]
    MissingIptvFields,

    #[error("Create a profile first")]
    NoProfileSelected,

    #[error("Profile name is required")]
    MissingProfileName,

    /// Server refused the operation; holds the server's message or the
    /// operation's default text.
    #[error("{0}")]
    Rejected(String),

    #[error("Network error")]
    Network(#[source] ClientError),
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Playback error")]
    Exhausted { attempted: Vec<String> },

    #[error("Player backend failed: {0}")]
    Backend(String),

    #[error(transparent)]
    Client(#[from] ClientError),
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
