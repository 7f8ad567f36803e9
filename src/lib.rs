// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

pub mod api;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod detail;
pub mod error;
pub mod models;
pub mod playback;
pub mod player;
pub mod session;
pub mod storage;

pub use api::ApiClient;
pub use cache::LocalCache;
pub use catalog::CatalogLoader;
pub use config::Config;
pub use detail::DetailLoader;
pub use error::{AccountError, CatalogError, ClientError, PlaybackError};
pub use playback::PlaybackController;
pub use player::{MediaBackend, MpvBackend};
pub use session::SessionStore;
pub use storage::{FileStorage, MemoryStorage, Storage};
