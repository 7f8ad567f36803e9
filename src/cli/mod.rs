// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use iptv_client::catalog::Card;
use iptv_client::{ApiClient, CatalogLoader, Config, DetailLoader, FileStorage, LocalCache, SessionStore};

pub mod account;
pub mod browse;
pub mod cache;
pub mod info;
pub mod play;
pub mod profiles;
pub mod search;

pub use account::AccountCommand;
pub use browse::BrowseCommand;
pub use cache::CacheCommand;
pub use info::InfoCommand;
pub use play::PlayCommand;
pub use profiles::{FavouriteCommand, ProfileCommand};
pub use search::SearchCommand;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => anyhow::bail!("Invalid format: {}. Use 'text' or 'json'", s),
        }
    }
}

/// Everything a command needs: the loaded config and a client bound to the
/// persistent session.
pub struct CommandContext {
    pub config: Config,
    pub api: ApiClient,
}

impl CommandContext {
    pub fn new(config: Config) -> Result<Self> {
        let dir = config
            .storage
            .dir
            .clone()
            .or_else(FileStorage::default_dir)
            .context("Could not determine a storage directory; set storage.dir in config.toml")?;
        let storage = Arc::new(
            FileStorage::open(&dir)
                .with_context(|| format!("Failed to open storage at {}", dir.display()))?,
        );

        let session = SessionStore::new(storage.clone());
        let cache = LocalCache::new(storage);
        let api = ApiClient::new(
            &config.server.url,
            session,
            cache,
            Duration::from_secs(config.server.timeout_secs),
        )
        .with_context(|| format!("Invalid server URL: {}", config.server.url))?;

        Ok(Self { config, api })
    }

    pub fn session(&self) -> &SessionStore {
        self.api.session()
    }

    /// Fails unless a session token is stored.
    pub fn require_login(&self) -> Result<()> {
        match self.session().require_token() {
            Ok(_) => Ok(()),
            Err(e) if e.is_unauthenticated() => {
                anyhow::bail!("Not signed in. Run `iptv-client login` first.")
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn catalog(&self) -> CatalogLoader {
        CatalogLoader::new(self.api.clone(), self.config.catalog.clone())
    }

    pub fn details(&self) -> DetailLoader {
        DetailLoader::new(self.api.clone(), self.config.catalog.info_ttl_secs)
    }
}

pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_card(card: &Card) {
    match &card.ext {
        Some(ext) => println!("  [{}] {} ({})", card.id, card.title, ext),
        None => println!("  [{}] {}", card.id, card.title),
    }
}
