// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use anyhow::Result;
use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use iptv_client::Config;
use iptv_client::catalog::SearchKind;
use iptv_client::models::ContentType;

mod cli;
use cli::{
    AccountCommand, BrowseCommand, CacheCommand, CommandContext, FavouriteCommand, InfoCommand,
    OutputFormat, PlayCommand, ProfileCommand, SearchCommand,
};

fn cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Green.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Cyan.on_default())
}

#[derive(Parser)]
#[command(name = "iptv-client")]
#[command(about = "Browse and play an IPTV catalog served by an iptv backend")]
#[command(version)]
#[command(styles = cargo_style())]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug logging to file (iptv_client_debug.log)
    #[arg(long, global = true)]
    debug_log: bool,

    /// Backend server URL (overrides config and IPTV_CLIENT_SERVER)
    #[arg(short, long, global = true)]
    server: Option<String>,

    /// Path to config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(short, long, global = true, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session token
    Login { email: Option<String> },

    /// Create an account and sign in
    Register { email: Option<String> },

    /// Forget the session, selected profile and cached responses
    Logout,

    /// Manage the IPTV provider linked to the account
    #[command(subcommand)]
    Iptv(IptvSubcommand),

    /// Manage profiles
    #[command(subcommand)]
    Profiles(ProfileSubcommand),

    /// Manage My List of the selected profile
    #[command(subcommand)]
    Favourites(FavouriteSubcommand),

    /// Browse the catalog (home screen when no type is given)
    Browse {
        /// Content type (live, vod, series)
        r#type: Option<String>,
        /// Show every item of this category
        #[arg(short, long)]
        category: Option<String>,
        /// Bypass the cache for this request
        #[arg(short, long)]
        refresh: bool,
    },

    /// Search the catalog
    Search {
        query: String,
        /// Content type to search (all, live, vod, series)
        #[arg(short = 't', long, default_value = "all")]
        r#type: String,
        /// Bypass the cache for this request
        #[arg(short, long)]
        refresh: bool,
    },

    /// Show details of a movie, series or channel
    Info {
        r#type: String,
        id: String,
        #[arg(long)]
        title: Option<String>,
        /// Container extension of a movie
        #[arg(long)]
        ext: Option<String>,
        /// Season to list episodes for
        #[arg(long)]
        season: Option<u32>,
        /// Add the item to My List
        #[arg(long)]
        add: bool,
    },

    /// Play an item, falling back across sources until one starts
    Play {
        r#type: String,
        id: String,
        #[arg(long)]
        ext: Option<String>,
        #[arg(long)]
        title: Option<String>,
    },

    /// Manage the local response cache
    #[command(subcommand)]
    Cache(CacheSubcommand),

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigSubcommand),
}

#[derive(Subcommand)]
enum IptvSubcommand {
    /// Save IPTV provider credentials
    Set {
        #[arg(long)]
        server_url: Option<String>,
        #[arg(long)]
        username: Option<String>,
    },
    /// Ask the backend to refresh provider data
    Refresh,
    /// Check whether a provider is configured
    Status,
}

#[derive(Subcommand)]
enum ProfileSubcommand {
    /// List profiles
    List,
    /// Create a profile
    Create { name: String },
    /// Select the active profile
    Select { id: String },
    /// Show a profile with its lists (selected profile by default)
    Show { id: Option<String> },
    /// Delete a profile
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum FavouriteSubcommand {
    /// Add an item to My List
    Add {
        r#type: String,
        id: String,
        title: String,
        #[arg(long)]
        thumbnail: Option<String>,
    },
    /// Remove an entry from My List by its favourite id
    Remove { id: String },
}

#[derive(Subcommand)]
enum CacheSubcommand {
    /// Prefetch categories and the first stream lists
    Warm,
    /// Clear cached responses
    Clear,
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// Print the path of the config file
    Path,
    /// Print the effective configuration
    Show,
    /// Write the default configuration file
    Init {
        #[arg(long)]
        force: bool,
    },
}

fn parse_content_type(value: &str) -> Result<ContentType> {
    value.parse().map_err(|e: String| anyhow::anyhow!(e))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    if cli.debug_log {
        let file = File::create("iptv_client_debug.log")?;
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_level(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(file_layer)
            .with(
                EnvFilter::from_default_env()
                    .add_directive("iptv_client=debug".parse()?)
                    .add_directive("hyper_util=error".parse()?),
            )
            .init();
    } else if cli.verbose {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                EnvFilter::from_default_env()
                    .add_directive(tracing::Level::DEBUG.into())
                    .add_directive("hyper_util=error".parse()?),
            )
            .init();
    } else if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                EnvFilter::from_default_env().add_directive("hyper_util=error".parse()?),
            )
            .init();
    }

    // Load configuration
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_default(&config_path);
    if let Some(server) = cli.server {
        config.server.url = server;
    }

    let format = OutputFormat::from_str(&cli.format)?;

    if let Commands::Config(cmd) = &cli.command {
        match cmd {
            ConfigSubcommand::Path => println!("{}", config_path.display()),
            ConfigSubcommand::Show => print!("{}", toml::to_string_pretty(&config)?),
            ConfigSubcommand::Init { force } => {
                if config_path.exists() && !force {
                    anyhow::bail!(
                        "{} already exists (use --force to overwrite)",
                        config_path.display()
                    );
                }
                Config::default().save(&config_path)?;
                println!("Wrote {}", config_path.display());
            }
        }
        return Ok(());
    }

    let context = CommandContext::new(config)?;

    // Execute command
    match cli.command {
        Commands::Login { email } => AccountCommand::Login { email }.execute(context).await?,
        Commands::Register { email } => {
            AccountCommand::Register { email }.execute(context).await?
        }
        Commands::Logout => AccountCommand::Logout.execute(context).await?,
        Commands::Iptv(cmd) => {
            let cmd = match cmd {
                IptvSubcommand::Set {
                    server_url,
                    username,
                } => AccountCommand::IptvSet {
                    server_url,
                    username,
                },
                IptvSubcommand::Refresh => AccountCommand::IptvRefresh,
                IptvSubcommand::Status => AccountCommand::IptvStatus,
            };
            cmd.execute(context).await?;
        }
        Commands::Profiles(cmd) => {
            let cmd = match cmd {
                ProfileSubcommand::List => ProfileCommand::List { format },
                ProfileSubcommand::Create { name } => ProfileCommand::Create { name },
                ProfileSubcommand::Select { id } => ProfileCommand::Select { id },
                ProfileSubcommand::Show { id } => ProfileCommand::Show { id, format },
                ProfileSubcommand::Delete { id, yes } => ProfileCommand::Delete { id, yes },
            };
            cmd.execute(context).await?;
        }
        Commands::Favourites(cmd) => {
            let cmd = match cmd {
                FavouriteSubcommand::Add {
                    r#type,
                    id,
                    title,
                    thumbnail,
                } => FavouriteCommand::Add {
                    content_type: parse_content_type(&r#type)?,
                    id,
                    title,
                    thumbnail,
                },
                FavouriteSubcommand::Remove { id } => FavouriteCommand::Remove { id },
            };
            cmd.execute(context).await?;
        }
        Commands::Browse {
            r#type,
            category,
            refresh,
        } => {
            let cmd = BrowseCommand {
                content_type: r#type.as_deref().map(parse_content_type).transpose()?,
                category,
                refresh,
                format,
            };
            cmd.execute(context).await?;
        }
        Commands::Search {
            query,
            r#type,
            refresh,
        } => {
            let kind: SearchKind = r#type.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            let cmd = SearchCommand {
                query,
                kind,
                refresh,
                format,
            };
            cmd.execute(context).await?;
        }
        Commands::Info {
            r#type,
            id,
            title,
            ext,
            season,
            add,
        } => {
            let cmd = InfoCommand {
                content_type: parse_content_type(&r#type)?,
                id,
                title,
                ext,
                season,
                add,
                format,
            };
            cmd.execute(context).await?;
        }
        Commands::Play {
            r#type,
            id,
            ext,
            title,
        } => {
            let cmd = PlayCommand {
                content_type: parse_content_type(&r#type)?,
                id,
                ext,
                title,
            };
            cmd.execute(context).await?;
        }
        Commands::Cache(cmd) => {
            let cmd = match cmd {
                CacheSubcommand::Warm => CacheCommand::Warm,
                CacheSubcommand::Clear => CacheCommand::Clear,
            };
            cmd.execute(context).await?;
        }
        Commands::Config(_) => {}
    }

    Ok(())
}
