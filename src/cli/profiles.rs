// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use super::{CommandContext, OutputFormat, print_json, spinner};
use anyhow::Result;
use inquire::Confirm;
use iptv_client::models::{ContentType, Favourite, NewFavourite};

pub enum ProfileCommand {
    List { format: OutputFormat },
    Create { name: String },
    Select { id: String },
    Show { id: Option<String>, format: OutputFormat },
    Delete { id: String, yes: bool },
}

pub enum FavouriteCommand {
    Add {
        content_type: ContentType,
        id: String,
        title: String,
        thumbnail: Option<String>,
    },
    Remove { id: String },
}

fn print_favourites(heading: &str, items: &[Favourite]) {
    println!("{}:", heading);
    if items.is_empty() {
        println!("  (none)");
    }
    for fav in items {
        println!(
            "  #{} {} [{} {}]",
            fav.id,
            fav.title.as_deref().unwrap_or("Untitled"),
            fav.content_type,
            fav.item_id
        );
    }
}

impl ProfileCommand {
    pub async fn execute(self, context: CommandContext) -> Result<()> {
        context.require_login()?;
        let api = &context.api;

        match self {
            Self::List { format } => {
                let pb = spinner("Loading profiles...");
                let result = api.profiles().await;
                pb.finish_and_clear();
                let profiles = result?;
                let selected = context.session().profile_id();

                match format {
                    OutputFormat::Json => print_json(&profiles)?,
                    OutputFormat::Text => {
                        if profiles.is_empty() {
                            println!("No profiles yet. Create one with `iptv-client profiles create <name>`.");
                        }
                        for profile in &profiles {
                            let marker = if selected.as_deref() == Some(profile.id.as_str()) {
                                "*"
                            } else {
                                " "
                            };
                            println!("{} [{}] {}", marker, profile.id, profile.name);
                        }
                    }
                }
            }
            Self::Create { name } => {
                let profile = api.create_profile(&name).await?;
                println!("Created profile [{}] {}", profile.id, profile.name);
            }
            Self::Select { id } => {
                let profiles = api.profiles().await?;
                let Some(profile) = profiles.iter().find(|p| p.id == id) else {
                    anyhow::bail!("Profile '{}' not found", id);
                };
                context.session().set_profile_id(&profile.id)?;
                println!("Selected profile {}", profile.name);
            }
            Self::Show { id, format } => {
                let id = match id.or_else(|| context.session().profile_id()) {
                    Some(id) => id,
                    None => anyhow::bail!("No profile selected"),
                };
                let pb = spinner("Loading profile...");
                let result = api.profile_detail(&id).await;
                pb.finish_and_clear();
                let detail = result?;

                match format {
                    OutputFormat::Json => print_json(&detail)?,
                    OutputFormat::Text => {
                        println!("[{}] {}", detail.id, detail.name);
                        print_favourites("My List", &detail.favourites);
                        print_favourites("Recently watched", &detail.recently_watched);
                    }
                }
            }
            Self::Delete { id, yes } => {
                let confirmed = yes
                    || Confirm::new(&format!("Delete profile {}?", id))
                        .with_default(false)
                        .prompt()?;
                if !confirmed {
                    println!("Cancelled");
                    return Ok(());
                }
                api.delete_profile(&id).await?;
                println!("Deleted profile {}", id);
            }
        }

        Ok(())
    }
}

impl FavouriteCommand {
    pub async fn execute(self, context: CommandContext) -> Result<()> {
        context.require_login()?;
        let api = &context.api;

        match self {
            Self::Add {
                content_type,
                id,
                title,
                thumbnail,
            } => {
                let favourite = NewFavourite {
                    content_type: content_type.as_str().to_string(),
                    item_id: id,
                    title,
                    thumbnail: thumbnail.unwrap_or_default(),
                };
                let fid = api.add_favourite(&favourite).await?;
                println!("Added to My List (#{})", fid);
            }
            Self::Remove { id } => {
                api.remove_favourite(&id).await?;
                println!("Removed #{} from My List", id);
            }
        }

        Ok(())
    }
}
