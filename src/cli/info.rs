// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use super::{CommandContext, OutputFormat, print_json, spinner};
use anyhow::Result;
use iptv_client::catalog::{Card, NO_IMAGE};
use iptv_client::detail::AboutView;
use iptv_client::models::ContentType;

/// Shows the detail view of one item, optionally adding it to My List.
pub struct InfoCommand {
    pub content_type: ContentType,
    pub id: String,
    pub title: Option<String>,
    pub ext: Option<String>,
    pub season: Option<u32>,
    pub add: bool,
    pub format: OutputFormat,
}

fn print_view(view: &AboutView, season: Option<u32>) {
    println!("{}", view.title);
    let meta: Vec<&str> = [view.year.as_str(), view.quality.as_str()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect();
    if !meta.is_empty() {
        println!("{}", meta.join(" | "));
    }
    println!("\n{}", view.overview);

    let play = view.play_request();
    println!(
        "\nPlay: iptv-client play {} {} --ext {}",
        play.kind, play.id, play.ext
    );

    let Some(seasons) = &view.seasons else {
        return;
    };
    let shown = match season {
        Some(number) => view.season(number),
        None => seasons.first(),
    };

    println!("\nSeasons:");
    for s in seasons {
        let marker = if shown.is_some_and(|shown| shown.number == s.number) {
            "*"
        } else {
            " "
        };
        println!(
            "{} {} ({} episodes)",
            marker,
            s.label,
            s.episodes.len()
        );
    }

    if let Some(shown) = shown {
        println!("\n{}:", shown.label);
        for episode in &shown.episodes {
            println!("  [{}] {}", episode.id, episode.title);
        }
    }
}

impl InfoCommand {
    pub async fn execute(self, context: CommandContext) -> Result<()> {
        context.require_login()?;
        let details = context.details();

        let card = Card {
            kind: self.content_type,
            id: self.id.clone(),
            title: self.title.unwrap_or_else(|| format!("#{}", self.id)),
            thumb: NO_IMAGE.to_string(),
            ext: match self.content_type {
                ContentType::Vod => Some(self.ext.unwrap_or_else(|| "mp4".to_string())),
                _ => None,
            },
        };

        let pb = spinner("Loading details...");
        let result = details.open(&card).await;
        pb.finish_and_clear();
        let view = result?;

        match self.format {
            OutputFormat::Json => print_json(&view)?,
            OutputFormat::Text => print_view(&view, self.season),
        }

        if self.add {
            let fid = details.add_to_list(&view).await?;
            println!("Added to My List (#{})", fid);
        }

        Ok(())
    }
}
