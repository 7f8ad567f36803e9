// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use super::{CommandContext, OutputFormat, print_card, print_json, spinner};
use anyhow::Result;
use iptv_client::CatalogError;
use iptv_client::catalog::CatalogRow;
use iptv_client::models::ContentType;
use serde_json::json;

/// Browses the catalog. Without a content type it shows the home screen;
/// with a category it shows that category in full.
pub struct BrowseCommand {
    pub content_type: Option<ContentType>,
    pub category: Option<String>,
    pub refresh: bool,
    pub format: OutputFormat,
}

fn section_title(content_type: ContentType) -> &'static str {
    match content_type {
        ContentType::Vod => "Movies",
        ContentType::Series => "TV Shows",
        ContentType::Live => "Live TV",
    }
}

fn print_rows(title: &str, rows: &Result<Vec<CatalogRow>, CatalogError>) {
    println!("\n== {} ==", title);
    match rows {
        Ok(rows) => {
            for row in rows {
                let see_all = if row.see_all { "  (see all)" } else { "" };
                println!(
                    "\n{} [{}]{}",
                    row.category.category_name, row.category.category_id, see_all
                );
                for card in &row.cards {
                    print_card(card);
                }
            }
        }
        Err(e) => println!("{}", e),
    }
}

fn rows_json(rows: &Result<Vec<CatalogRow>, CatalogError>) -> serde_json::Value {
    match rows {
        Ok(rows) => json!(rows),
        Err(e) => json!({ "error": e.to_string() }),
    }
}

impl BrowseCommand {
    pub async fn execute(self, context: CommandContext) -> Result<()> {
        context.require_login()?;
        let catalog = context.catalog();

        match (self.content_type, self.category) {
            (None, _) => {
                if self.refresh {
                    context.api.cache().clear()?;
                }
                let pb = spinner("Loading home...");
                let home = catalog.build_home_rows().await;
                pb.finish_and_clear();

                match self.format {
                    OutputFormat::Json => print_json(&json!({
                        "movies": rows_json(&home.movies),
                        "series": rows_json(&home.series),
                        "live": rows_json(&home.live),
                    }))?,
                    OutputFormat::Text => {
                        print_rows(section_title(ContentType::Vod), &home.movies);
                        print_rows(section_title(ContentType::Series), &home.series);
                        print_rows(section_title(ContentType::Live), &home.live);
                    }
                }
            }
            (Some(content_type), None) => {
                let pb = spinner(&format!("Loading {}...", section_title(content_type)));
                let rows = catalog.load_rows(content_type, self.refresh).await;
                pb.finish_and_clear();

                match self.format {
                    OutputFormat::Json => print_json(&rows_json(&rows))?,
                    OutputFormat::Text => print_rows(section_title(content_type), &rows),
                }
            }
            (Some(content_type), Some(category_id)) => {
                let pb = spinner("Loading category...");
                let result = catalog
                    .see_all(content_type, &category_id, self.refresh)
                    .await;
                pb.finish_and_clear();
                let cards = result?;

                match self.format {
                    OutputFormat::Json => print_json(&cards)?,
                    OutputFormat::Text => {
                        println!("{} item(s)", cards.len());
                        for card in &cards {
                            print_card(card);
                        }
                    }
                }
            }
        }

        Ok(())
    }
}
