// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use super::{CommandContext, OutputFormat, print_card, print_json, spinner};
use anyhow::Result;
use iptv_client::catalog::SearchKind;

pub struct SearchCommand {
    pub query: String,
    pub kind: SearchKind,
    pub refresh: bool,
    pub format: OutputFormat,
}

impl SearchCommand {
    pub async fn execute(self, context: CommandContext) -> Result<()> {
        context.require_login()?;
        if self.query.trim().is_empty() {
            return Ok(());
        }

        let pb = spinner(&format!("Searching for '{}'...", self.query.trim()));
        let result = context
            .catalog()
            .search(&self.query, self.kind, self.refresh)
            .await;
        pb.finish_and_clear();
        let results = result?;

        match self.format {
            OutputFormat::Json => print_json(&results)?,
            OutputFormat::Text => {
                if results.is_empty() {
                    println!("No results found.");
                }
                for group in &results.groups {
                    println!("\n{} ({}):", group.title, group.cards.len());
                    for card in &group.cards {
                        print_card(card);
                    }
                }
            }
        }

        Ok(())
    }
}
