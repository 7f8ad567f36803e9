// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use super::{CommandContext, spinner};
use anyhow::Result;

pub enum CacheCommand {
    Warm,
    Clear,
}

impl CacheCommand {
    pub async fn execute(self, context: CommandContext) -> Result<()> {
        match self {
            Self::Warm => {
                context.require_login()?;
                let pb = spinner("Warming catalog cache...");
                let report = context.catalog().warm_home_cache().await;
                pb.finish_and_clear();

                println!(
                    "Cache warmed: {}/{} stream lists fetched",
                    report.succeeded, report.requested
                );
                if report.failed > 0 {
                    eprintln!("Warning: {} stream list(s) failed to load", report.failed);
                }
            }
            Self::Clear => {
                let removed = context.api.cache().clear()?;
                println!("Cache cleared ({} entries)", removed);
            }
        }

        Ok(())
    }
}
