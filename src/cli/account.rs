// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use super::{CommandContext, spinner};
use anyhow::Result;
use inquire::{Password, PasswordDisplayMode, Text};

pub enum AccountCommand {
    Login { email: Option<String> },
    Register { email: Option<String> },
    Logout,
    IptvSet {
        server_url: Option<String>,
        username: Option<String>,
    },
    IptvRefresh,
    IptvStatus,
}

fn prompt_email(email: Option<String>) -> Result<String> {
    match email {
        Some(email) => Ok(email),
        None => Ok(Text::new("Email:").prompt()?),
    }
}

fn prompt_password(message: &str) -> Result<String> {
    Ok(Password::new(message)
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()?)
}

impl AccountCommand {
    pub async fn execute(self, context: CommandContext) -> Result<()> {
        let api = &context.api;

        match self {
            Self::Login { email } => {
                let email = prompt_email(email)?;
                let password = prompt_password("Password:")?;
                let pb = spinner("Signing in...");
                let result = api.login(&email, &password).await;
                pb.finish_and_clear();
                result?;
                println!("Logged in as {}", email.trim());

                // Land on the IPTV setup step when the account has no
                // provider yet.
                if !api.has_iptv_credentials().await {
                    println!(
                        "No IPTV provider configured. Run `iptv-client iptv set` to add one."
                    );
                }
            }
            Self::Register { email } => {
                let email = prompt_email(email)?;
                let password = prompt_password("Choose a password:")?;
                let pb = spinner("Creating account...");
                let result = api.register(&email, &password).await;
                pb.finish_and_clear();
                result?;
                println!("Account created for {}", email.trim());
                println!("Run `iptv-client iptv set` to add your IPTV provider.");
            }
            Self::Logout => {
                context.session().logout()?;
                println!("Logged out");
            }
            Self::IptvSet {
                server_url,
                username,
            } => {
                context.require_login()?;
                let server_url = match server_url {
                    Some(url) => url,
                    None => Text::new("IPTV server URL:").prompt()?,
                };
                let username = match username {
                    Some(username) => username,
                    None => Text::new("IPTV username:").prompt()?,
                };
                let password = prompt_password("IPTV password:")?;

                let pb = spinner("Saving IPTV credentials...");
                let result = api
                    .save_iptv_credentials(&server_url, &username, &password)
                    .await;
                pb.finish_and_clear();
                result?;
                println!("IPTV credentials saved");
            }
            Self::IptvRefresh => {
                context.require_login()?;
                let pb = spinner("Refreshing IPTV data...");
                let result = api.refresh_iptv().await;
                pb.finish_and_clear();
                if result? {
                    println!("IPTV data refreshed");
                } else {
                    println!("Refresh requested, server did not confirm");
                }
            }
            Self::IptvStatus => {
                context.require_login()?;
                if api.has_iptv_credentials().await {
                    println!("IPTV provider configured");
                } else {
                    println!("No IPTV provider configured");
                }
            }
        }

        Ok(())
    }
}
