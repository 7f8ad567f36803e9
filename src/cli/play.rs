// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use super::{CommandContext, spinner};
use anyhow::{Context, Result};
use iptv_client::models::ContentType;
use iptv_client::playback::PlayRequest;
use iptv_client::playback::chrome::AutoHide;
use iptv_client::player::{MediaEvent, MpvBackend};
use iptv_client::{PlaybackController, PlaybackError};
use std::io::Write;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{Instant, interval};
use tracing::debug;

const CONTROLS_HELP: &str = "Controls: [p]ause  [b]ack 10s  [f]orward 10s  [m]ute  \
v <0-1> volume  g <1-3> boost  s <0-1000> seek  [q]uit";

pub struct PlayCommand {
    pub content_type: ContentType,
    pub id: String,
    pub ext: Option<String>,
    pub title: Option<String>,
}

impl PlayCommand {
    pub async fn execute(self, context: CommandContext) -> Result<()> {
        context.require_login()?;

        let ext = self
            .ext
            .unwrap_or_else(|| context.config.playback.default_ext.clone());
        let title = self.title.unwrap_or_else(|| format!("#{}", self.id));
        let request = PlayRequest::new(self.content_type, &self.id, &title, &ext);

        let backend = MpvBackend::launch(&context.config.player)
            .await
            .context("Failed to start the player")?;
        let mut controller =
            PlaybackController::new(context.api.clone(), backend, context.config.playback.clone());

        let pb = spinner(&format!("Starting {}...", title));
        let result = controller.play(&request).await;
        pb.finish_and_clear();

        let candidate = match result {
            Ok(candidate) => candidate,
            Err(e) => {
                if let PlaybackError::Exhausted { attempted } = &e {
                    for url in attempted {
                        debug!("Attempted: {}", url);
                    }
                }
                let _ = controller.shutdown().await;
                return Err(e.into());
            }
        };

        println!("Playing {} via {} source", title, candidate.origin);
        println!("{}", CONTROLS_HELP);

        let outcome = control_loop(&mut controller).await;
        let _ = controller.close().await;
        controller.shutdown().await?;
        outcome
    }
}

/// Reads commands from stdin while the player runs. The progress line is
/// shown while the controls are visible and hides after a short idle time
/// unless paused.
async fn control_loop(controller: &mut PlaybackController<MpvBackend>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = interval(Duration::from_secs(1));
    let mut auto_hide = AutoHide::new(Instant::now());
    let mut paused = false;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    return Ok(());
                };
                auto_hide.touch(Instant::now());
                let mut parts = line.split_whitespace();
                let command = parts.next().unwrap_or_default();
                let argument = parts.next();

                let result = match (command, argument) {
                    ("", _) => Ok(()),
                    ("q", _) => return Ok(()),
                    ("p", _) => controller.toggle_pause().await.map(|p| {
                        paused = p;
                        println!("{}", if p { "Paused" } else { "Playing" });
                    }),
                    ("b", _) => controller.seek_step(false).await.map(|_| ()),
                    ("f", _) => controller.seek_step(true).await.map(|_| ()),
                    ("m", _) => controller.toggle_mute().await.map(|muted| {
                        println!("{}", if muted { "Muted" } else { "Unmuted" });
                    }),
                    ("v", Some(value)) => match value.parse::<f64>() {
                        Ok(volume) => controller.set_volume(volume).await.map(|()| {
                            println!("Volume {:.0}%", controller.gain().volume() * 100.0);
                        }),
                        Err(_) => {
                            println!("Volume must be a number between 0 and 1");
                            Ok(())
                        }
                    },
                    ("g", Some(value)) => match value.parse::<f64>() {
                        Ok(boost) => controller.set_boost(boost).await.map(|()| {
                            let gain = controller.gain();
                            if gain.graph_active() {
                                println!("Boost x{:.2}", gain.boost());
                            } else if gain.graph_available() {
                                println!("Boost off");
                            } else {
                                println!("Boost is only available for streams served by the server");
                            }
                        }),
                        Err(_) => {
                            println!("Boost must be a number between 1 and 3");
                            Ok(())
                        }
                    },
                    ("s", Some(value)) => match value.parse::<u32>() {
                        Ok(progress) => controller.seek_progress(progress).await.map(|target| {
                            if target.is_none() {
                                println!("Duration unknown, cannot seek");
                            }
                        }),
                        Err(_) => {
                            println!("Seek position must be between 0 and 1000");
                            Ok(())
                        }
                    },
                    _ => {
                        println!("{}", CONTROLS_HELP);
                        Ok(())
                    }
                };
                if let Err(e) = result {
                    eprintln!("{}", e);
                }
            }
            event = controller.next_event() => match event {
                Some(MediaEvent::Abort) | None => {
                    println!("\nPlayer closed");
                    return Ok(());
                }
                Some(MediaEvent::Error(reason)) => {
                    println!("\nPlayback error: {}", reason);
                    return Ok(());
                }
                Some(other) => debug!("Ignoring event after start: {:?}", other),
            },
            _ = ticker.tick() => {
                if auto_hide.should_hide(Instant::now(), paused) {
                    continue;
                }
                if let Ok((label, progress)) = controller.progress().await {
                    print!("\r{}  [{:>4}/1000]  ", label, progress);
                    let _ = std::io::stdout().flush();
                }
            }
        }
    }
}
