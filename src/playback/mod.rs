// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

mod candidates;
pub mod chrome;
pub mod gain;
mod session;

pub use candidates::{Candidate, SourceOrigin, resolve_candidates};
pub use gain::GainPipeline;
pub use session::{Directive, PlaybackSession, PlaybackState, Timings};

use crate::api::ApiClient;
use crate::config::PlaybackConfig;
use crate::error::PlaybackError;
use crate::models::ContentType;
use crate::player::{HlsSupport, LoadMode, MediaBackend, MediaEvent};
use serde::Serialize;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, warn};

/// What to play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayRequest {
    pub kind: ContentType,
    pub id: String,
    pub title: String,
    pub ext: String,
}

impl PlayRequest {
    pub fn new(kind: ContentType, id: &str, title: &str, ext: &str) -> Self {
        Self {
            kind,
            id: id.to_string(),
            title: title.to_string(),
            ext: ext.to_string(),
        }
    }
}

/// Owns the media backend and runs playback sessions on it: resolve the
/// candidate list, attach sources one at a time, fall back on failure.
#[derive(Debug)]
pub struct PlaybackController<B: MediaBackend> {
    api: ApiClient,
    backend: B,
    config: PlaybackConfig,
    gain: GainPipeline,
    session: Option<PlaybackSession>,
}

impl<B: MediaBackend> PlaybackController<B> {
    pub fn new(api: ApiClient, backend: B, config: PlaybackConfig) -> Self {
        Self {
            api,
            backend,
            config,
            gain: GainPipeline::new(),
            session: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.session
            .as_ref()
            .map(PlaybackSession::state)
            .unwrap_or(PlaybackState::Idle)
    }

    pub fn current(&self) -> Option<&Candidate> {
        self.session.as_ref().and_then(PlaybackSession::current)
    }

    pub fn attempted(&self) -> &[String] {
        self.session
            .as_ref()
            .map(PlaybackSession::attempted)
            .unwrap_or_default()
    }

    pub fn gain(&self) -> &GainPipeline {
        &self.gain
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    fn timings(&self) -> Timings {
        Timings {
            stall_grace: self.config.stall_grace(),
            seek_grace: self.config.seek_grace(),
            start_retry: self.config.start_retry(),
        }
    }

    /// Resolves the sources for `request` and plays the first one that
    /// starts.
    pub async fn play(&mut self, request: &PlayRequest) -> Result<Candidate, PlaybackError> {
        let mut session = PlaybackSession::new(request.kind, self.timings());
        session.begin_resolving();
        self.session = Some(session);

        let candidates = match resolve_candidates(&self.api, request, self.config.compat_live).await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                if let Some(session) = self.session.as_mut() {
                    session.start(Vec::new());
                }
                return Err(e.into());
            }
        };
        self.play_candidates(request.kind, candidates).await
    }

    /// Tries `candidates` in order until one reports playing.
    pub async fn play_candidates(
        &mut self,
        kind: ContentType,
        candidates: Vec<Candidate>,
    ) -> Result<Candidate, PlaybackError> {
        let mut session = PlaybackSession::new(kind, self.timings());
        let mut directive = session.start(candidates);

        let result = loop {
            directive = match directive {
                Directive::Load(index) => {
                    let candidate = session.candidates()[index].clone();
                    self.attach(&mut session, &candidate).await
                }
                Directive::Wait => {
                    let deadline = session.next_deadline();
                    tokio::select! {
                        event = self.backend.next_event() => match event {
                            Some(event) => session.on_event(event, Instant::now()),
                            None => break Err(PlaybackError::Backend(
                                "Player exited".to_string(),
                            )),
                        },
                        _ = async {
                            match deadline {
                                Some(deadline) => sleep_until(deadline).await,
                                None => std::future::pending().await,
                            }
                        } => session.on_timer(Instant::now()),
                    }
                }
                Directive::Settled { index, fullscreen } => {
                    let candidate = session.candidates()[index].clone();
                    self.settle(&candidate, fullscreen).await;
                    break Ok(candidate);
                }
                Directive::Exhausted => {
                    break Err(PlaybackError::Exhausted {
                        attempted: session.attempted().to_vec(),
                    });
                }
            };
        };

        self.session = Some(session);
        result
    }

    async fn attach(&mut self, session: &mut PlaybackSession, candidate: &Candidate) -> Directive {
        let mode = if candidate.is_hls() {
            match self.backend.hls_support() {
                HlsSupport::Native => Some(LoadMode::Direct),
                HlsSupport::Library => Some(LoadMode::HlsLibrary),
                HlsSupport::Unsupported => None,
            }
        } else {
            Some(LoadMode::Direct)
        };

        let Some(mode) = mode else {
            debug!("Backend cannot play HLS, skipping {}", candidate.url);
            return session.skip_current(Instant::now());
        };

        match self.backend.load(&candidate.url, mode).await {
            Ok(()) => Directive::Wait,
            Err(e) => {
                warn!("Backend refused {}: {}", candidate.url, e);
                session.on_event(MediaEvent::PlayRejected(e.to_string()), Instant::now())
            }
        }
    }

    async fn settle(&mut self, candidate: &Candidate, fullscreen: bool) {
        if fullscreen && let Err(e) = self.backend.request_fullscreen().await {
            warn!("Fullscreen request failed: {}", e);
        }
        let output =
            self.gain
                .set_source(&candidate.url, self.api.base_url(), self.backend.supports_gain());
        if let Err(e) = self.backend.apply_audio(output).await {
            warn!("Failed to apply audio settings: {}", e);
        }
    }

    /// Events after the session settled, for the player chrome.
    pub async fn next_event(&mut self) -> Option<MediaEvent> {
        self.backend.next_event().await
    }

    pub async fn set_volume(&mut self, volume: f64) -> Result<(), PlaybackError> {
        let output = self.gain.set_volume(volume);
        self.backend.apply_audio(output).await
    }

    pub async fn set_boost(&mut self, boost: f64) -> Result<(), PlaybackError> {
        let output = self.gain.set_boost(boost);
        self.backend.apply_audio(output).await
    }

    pub async fn toggle_mute(&mut self) -> Result<bool, PlaybackError> {
        let output = self.gain.toggle_mute();
        self.backend.apply_audio(output).await?;
        Ok(self.gain.is_muted())
    }

    pub async fn toggle_pause(&mut self) -> Result<bool, PlaybackError> {
        self.backend.toggle_pause().await
    }

    /// Seeks one step back (`forward == false`) or forward.
    pub async fn seek_step(&mut self, forward: bool) -> Result<f64, PlaybackError> {
        let (current, duration) = self.backend.position().await?;
        let target = if forward {
            chrome::seek_forward(current, duration)
        } else {
            chrome::seek_backward(current)
        };
        self.backend.seek_to(target).await?;
        Ok(target)
    }

    pub async fn seek_progress(&mut self, value: u32) -> Result<Option<f64>, PlaybackError> {
        let (_, duration) = self.backend.position().await?;
        let Some(target) = chrome::seek_from_progress(value, duration) else {
            return Ok(None);
        };
        self.backend.seek_to(target).await?;
        Ok(Some(target))
    }

    /// Current `(time label, progress value)`.
    pub async fn progress(&mut self) -> Result<(String, u32), PlaybackError> {
        let (current, duration) = self.backend.position().await?;
        Ok((
            chrome::time_label(current, duration),
            chrome::progress_value(current, duration),
        ))
    }

    /// Closes the player: pause, leave fullscreen, back to idle.
    pub async fn close(&mut self) -> Result<(), PlaybackError> {
        let paused = self.backend.pause().await;
        let windowed = self.backend.exit_fullscreen().await;
        if let Some(session) = self.session.as_mut() {
            session.close();
        }
        paused?;
        windowed
    }

    pub async fn shutdown(mut self) -> Result<(), PlaybackError> {
        self.backend.shutdown().await
    }
}
