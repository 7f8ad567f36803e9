// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

pub mod mpv;

use crate::error::PlaybackError;

pub use mpv::MpvBackend;

/// How a backend can deal with HLS manifests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HlsSupport {
    Native,
    Library,
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    Direct,
    HlsLibrary,
}

/// Events a backend reports while a source is attached.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    Playing,
    Error(String),
    Stalled,
    Abort,
    Seeking,
    /// The backend refused to start the source.
    PlayRejected(String),
    HlsError(String),
}

/// What the audio output should be set to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AudioOutput {
    /// The backend's own volume control, `volume` in `0..=1`.
    Native { volume: f64, muted: bool },
    /// Amplified output; `gain` may exceed 1.
    Graph { gain: f64 },
}

/// A media pipeline playback sources are attached to.
///
/// `next_event` must be cancel-safe: the playback controller races it
/// against its fallback timers.
#[allow(async_fn_in_trait)]
pub trait MediaBackend {
    fn hls_support(&self) -> HlsSupport;

    fn supports_gain(&self) -> bool;

    async fn load(&mut self, url: &str, mode: LoadMode) -> Result<(), PlaybackError>;

    /// `None` once the backend is gone.
    async fn next_event(&mut self) -> Option<MediaEvent>;

    async fn request_fullscreen(&mut self) -> Result<(), PlaybackError>;

    async fn exit_fullscreen(&mut self) -> Result<(), PlaybackError>;

    async fn pause(&mut self) -> Result<(), PlaybackError>;

    /// Returns whether playback is paused afterwards.
    async fn toggle_pause(&mut self) -> Result<bool, PlaybackError>;

    async fn apply_audio(&mut self, output: AudioOutput) -> Result<(), PlaybackError>;

    async fn seek_to(&mut self, seconds: f64) -> Result<(), PlaybackError>;

    /// Current position and, when known, the duration, both in seconds.
    async fn position(&mut self) -> Result<(f64, Option<f64>), PlaybackError>;

    async fn shutdown(&mut self) -> Result<(), PlaybackError>;
}
