// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use super::Candidate;
use crate::models::ContentType;
use crate::player::MediaEvent;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "index", rename_all = "lowercase")]
pub enum PlaybackState {
    Idle,
    Resolving,
    Attempting(usize),
    Fallback(usize),
    Playing(usize),
    Failed,
}

/// What the driver of a [`PlaybackSession`] has to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Attach the candidate at this index.
    Load(usize),
    /// Wait for the next media event or fallback deadline.
    Wait,
    Settled { index: usize, fullscreen: bool },
    Exhausted,
}

#[derive(Debug, Clone, Copy)]
pub struct Timings {
    pub stall_grace: Duration,
    pub seek_grace: Duration,
    pub start_retry: Duration,
}

/// Fallback state machine for one playback. Pure: time is passed in and
/// the backend is driven by the returned [`Directive`]s.
#[derive(Debug)]
pub struct PlaybackSession {
    kind: ContentType,
    timings: Timings,
    candidates: Vec<Candidate>,
    index: usize,
    state: PlaybackState,
    pending_fallbacks: Vec<Instant>,
    suppress_until: Option<Instant>,
    attempted: Vec<String>,
}

impl PlaybackSession {
    pub fn new(kind: ContentType, timings: Timings) -> Self {
        Self {
            kind,
            timings,
            candidates: Vec::new(),
            index: 0,
            state: PlaybackState::Idle,
            pending_fallbacks: Vec::new(),
            suppress_until: None,
            attempted: Vec::new(),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn current(&self) -> Option<&Candidate> {
        match self.state {
            PlaybackState::Attempting(i) | PlaybackState::Playing(i) => self.candidates.get(i),
            _ => None,
        }
    }

    /// URLs handed to the backend so far, in order.
    pub fn attempted(&self) -> &[String] {
        &self.attempted
    }

    pub fn begin_resolving(&mut self) {
        self.state = PlaybackState::Resolving;
    }

    pub fn start(&mut self, candidates: Vec<Candidate>) -> Directive {
        self.candidates = candidates;
        self.attempted.clear();
        self.attempt(0)
    }

    fn attempt(&mut self, index: usize) -> Directive {
        self.pending_fallbacks.clear();
        self.suppress_until = None;
        self.index = index;

        let Some(candidate) = self.candidates.get(index) else {
            debug!("All {} source(s) failed", self.candidates.len());
            self.state = PlaybackState::Failed;
            return Directive::Exhausted;
        };

        debug!("Attempting source {} ({}): {}", index, candidate.origin, candidate.url);
        self.attempted.push(candidate.url.clone());
        self.state = PlaybackState::Attempting(index);
        Directive::Load(index)
    }

    /// Moves to the next candidate unless a recent seek suppresses it.
    fn fallback(&mut self, now: Instant) -> Directive {
        if self.suppress_until.is_some_and(|until| now < until) {
            debug!("Fallback suppressed after seek");
            return Directive::Wait;
        }
        self.state = PlaybackState::Fallback(self.index);
        self.attempt(self.index + 1)
    }

    /// The current candidate cannot be attached at all.
    pub fn skip_current(&mut self, now: Instant) -> Directive {
        match self.state {
            PlaybackState::Attempting(_) => self.fallback(now),
            _ => Directive::Wait,
        }
    }

    pub fn on_event(&mut self, event: MediaEvent, now: Instant) -> Directive {
        let PlaybackState::Attempting(index) = self.state else {
            return Directive::Wait;
        };

        match event {
            MediaEvent::Playing => {
                self.pending_fallbacks.clear();
                self.suppress_until = None;
                self.state = PlaybackState::Playing(index);
                debug!("Playback settled on source {}", index);
                Directive::Settled {
                    index,
                    fullscreen: self.kind == ContentType::Vod,
                }
            }
            MediaEvent::Error(ref reason) | MediaEvent::HlsError(ref reason) => {
                debug!("Source {} failed: {}", index, reason);
                self.fallback(now)
            }
            MediaEvent::Abort => self.fallback(now),
            MediaEvent::Stalled => {
                self.pending_fallbacks.push(now + self.timings.stall_grace);
                Directive::Wait
            }
            MediaEvent::PlayRejected(ref reason) => {
                debug!("Source {} rejected: {}", index, reason);
                self.pending_fallbacks.push(now + self.timings.start_retry);
                Directive::Wait
            }
            MediaEvent::Seeking => {
                self.suppress_until = Some(now + self.timings.seek_grace);
                Directive::Wait
            }
        }
    }

    /// Earliest pending delayed fallback.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending_fallbacks.iter().min().copied()
    }

    pub fn on_timer(&mut self, now: Instant) -> Directive {
        if !matches!(self.state, PlaybackState::Attempting(_)) {
            return Directive::Wait;
        }
        let before = self.pending_fallbacks.len();
        self.pending_fallbacks.retain(|due| *due > now);
        if self.pending_fallbacks.len() == before {
            return Directive::Wait;
        }
        self.fallback(now)
    }

    pub fn close(&mut self) {
        self.pending_fallbacks.clear();
        self.suppress_until = None;
        self.state = PlaybackState::Idle;
    }
}
