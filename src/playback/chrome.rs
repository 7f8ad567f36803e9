// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use std::time::Duration;
use tokio::time::Instant;

pub const SEEK_STEP_SECS: f64 = 10.0;
pub const PROGRESS_MAX: u32 = 1000;
pub const AUTO_HIDE_DELAY: Duration = Duration::from_millis(2500);

fn known(duration: Option<f64>) -> Option<f64> {
    duration.filter(|d| d.is_finite() && *d > 0.0)
}

/// `m:ss`, or `h:mm:ss` from one hour on.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

pub fn time_label(current: f64, duration: Option<f64>) -> String {
    format!(
        "{} / {}",
        format_time(current),
        format_time(known(duration).unwrap_or(0.0))
    )
}

pub fn progress_value(current: f64, duration: Option<f64>) -> u32 {
    match known(duration) {
        Some(d) => ((current / d) * PROGRESS_MAX as f64)
            .round()
            .clamp(0.0, PROGRESS_MAX as f64) as u32,
        None => 0,
    }
}

/// Target position for a progress bar value; nothing when the duration
/// is unknown.
pub fn seek_from_progress(value: u32, duration: Option<f64>) -> Option<f64> {
    known(duration).map(|d| value.min(PROGRESS_MAX) as f64 / PROGRESS_MAX as f64 * d)
}

pub fn seek_backward(current: f64) -> f64 {
    (current - SEEK_STEP_SECS).max(0.0)
}

pub fn seek_forward(current: f64, duration: Option<f64>) -> f64 {
    let target = current + SEEK_STEP_SECS;
    match known(duration) {
        Some(d) => target.min(d),
        None => target,
    }
}

/// Hides the controls a fixed delay after the last activity, unless paused.
#[derive(Debug, Clone, Copy)]
pub struct AutoHide {
    last_activity: Instant,
    delay: Duration,
}

impl AutoHide {
    pub fn new(now: Instant) -> Self {
        Self {
            last_activity: now,
            delay: AUTO_HIDE_DELAY,
        }
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_activity = now;
    }

    pub fn deadline(&self) -> Instant {
        self.last_activity + self.delay
    }

    pub fn should_hide(&self, now: Instant, paused: bool) -> bool {
        !paused && now >= self.deadline()
    }
}
