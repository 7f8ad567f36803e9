// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use crate::player::AudioOutput;
use serde::Serialize;
use url::Url;

pub const MIN_BOOST: f64 = 1.0;
pub const MAX_BOOST: f64 = 3.0;
const BOOST_EPSILON: f64 = 1.01;

/// Whether `src` is served from the same origin as `base`. Relative and
/// empty sources resolve against `base`; unparsable ones are foreign.
pub fn is_same_origin(src: &str, base: &Url) -> bool {
    base.join(src)
        .map(|resolved| resolved.origin() == base.origin())
        .unwrap_or(false)
}

/// Volume, boost and mute state of the player.
///
/// Boosting past unity needs the gain graph, which only exists for
/// same-origin sources on a backend that supports it. While the graph is
/// active the native output is driven by the effective gain instead of the
/// user volume.
#[derive(Debug, Clone, Serialize)]
pub struct GainPipeline {
    volume: f64,
    boost: f64,
    soft_muted: bool,
    native_muted: bool,
    graph_active: bool,
    graph_available: bool,
}

impl Default for GainPipeline {
    fn default() -> Self {
        Self {
            volume: 1.0,
            boost: MIN_BOOST,
            soft_muted: false,
            native_muted: false,
            graph_active: false,
            graph_available: false,
        }
    }
}

impl GainPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn boost(&self) -> f64 {
        self.boost
    }

    pub fn graph_active(&self) -> bool {
        self.graph_active
    }

    pub fn graph_available(&self) -> bool {
        self.graph_available
    }

    pub fn effective_gain(&self) -> f64 {
        if self.soft_muted {
            0.0
        } else {
            self.volume.clamp(0.0, 1.0) * self.boost.clamp(MIN_BOOST, MAX_BOOST)
        }
    }

    /// The output matching the current state.
    pub fn output(&self) -> AudioOutput {
        if self.graph_active {
            AudioOutput::Graph {
                gain: self.effective_gain(),
            }
        } else {
            AudioOutput::Native {
                volume: self.volume,
                muted: self.native_muted,
            }
        }
    }

    /// Records the source now attached. A foreign source takes the graph
    /// down.
    pub fn set_source(&mut self, src: &str, base: &Url, backend_supports_gain: bool) -> AudioOutput {
        self.graph_available = backend_supports_gain && is_same_origin(src, base);
        if !self.graph_available {
            self.graph_active = false;
        } else if self.boost > BOOST_EPSILON {
            self.graph_active = true;
        }
        self.output()
    }

    /// Ignored while the current source cannot use the gain graph.
    pub fn set_boost(&mut self, boost: f64) -> AudioOutput {
        if !self.graph_available {
            return self.output();
        }
        self.boost = boost.clamp(MIN_BOOST, MAX_BOOST);
        if self.boost <= BOOST_EPSILON {
            self.graph_active = false;
            self.native_muted = false;
        } else {
            self.graph_active = true;
        }
        self.output()
    }

    pub fn set_volume(&mut self, volume: f64) -> AudioOutput {
        self.volume = volume.clamp(0.0, 1.0);
        if !self.graph_active && self.volume > 0.0 {
            self.native_muted = false;
        }
        self.output()
    }

    pub fn toggle_mute(&mut self) -> AudioOutput {
        if self.graph_active {
            self.soft_muted = !self.soft_muted;
        } else {
            self.native_muted = !self.native_muted;
        }
        self.output()
    }

    pub fn is_muted(&self) -> bool {
        let muted = if self.graph_active {
            self.soft_muted
        } else {
            self.native_muted
        };
        muted || self.volume == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://tv.local:5000/").unwrap()
    }

    #[test]
    fn same_origin_rules() {
        let base = base();
        assert!(is_same_origin("", &base));
        assert!(is_same_origin("/proxy/vod/1?ext=mp4", &base));
        assert!(is_same_origin("http://tv.local:5000/compat/live/1", &base));
        assert!(!is_same_origin("http://tv.local:5001/compat/live/1", &base));
        assert!(!is_same_origin("https://provider.tv/1.mp4", &base));
        assert!(!is_same_origin("http://[bad", &base));
    }

    #[test]
    fn boost_needs_same_origin() {
        let mut gain = GainPipeline::new();
        gain.set_source("https://provider.tv/1.mp4", &base(), true);
        assert_eq!(
            gain.set_boost(2.0),
            AudioOutput::Native {
                volume: 1.0,
                muted: false
            }
        );
        assert!(!gain.graph_active());
    }

    #[test]
    fn boost_drives_effective_gain() {
        let mut gain = GainPipeline::new();
        gain.set_source("/proxy/vod/1", &base(), true);
        gain.set_volume(0.5);
        assert_eq!(gain.set_boost(5.0), AudioOutput::Graph { gain: 1.5 });

        assert_eq!(gain.toggle_mute(), AudioOutput::Graph { gain: 0.0 });
        assert!(gain.is_muted());
        gain.toggle_mute();

        assert_eq!(
            gain.set_boost(1.005),
            AudioOutput::Native {
                volume: 0.5,
                muted: false
            }
        );
        assert!(!gain.graph_active());
    }

    #[test]
    fn native_mute_and_volume() {
        let mut gain = GainPipeline::new();
        gain.toggle_mute();
        assert!(gain.is_muted());
        assert_eq!(
            gain.set_volume(0.3),
            AudioOutput::Native {
                volume: 0.3,
                muted: false
            }
        );
        gain.set_volume(0.0);
        assert!(gain.is_muted());
    }

    #[test]
    fn backend_without_gain_keeps_native() {
        let mut gain = GainPipeline::new();
        gain.set_source("/proxy/vod/1", &base(), false);
        gain.set_boost(3.0);
        assert!(!gain.graph_active());
    }

    #[test]
    fn boost_on_foreign_source_is_not_remembered() {
        let mut gain = GainPipeline::new();
        gain.set_source("https://provider.tv/1.mp4", &base(), true);
        gain.set_boost(2.5);
        assert_eq!(gain.boost(), MIN_BOOST);

        assert_eq!(
            gain.set_source("/proxy/vod/1", &base(), true),
            AudioOutput::Native {
                volume: 1.0,
                muted: false
            }
        );
        assert!(!gain.graph_active());
    }
}
