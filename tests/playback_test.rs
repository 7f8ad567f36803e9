// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

//! Source resolution and the fallback loop, driven against a scripted
//! backend on paused time.

use iptv_client::config::PlaybackConfig;
use iptv_client::models::ContentType;
use iptv_client::playback::{
    Candidate, PlayRequest, PlaybackController, PlaybackState, SourceOrigin, resolve_candidates,
};
use iptv_client::player::{AudioOutput, HlsSupport, LoadMode, MediaBackend, MediaEvent};
use iptv_client::{ApiClient, LocalCache, MemoryStorage, PlaybackError, SessionStore};
use mockito::{Matcher, Server};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep_until};

const BASE: &str = "http://tv.local:5000";

// =============================================================================
// Scripted backend
// =============================================================================

#[derive(Debug, Default)]
struct FakeBackend {
    hls: Option<HlsSupport>,
    /// Events each URL produces after it is loaded, with their delays.
    script: HashMap<String, Vec<(u64, MediaEvent)>>,
    rejected: HashSet<String>,
    queue: VecDeque<(Instant, MediaEvent)>,
    loads: Vec<String>,
    fullscreen: bool,
    paused: bool,
    audio: Vec<AudioOutput>,
}

impl FakeBackend {
    fn on(mut self, url: &str, events: Vec<(u64, MediaEvent)>) -> Self {
        self.script.insert(url.to_string(), events);
        self
    }

    fn rejecting(mut self, url: &str) -> Self {
        self.rejected.insert(url.to_string());
        self
    }
}

impl MediaBackend for FakeBackend {
    fn hls_support(&self) -> HlsSupport {
        self.hls.unwrap_or(HlsSupport::Native)
    }

    fn supports_gain(&self) -> bool {
        true
    }

    async fn load(&mut self, url: &str, _mode: LoadMode) -> Result<(), PlaybackError> {
        self.loads.push(url.to_string());
        self.queue.clear();
        if self.rejected.contains(url) {
            return Err(PlaybackError::Backend("not allowed".to_string()));
        }
        let now = Instant::now();
        for (delay_ms, event) in self.script.get(url).cloned().unwrap_or_default() {
            self.queue
                .push_back((now + Duration::from_millis(delay_ms), event));
        }
        Ok(())
    }

    async fn next_event(&mut self) -> Option<MediaEvent> {
        let Some((due, _)) = self.queue.front() else {
            return std::future::pending().await;
        };
        sleep_until(*due).await;
        self.queue.pop_front().map(|(_, event)| event)
    }

    async fn request_fullscreen(&mut self) -> Result<(), PlaybackError> {
        self.fullscreen = true;
        Ok(())
    }

    async fn exit_fullscreen(&mut self) -> Result<(), PlaybackError> {
        self.fullscreen = false;
        Ok(())
    }

    async fn pause(&mut self) -> Result<(), PlaybackError> {
        self.paused = true;
        Ok(())
    }

    async fn toggle_pause(&mut self) -> Result<bool, PlaybackError> {
        self.paused = !self.paused;
        Ok(self.paused)
    }

    async fn apply_audio(&mut self, output: AudioOutput) -> Result<(), PlaybackError> {
        self.audio.push(output);
        Ok(())
    }

    async fn seek_to(&mut self, _seconds: f64) -> Result<(), PlaybackError> {
        Ok(())
    }

    async fn position(&mut self) -> Result<(f64, Option<f64>), PlaybackError> {
        Ok((0.0, None))
    }

    async fn shutdown(&mut self) -> Result<(), PlaybackError> {
        Ok(())
    }
}

fn api(server_url: &str) -> ApiClient {
    let storage = Arc::new(MemoryStorage::new());
    let session = SessionStore::new(storage.clone());
    session.set_token("tok").unwrap();
    ApiClient::new(
        server_url,
        session,
        LocalCache::new(storage),
        Duration::from_secs(5),
    )
    .unwrap()
}

fn candidates(n: usize) -> Vec<Candidate> {
    (0..n)
        .map(|i| Candidate {
            url: format!("{}/proxy/vod/{}?ext=mp4", BASE, i),
            origin: SourceOrigin::Proxy,
        })
        .collect()
}

fn url(i: usize) -> String {
    format!("{}/proxy/vod/{}?ext=mp4", BASE, i)
}

fn error() -> MediaEvent {
    MediaEvent::Error("decode failed".to_string())
}

fn controller(backend: FakeBackend) -> PlaybackController<FakeBackend> {
    PlaybackController::new(api(BASE), backend, PlaybackConfig::default())
}

// =============================================================================
// Fallback loop
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_falls_back_through_failing_sources_in_order() {
    let backend = FakeBackend::default()
        .on(&url(0), vec![(100, error())])
        .on(&url(1), vec![(100, MediaEvent::Abort)])
        .on(&url(2), vec![(100, MediaEvent::HlsError("fatal".into()))])
        .on(&url(3), vec![(200, MediaEvent::Playing)]);
    let mut player = controller(backend);

    let playing = player
        .play_candidates(ContentType::Vod, candidates(4))
        .await
        .unwrap();

    assert_eq!(playing.url, url(3));
    assert_eq!(player.attempted(), [url(0), url(1), url(2), url(3)]);
    assert_eq!(player.state(), PlaybackState::Playing(3));
    assert!(player.backend_mut().fullscreen);
    assert_eq!(player.backend_mut().audio.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_exhausting_all_sources_is_a_playback_error() {
    let backend = FakeBackend::default()
        .on(&url(0), vec![(0, error())])
        .on(&url(1), vec![(0, error())]);
    let mut player = controller(backend);

    let err = player
        .play_candidates(ContentType::Vod, candidates(2))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Playback error");
    match err {
        PlaybackError::Exhausted { attempted } => assert_eq!(attempted.len(), 2),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(player.state(), PlaybackState::Failed);
}

#[tokio::test(start_paused = true)]
async fn test_stall_falls_back_after_grace_period() {
    let backend = FakeBackend::default()
        .on(&url(0), vec![(0, MediaEvent::Stalled)])
        .on(&url(1), vec![(0, MediaEvent::Playing)]);
    let mut player = controller(backend);

    let start = Instant::now();
    let playing = player
        .play_candidates(ContentType::Live, candidates(2))
        .await
        .unwrap();

    assert_eq!(playing.url, url(1));
    assert!(start.elapsed() >= Duration::from_secs(5));
    assert!(start.elapsed() < Duration::from_secs(6));
    assert!(!player.backend_mut().fullscreen);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_source_that_recovers_is_kept() {
    let backend = FakeBackend::default()
        .on(&url(0), vec![(0, MediaEvent::Stalled), (3_000, MediaEvent::Playing)]);
    let mut player = controller(backend);

    let playing = player
        .play_candidates(ContentType::Vod, candidates(2))
        .await
        .unwrap();
    assert_eq!(playing.url, url(0));
    assert_eq!(player.attempted().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failure_right_after_seek_does_not_advance() {
    let backend = FakeBackend::default().on(
        &url(0),
        vec![
            (0, MediaEvent::Seeking),
            (2_000, error()),
            (3_000, MediaEvent::Playing),
        ],
    );
    let mut player = controller(backend);

    let playing = player
        .play_candidates(ContentType::Vod, candidates(2))
        .await
        .unwrap();

    assert_eq!(playing.url, url(0));
    assert_eq!(player.backend_mut().loads, [url(0)]);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_start_retries_next_after_a_second() {
    let backend = FakeBackend::default()
        .rejecting(&url(0))
        .on(&url(1), vec![(0, MediaEvent::Playing)]);
    let mut player = controller(backend);

    let start = Instant::now();
    let playing = player
        .play_candidates(ContentType::Vod, candidates(2))
        .await
        .unwrap();

    assert_eq!(playing.url, url(1));
    assert!(start.elapsed() >= Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_hls_without_support_is_skipped() {
    let backend = FakeBackend {
        hls: Some(HlsSupport::Unsupported),
        ..Default::default()
    }
    .on(&url(1), vec![(0, MediaEvent::Playing)]);
    let mut player = controller(backend);

    let mut list = candidates(2);
    list[0].url = format!("{}/hls/vod/1/index.m3u8?token=tok", BASE);
    let playing = player
        .play_candidates(ContentType::Vod, list)
        .await
        .unwrap();

    assert_eq!(playing.url, url(1));
    assert_eq!(player.backend_mut().loads, [url(1)]);
}

#[tokio::test(start_paused = true)]
async fn test_close_pauses_and_leaves_fullscreen() {
    let backend = FakeBackend::default().on(&url(0), vec![(0, MediaEvent::Playing)]);
    let mut player = controller(backend);
    player
        .play_candidates(ContentType::Vod, candidates(1))
        .await
        .unwrap();

    player.close().await.unwrap();

    assert_eq!(player.state(), PlaybackState::Idle);
    assert!(player.backend_mut().paused);
    assert!(!player.backend_mut().fullscreen);
}

#[tokio::test(start_paused = true)]
async fn test_boost_uses_gain_for_same_origin_source() {
    let backend = FakeBackend::default().on(&url(0), vec![(0, MediaEvent::Playing)]);
    let mut player = controller(backend);
    player
        .play_candidates(ContentType::Vod, candidates(1))
        .await
        .unwrap();

    player.set_volume(0.5).await.unwrap();
    player.set_boost(2.0).await.unwrap();
    assert_eq!(
        player.backend_mut().audio.last(),
        Some(&AudioOutput::Graph { gain: 1.0 })
    );
    assert!(player.toggle_mute().await.unwrap());
}

// =============================================================================
// Source resolution
// =============================================================================

#[tokio::test]
async fn test_vod_uses_hls_when_available() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/hls/check/vod/42")
        .with_status(200)
        .with_body(r#"{"ok": true, "url": "/hls/vod/42/index.m3u8"}"#)
        .create_async()
        .await;
    let direct = server
        .mock("GET", "/stream_url/vod/42")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let api = api(&server.url());
    let request = PlayRequest::new(ContentType::Vod, "42", "Film", "mkv");
    let list = resolve_candidates(&api, &request, true).await.unwrap();

    direct.assert_async().await;
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].origin, SourceOrigin::Hls);
    assert_eq!(
        list[0].url,
        format!("{}/hls/vod/42/index.m3u8", server.url())
    );
}

#[tokio::test]
async fn test_series_episode_uses_hls_when_available() {
    let mut server = Server::new_async().await;
    let check = server
        .mock("GET", "/hls/check/vod/9")
        .with_status(200)
        .with_body(r#"{"ok": true, "url": "http://cdn.tv/hls/9/index.m3u8?sig=abc"}"#)
        .expect(1)
        .create_async()
        .await;
    let direct = server
        .mock("GET", "/stream_url/series/9")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let api = api(&server.url());
    let request = PlayRequest::new(ContentType::Series, "9", "Episode", "mp4");
    let list = resolve_candidates(&api, &request, true).await.unwrap();

    check.assert_async().await;
    direct.assert_async().await;
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].origin, SourceOrigin::Hls);
    assert_eq!(list[0].url, "http://cdn.tv/hls/9/index.m3u8?sig=abc");
}

#[tokio::test]
async fn test_vod_order_is_direct_proxy_compat() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/hls/check/vod/42")
        .with_status(200)
        .with_body(r#"{"ok": false}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/stream_url/vod/42")
        .match_query(Matcher::UrlEncoded("ext".into(), "mkv".into()))
        .with_status(200)
        .with_body(r#"{"url": "http://provider.tv/movie/u/p/42.mkv"}"#)
        .create_async()
        .await;

    let api = api(&server.url());
    let request = PlayRequest::new(ContentType::Vod, "42", "Film", "mkv");
    let list = resolve_candidates(&api, &request, true).await.unwrap();

    let origins: Vec<_> = list.iter().map(|c| c.origin).collect();
    assert_eq!(
        origins,
        [SourceOrigin::Direct, SourceOrigin::Proxy, SourceOrigin::Compat]
    );
    assert_eq!(list[0].url, "http://provider.tv/movie/u/p/42.mkv");
    assert_eq!(
        list[1].url,
        format!("{}/proxy/vod/42?ext=mkv&token=tok", server.url())
    );
    assert_eq!(
        list[2].url,
        format!("{}/compat/vod/42?ext=mkv&token=tok", server.url())
    );
}

#[tokio::test]
async fn test_missing_direct_url_is_skipped() {
    let mut server = Server::new_async().await;
    let check = server
        .mock("GET", "/hls/check/vod/9")
        .with_status(200)
        .with_body(r#"{"ok": false}"#)
        .expect(1)
        .create_async()
        .await;
    server
        .mock("GET", "/stream_url/series/9")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"error": "no url"}"#)
        .create_async()
        .await;

    let api = api(&server.url());
    let request = PlayRequest::new(ContentType::Series, "9", "Episode", "");
    let list = resolve_candidates(&api, &request, true).await.unwrap();

    check.assert_async().await;
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].origin, SourceOrigin::Proxy);
    assert_eq!(
        list[0].url,
        format!("{}/proxy/vod/9?ext=mp4&token=tok", server.url())
    );
    assert_eq!(
        list[1].url,
        format!("{}/compat/series/9?ext=mp4&token=tok", server.url())
    );
}

#[tokio::test]
async fn test_live_prefers_compat_then_direct() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/stream_url/live/5")
        .with_status(200)
        .with_body(r#"{"url": "http://provider.tv/live/u/p/5.ts"}"#)
        .create_async()
        .await;

    let api = api(&server.url());
    let request = PlayRequest::new(ContentType::Live, "5", "News", "ts");
    let list = resolve_candidates(&api, &request, true).await.unwrap();

    assert_eq!(list.len(), 2);
    assert_eq!(list[0].origin, SourceOrigin::Compat);
    assert_eq!(
        list[0].url,
        format!("{}/compat/live/5?token=tok", server.url())
    );
    assert_eq!(list[1].url, "http://provider.tv/live/u/p/5.ts");
}
