// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use super::{AudioOutput, HlsSupport, LoadMode, MediaBackend, MediaEvent};
use crate::config::PlayerConfig;
use crate::error::PlaybackError;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader};
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader as AsyncBufReader};
use tokio::net::UnixStream;
use tokio::net::unix::OwnedWriteHalf;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep, timeout};
use tracing::{debug, error, warn};

const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);
const CACHE_OBSERVER_ID: u64 = 1;

type PendingReplies = Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>>;

/// mpv driven over its JSON IPC socket. Commands carry a `request_id`; a
/// reader task routes replies back to the caller and turns mpv events into
/// [`MediaEvent`]s.
pub struct MpvBackend {
    socket_path: PathBuf,
    process: Option<Child>,
    writer: OwnedWriteHalf,
    replies: PendingReplies,
    events: mpsc::UnboundedReceiver<MediaEvent>,
    next_request_id: u64,
}

impl std::fmt::Debug for MpvBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MpvBackend")
            .field("socket_path", &self.socket_path)
            .field("running", &self.process.is_some())
            .finish()
    }
}

/// Per-process socket under `$XDG_STATE_HOME/iptv-client`, falling back to
/// the temp directory when the state directory cannot be created.
fn socket_path() -> PathBuf {
    let state_dir = std::env::var("XDG_STATE_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("state")))
        .unwrap_or_else(std::env::temp_dir);
    let app_dir = state_dir.join("iptv-client");

    if !app_dir.exists() {
        if let Err(e) = fs::create_dir_all(&app_dir) {
            warn!("Failed to create state directory: {}", e);
            let uid = unsafe { libc::getuid() };
            return std::env::temp_dir()
                .join(format!("iptv-client-mpv-{}-{}.sock", uid, std::process::id()));
        }
        if let Err(e) = fs::set_permissions(&app_dir, fs::Permissions::from_mode(0o700)) {
            warn!("Failed to set permissions on state directory: {}", e);
        }
    }

    app_dir.join(format!("mpv-{}.sock", std::process::id()))
}

/// Maps one mpv IPC event message onto a media event. Messages that do not
/// affect playback state map to `None`.
pub(crate) fn map_event(message: &Value) -> Option<MediaEvent> {
    match message.get("event")?.as_str()? {
        "playback-restart" => Some(MediaEvent::Playing),
        "seek" => Some(MediaEvent::Seeking),
        "end-file" => match message.get("reason").and_then(Value::as_str) {
            Some("error") => Some(MediaEvent::Error(
                message
                    .get("file_error")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            )),
            Some("quit") => Some(MediaEvent::Abort),
            _ => None,
        },
        "property-change" => {
            let name = message.get("name").and_then(Value::as_str)?;
            let data = message.get("data").and_then(Value::as_bool)?;
            (name == "paused-for-cache" && data).then_some(MediaEvent::Stalled)
        }
        _ => None,
    }
}

fn backend_error(context: &str, e: impl std::fmt::Display) -> PlaybackError {
    PlaybackError::Backend(format!("{}: {}", context, e))
}

impl MpvBackend {
    /// Starts mpv idle with an IPC socket and connects to it.
    pub async fn launch(config: &PlayerConfig) -> Result<Self, PlaybackError> {
        let socket_path = socket_path();
        if socket_path.exists() {
            let _ = fs::remove_file(&socket_path);
        }
        debug!("Launching {} with IPC socket at {:?}", config.command, socket_path);

        let mut cmd = Command::new(&config.command);
        cmd.arg(format!("--input-ipc-server={}", socket_path.display()))
            .arg("--idle=yes")
            .arg("--force-window=yes")
            .arg("--keep-open=yes")
            .arg("--volume-max=300")
            .arg("--title=IPTV Client")
            .args(&config.args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .stdin(Stdio::null());

        let mut child = cmd.spawn().map_err(|e| {
            backend_error(&format!("Failed to start {}. Is it installed?", config.command), e)
        })?;

        if let Some(stderr) = child.stderr.take() {
            thread::spawn(move || {
                let reader = BufReader::new(stderr);
                for line in reader.lines().map_while(Result::ok) {
                    debug!("mpv stderr: {}", line);
                }
            });
        }

        let mut stream = None;
        for attempt in 0..20 {
            sleep(Duration::from_millis(500)).await;

            match child.try_wait() {
                Ok(Some(status)) => {
                    error!("mpv exited unexpectedly with status: {:?}", status);
                    return Err(PlaybackError::Backend(format!(
                        "mpv exited unexpectedly with status: {:?}",
                        status
                    )));
                }
                Ok(None) => {}
                Err(e) => warn!("Failed to check mpv process status: {}", e),
            }

            if let Ok(connected) = UnixStream::connect(&socket_path).await {
                debug!("mpv IPC socket ready after {} ms", (attempt + 1) * 500);
                stream = Some(connected);
                break;
            }
        }

        let Some(stream) = stream else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(PlaybackError::Backend(
                "mpv IPC socket failed to start after 10 seconds".to_string(),
            ));
        };

        let mut backend = Self::attach(stream, Some(child), socket_path);
        backend
            .command(json!(["observe_property", CACHE_OBSERVER_ID, "paused-for-cache"]))
            .await?;
        Ok(backend)
    }

    /// Wraps a connected IPC stream and spawns the reader task routing
    /// replies and events.
    fn attach(stream: UnixStream, process: Option<Child>, socket_path: PathBuf) -> Self {
        let (read_half, writer) = stream.into_split();
        let replies: PendingReplies = Arc::new(Mutex::new(HashMap::new()));
        let (event_tx, events) = mpsc::unbounded_channel();

        let reader_replies = replies.clone();
        tokio::spawn(async move {
            let mut lines = AsyncBufReader::new(read_half).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let Ok(message) = serde_json::from_str::<Value>(&line) else {
                    debug!("Ignoring unparsable mpv message: {}", line);
                    continue;
                };
                if let Some(id) = message.get("request_id").and_then(Value::as_u64) {
                    let sender = reader_replies
                        .lock()
                        .ok()
                        .and_then(|mut pending| pending.remove(&id));
                    if let Some(sender) = sender {
                        let _ = sender.send(message);
                    }
                } else if let Some(event) = map_event(&message) {
                    debug!("mpv event: {:?}", event);
                    if event_tx.send(event).is_err() {
                        break;
                    }
                }
            }
            debug!("mpv IPC connection closed");
        });

        Self {
            socket_path,
            process,
            writer,
            replies,
            events,
            next_request_id: CACHE_OBSERVER_ID + 1,
        }
    }

    fn forget_reply(&self, request_id: u64) {
        if let Ok(mut pending) = self.replies.lock() {
            pending.remove(&request_id);
        }
    }

    #[cfg(test)]
    fn pending_replies(&self) -> usize {
        self.replies.lock().map(|pending| pending.len()).unwrap_or(0)
    }

    async fn command(&mut self, args: Value) -> Result<Value, PlaybackError> {
        let request_id = self.next_request_id;
        self.next_request_id += 1;

        let (tx, rx) = oneshot::channel();
        if let Ok(mut pending) = self.replies.lock() {
            pending.insert(request_id, tx);
        }

        let mut line = json!({"command": args, "request_id": request_id}).to_string();
        debug!("Sending mpv command: {}", line);
        line.push('\n');
        if let Err(e) = self.writer.write_all(line.as_bytes()).await {
            self.forget_reply(request_id);
            return Err(backend_error("Failed to write to mpv socket", e));
        }

        let reply = match timeout(COMMAND_TIMEOUT, rx).await {
            Ok(reply) => reply.map_err(|e| backend_error("mpv connection lost", e))?,
            Err(e) => {
                self.forget_reply(request_id);
                return Err(backend_error("mpv did not answer", e));
            }
        };

        match reply.get("error").and_then(Value::as_str) {
            Some("success") | None => Ok(reply.get("data").cloned().unwrap_or(Value::Null)),
            Some(error) => Err(PlaybackError::Backend(format!(
                "mpv command failed: {}",
                error
            ))),
        }
    }

    async fn set_property(&mut self, name: &str, value: Value) -> Result<(), PlaybackError> {
        self.command(json!(["set_property", name, value])).await?;
        Ok(())
    }
}

impl MediaBackend for MpvBackend {
    fn hls_support(&self) -> HlsSupport {
        HlsSupport::Native
    }

    fn supports_gain(&self) -> bool {
        true
    }

    async fn load(&mut self, url: &str, _mode: LoadMode) -> Result<(), PlaybackError> {
        debug!("Loading source: {}", url);
        self.command(json!(["loadfile", url, "replace"])).await?;
        self.set_property("pause", json!(false)).await
    }

    async fn next_event(&mut self) -> Option<MediaEvent> {
        self.events.recv().await
    }

    async fn request_fullscreen(&mut self) -> Result<(), PlaybackError> {
        self.set_property("fullscreen", json!(true)).await
    }

    async fn exit_fullscreen(&mut self) -> Result<(), PlaybackError> {
        self.set_property("fullscreen", json!(false)).await
    }

    async fn pause(&mut self) -> Result<(), PlaybackError> {
        self.set_property("pause", json!(true)).await
    }

    async fn toggle_pause(&mut self) -> Result<bool, PlaybackError> {
        self.command(json!(["cycle", "pause"])).await?;
        let paused = self.command(json!(["get_property", "pause"])).await?;
        Ok(paused.as_bool().unwrap_or(false))
    }

    async fn apply_audio(&mut self, output: AudioOutput) -> Result<(), PlaybackError> {
        // mpv volume is a percentage; --volume-max=300 leaves room for gain.
        let (volume, muted) = match output {
            AudioOutput::Native { volume, muted } => (volume * 100.0, muted),
            AudioOutput::Graph { gain } => (gain * 100.0, false),
        };
        self.set_property("volume", json!(volume)).await?;
        self.set_property("mute", json!(muted)).await
    }

    async fn seek_to(&mut self, seconds: f64) -> Result<(), PlaybackError> {
        self.command(json!(["seek", seconds, "absolute"])).await?;
        Ok(())
    }

    async fn position(&mut self) -> Result<(f64, Option<f64>), PlaybackError> {
        // Both properties are unavailable until a file is loaded.
        let current = self
            .command(json!(["get_property", "time-pos"]))
            .await
            .ok()
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        let duration = self
            .command(json!(["get_property", "duration"]))
            .await
            .ok()
            .and_then(|v| v.as_f64());
        Ok((current, duration))
    }

    async fn shutdown(&mut self) -> Result<(), PlaybackError> {
        debug!("Shutting down mpv");
        let _ = self.command(json!(["quit"])).await;
        if let Some(mut child) = self.process.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if self.socket_path.exists() {
            let _ = fs::remove_file(&self.socket_path);
        }
        Ok(())
    }
}

impl Drop for MpvBackend {
    fn drop(&mut self) {
        if let Some(mut child) = self.process.take() {
            match child.try_wait() {
                Ok(Some(_)) => debug!("mpv already exited"),
                _ => {
                    debug!("Terminating mpv on cleanup");
                    let _ = child.kill();
                    let _ = child.wait();
                }
            }
        }
        if self.socket_path.exists() {
            let _ = fs::remove_file(&self.socket_path);
        }
    }
}
