use crate::app::events::{Event, PlayerEvent};
use anyhow::Context;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::UnixStream,
    process::{Child, Command},
    sync::mpsc,
};

/// mpv running headless, controlled over its JSON IPC socket.
///
/// Playback position, duration and pause state arrive as [`PlayerEvent`]s on
/// the app channel.
#[derive(Debug)]
pub struct MpvHandle {
    child: Child,
    socket_path: PathBuf,
    writer: tokio::sync::Mutex<tokio::io::WriteHalf<UnixStream>>,
    request_id: AtomicU64,
}

impl MpvHandle {
    pub async fn spawn(
        event_tx: mpsc::Sender<Event>,
        audio_device: Option<&str>,
        log_file: Option<&Path>,
    ) -> anyhow::Result<Self> {
        let socket_path =
            std::env::temp_dir().join(format!("singalong-mpv-{}.sock", std::process::id()));
        let _ = std::fs::remove_file(&socket_path);

        let mut cmd = Command::new("mpv");
        cmd.args([
            "--no-video",
            "--idle=yes",
            "--input-terminal=no",
            "--really-quiet",
            // Stay on the last frame so the final lyric line remains highlighted
            "--keep-open=yes",
        ]);
        if let Some(dev) = audio_device {
            cmd.arg(format!("--audio-device={dev}"));
        }
        if let Some(p) = log_file {
            cmd.arg(format!("--log-file={}", p.display()));
        }
        let child = cmd
            .arg(format!("--input-ipc-server={}", socket_path.display()))
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .context("spawn mpv")?;

        // mpv creates the socket shortly after starting
        let stream = connect_with_retry(&socket_path).await?;
        let (reader, writer) = tokio::io::split(stream);

        tokio::spawn(read_events_loop(reader, event_tx));

        let this = Self {
            child,
            socket_path,
            writer: tokio::sync::Mutex::new(writer),
            request_id: AtomicU64::new(1),
        };

        this.command(json!({"command":["request_log_messages", "warn"]}))
            .await?;

        this.command(json!({"command":["observe_property", 1, "time-pos"]}))
            .await?;
        this.command(json!({"command":["observe_property", 2, "duration"]}))
            .await?;
        this.command(json!({"command":["observe_property", 3, "pause"]}))
            .await?;
        this.command(json!({"command":["observe_property", 4, "eof-reached"]}))
            .await?;

        tracing::debug!(socket = %this.socket_path.display(), "mpv started");
        Ok(this)
    }

    pub async fn load_file(&self, path: &Path) -> anyhow::Result<()> {
        let path = path.to_string_lossy();
        self.command(json!({"command":["loadfile", path, "replace"]}))
            .await
    }

    pub async fn toggle_pause(&self) -> anyhow::Result<()> {
        self.command(json!({"command":["cycle", "pause"]})).await
    }

    pub async fn set_pause(&self, paused: bool) -> anyhow::Result<()> {
        self.command(json!({"command":["set_property", "pause", paused]}))
            .await
    }

    pub async fn seek_absolute(&self, seconds: f64) -> anyhow::Result<()> {
        self.command(json!({"command":["seek", seconds, "absolute"]}))
            .await
    }

    /// Unload the current file; mpv stays idle
    pub async fn stop(&self) -> anyhow::Result<()> {
        self.command(json!({"command":["stop"]})).await
    }

    pub async fn set_volume(&self, volume_0_100: u8) -> anyhow::Result<()> {
        self.command(json!({"command":["set_property", "volume", volume_0_100]}))
            .await
    }

    async fn command(&self, mut v: serde_json::Value) -> anyhow::Result<()> {
        // Tagged requests get structured errors back on the IPC stream
        if v.get("request_id").is_none() {
            let id = self.request_id.fetch_add(1, Ordering::Relaxed);
            if let serde_json::Value::Object(ref mut o) = v {
                o.insert("request_id".to_string(), serde_json::Value::from(id));
            }
        }
        let mut w = self.writer.lock().await;
        let mut line = serde_json::to_vec(&v).context("encode mpv json")?;
        line.push(b'\n');
        w.write_all(&line).await.context("write mpv ipc")?;
        w.flush().await.context("flush mpv ipc")?;
        Ok(())
    }
}

impl Drop for MpvHandle {
    fn drop(&mut self) {
        let _ = self.child.start_kill();
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

async fn connect_with_retry(path: &Path) -> anyhow::Result<UnixStream> {
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
    loop {
        match UnixStream::connect(path).await {
            Ok(s) => return Ok(s),
            Err(e) => {
                if tokio::time::Instant::now() > deadline {
                    return Err(e).with_context(|| format!("connect to mpv ipc {}", path.display()));
                }
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            }
        }
    }
}

async fn read_events_loop(reader: tokio::io::ReadHalf<UnixStream>, event_tx: mpsc::Sender<Event>) {
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let Ok(v) = serde_json::from_str::<serde_json::Value>(&line) else {
            continue;
        };
        if let Some(pe) = map_mpv_message(&v)
            && event_tx.send(Event::Player(pe)).await.is_err()
        {
            break;
        }
    }
    tracing::debug!("mpv event stream closed");
}

/// Command replies with a non-success status become errors; everything
/// else goes through the event mapping.
fn map_mpv_message(v: &serde_json::Value) -> Option<PlayerEvent> {
    if let (Some(_rid), Some(err)) = (v.get("request_id"), v.get("error"))
        && let Some(err_s) = err.as_str()
    {
        return (err_s != "success").then(|| PlayerEvent::Error(format!("mpv ipc error: {err_s}")));
    }
    map_mpv_event(v)
}

fn map_mpv_event(v: &serde_json::Value) -> Option<PlayerEvent> {
    match v.get("event")?.as_str()? {
        "property-change" => {
            let name = v.get("name")?.as_str()?;
            match name {
                // time-pos is null while nothing is loaded
                "time-pos" => Some(PlayerEvent::Position {
                    seconds: v.get("data")?.as_f64()?,
                }),
                "duration" => Some(PlayerEvent::Duration {
                    seconds: v.get("data")?.as_f64().unwrap_or(0.0),
                }),
                "pause" => {
                    let paused = v.get("data")?.as_bool().unwrap_or(false);
                    Some(if paused { PlayerEvent::Paused } else { PlayerEvent::Started })
                }
                "eof-reached" => {
                    let eof = v.get("data")?.as_bool().unwrap_or(false);
                    if eof { Some(PlayerEvent::Ended) } else { None }
                }
                _ => None,
            }
        }
        "end-file" => {
            let reason = v.get("reason").and_then(|x| x.as_str()).unwrap_or("");
            match reason {
                "error" => {
                    let err = v.get("file_error").or_else(|| v.get("error"));
                    let err = err.and_then(|x| x.as_str()).unwrap_or("unknown");
                    Some(PlayerEvent::Error(format!("mpv could not play file: {err}")))
                }
                // A replaced file is not the end of playback
                "redirect" | "stop" => None,
                _ => Some(PlayerEvent::Ended),
            }
        }
        "log-message" => {
            let level = v.get("level")?.as_str().unwrap_or("info");
            let text = v.get("text")?.as_str().unwrap_or("").trim();
            if (level == "warn" || level == "error") && !text.is_empty() {
                Some(PlayerEvent::Error(format!("mpv {level}: {text}")))
            } else {
                None
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(raw: &str) -> Option<PlayerEvent> {
        map_mpv_message(&serde_json::from_str(raw).unwrap())
    }

    #[test]
    fn test_property_changes() {
        assert_eq!(
            map(r#"{"event":"property-change","id":1,"name":"time-pos","data":12.5}"#),
            Some(PlayerEvent::Position { seconds: 12.5 })
        );
        assert_eq!(
            map(r#"{"event":"property-change","id":2,"name":"duration","data":201.0}"#),
            Some(PlayerEvent::Duration { seconds: 201.0 })
        );
        assert_eq!(
            map(r#"{"event":"property-change","id":3,"name":"pause","data":true}"#),
            Some(PlayerEvent::Paused)
        );
        assert_eq!(
            map(r#"{"event":"property-change","id":3,"name":"pause","data":false}"#),
            Some(PlayerEvent::Started)
        );
        assert_eq!(
            map(r#"{"event":"property-change","id":4,"name":"eof-reached","data":true}"#),
            Some(PlayerEvent::Ended)
        );
    }

    #[test]
    fn test_unloaded_time_pos_is_ignored() {
        assert_eq!(
            map(r#"{"event":"property-change","id":1,"name":"time-pos"}"#),
            None
        );
        assert_eq!(
            map(r#"{"event":"property-change","id":1,"name":"time-pos","data":null}"#),
            None
        );
    }

    #[test]
    fn test_command_replies() {
        assert_eq!(map(r#"{"request_id":3,"error":"success","data":null}"#), None);
        assert_eq!(
            map(r#"{"request_id":4,"error":"property unavailable"}"#),
            Some(PlayerEvent::Error("mpv ipc error: property unavailable".into()))
        );
    }

    #[test]
    fn test_end_file() {
        assert_eq!(map(r#"{"event":"end-file","reason":"eof"}"#), Some(PlayerEvent::Ended));
        assert_eq!(map(r#"{"event":"end-file","reason":"stop"}"#), None);
        assert_eq!(
            map(r#"{"event":"end-file","reason":"error","file_error":"unrecognized file format"}"#),
            Some(PlayerEvent::Error(
                "mpv could not play file: unrecognized file format".into()
            ))
        );
    }
}
