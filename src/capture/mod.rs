//! Stream capture: an external collaborator that shells out to `ffmpeg` to
//! remux a room's HLS pull URL into a local container file. Grounded in the
//! teacher's `ffmpeg_handler.rs` subprocess style (spawn with piped
//! stdin/stderr, a dedicated stderr-reader task, graceful stop via stdin),
//! translated to `tokio::process::Command` since this crate is async
//! end-to-end rather than thread-based.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};

use crate::error::{Error, Result};

const STOP_GRACE: Duration = Duration::from_secs(2);

fn find_ffmpeg() -> Result<PathBuf> {
    which::which("ffmpeg").map_err(|_| Error::FfmpegNotFound)
}

/// `-http_proxy` only makes sense for an `http://`/`https://` proxy; ffmpeg
/// has no concept of a SOCKS proxy for this flag.
fn proxy_flag(proxy_url: &str) -> Option<(&'static str, String)> {
    if proxy_url.starts_with("http://") || proxy_url.starts_with("https://") {
        Some(("-http_proxy", proxy_url.to_string()))
    } else {
        None
    }
}

/// A running `ffmpeg -i <hls_url> -c copy <path>` remux, driven by
/// `RoomInfo.stream_url.hls_pull_url`. One instance per capture; dropping it
/// without calling [`StreamCapture::stop`] leaves the child process running.
pub struct StreamCapture {
    child: Child,
    stderr_reader: tokio::task::JoinHandle<()>,
    output_path: PathBuf,
}

impl StreamCapture {
    /// Starts the capture. `proxy_url`, when set, is forwarded to ffmpeg via
    /// `-http_proxy` (only for `http(s)://` proxies; other schemes are
    /// ignored, matching the push channel's own CONNECT-proxy limitation).
    pub async fn start(
        hls_url: &str,
        output_path: impl Into<PathBuf>,
        proxy_url: Option<&str>,
    ) -> Result<Self> {
        if hls_url.is_empty() {
            return Err(Error::UrlNotFound);
        }
        let ffmpeg_path = find_ffmpeg()?;
        let output_path = output_path.into();

        let mut args: Vec<String> = Vec::new();
        if let Some(proxy) = proxy_url.and_then(proxy_flag) {
            args.push(proxy.0.to_string());
            args.push(proxy.1);
        }
        args.push("-y".to_string());
        args.push("-i".to_string());
        args.push(hls_url.to_string());
        args.push("-c".to_string());
        args.push("copy".to_string());
        args.push(output_path.to_string_lossy().to_string());

        log::info!("starting ffmpeg capture to {}", output_path.display());

        let mut child = Command::new(&ffmpeg_path)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(Error::Io)?;

        let stderr = child.stderr.take().expect("stderr was piped");
        let stderr_reader = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                log::debug!("[ffmpeg] {line}");
            }
        });

        Ok(StreamCapture {
            child,
            stderr_reader,
            output_path,
        })
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Asks ffmpeg to finish the current segment and exit cleanly by writing
    /// `q` to its stdin, then gives it [`STOP_GRACE`] before killing it.
    pub async fn stop(mut self) -> Result<()> {
        if let Some(stdin) = self.child.stdin.as_mut() {
            let _ = stdin.write_all(b"q\n").await;
            let _ = stdin.flush().await;
        }

        match tokio::time::timeout(STOP_GRACE, self.child.wait()).await {
            Ok(status) => {
                status.map_err(Error::Io)?;
            }
            Err(_) => {
                log::warn!("ffmpeg did not exit within the grace period, killing it");
                self.child.kill().await.map_err(Error::Io)?;
                let _ = self.child.wait().await;
            }
        }

        let _ = self.stderr_reader.await;
        Ok(())
    }
}
