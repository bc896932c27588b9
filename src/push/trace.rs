//! Writes push-channel frames to the `--enable-ws-trace` file as
//! `<timestamp_ms> <direction> <hex>\n` lines, one per frame, each stamped
//! with the UTC millisecond time it was captured.

use std::path::Path;

use chrono::Utc;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;

pub(crate) struct TraceEntry {
    pub timestamp_ms: i64,
    pub direction: &'static str,
    pub hex: String,
}

#[derive(Clone)]
pub(crate) struct TraceSender(mpsc::Sender<TraceEntry>);

impl TraceSender {
    pub fn send_outbound(&self, bytes: &[u8]) {
        let _ = self.0.try_send(TraceEntry {
            timestamp_ms: Utc::now().timestamp_millis(),
            direction: "=>",
            hex: hex::encode(bytes),
        });
    }

    pub fn send_inbound(&self, bytes: &[u8]) {
        let _ = self.0.try_send(TraceEntry {
            timestamp_ms: Utc::now().timestamp_millis(),
            direction: "<=",
            hex: hex::encode(bytes),
        });
    }
}

/// Spawns the trace-writer task, truncating `path` first (a fresh trace per
/// session start, matching `os.Create` in the original).
pub(crate) async fn spawn(path: &Path) -> std::io::Result<TraceSender> {
    let file = File::create(path).await?;
    let mut writer = BufWriter::new(file);
    let (tx, mut rx) = mpsc::channel::<TraceEntry>(50);

    tokio::spawn(async move {
        while let Some(entry) = rx.recv().await {
            let _ = writer.write_all(entry.timestamp_ms.to_string().as_bytes()).await;
            let _ = writer.write_all(b" ").await;
            let _ = writer.write_all(entry.direction.as_bytes()).await;
            let _ = writer.write_all(b" ").await;
            let _ = writer.write_all(entry.hex.as_bytes()).await;
            let _ = writer.write_all(b"\n").await;
            let _ = writer.flush().await;
        }
    });

    Ok(TraceSender(tx))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_timestamped_direction_prefixed_hex_lines() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let before = Utc::now().timestamp_millis();
        let sender = spawn(file.path()).await.unwrap();

        sender.send_outbound(&[0xde, 0xad]);
        sender.send_inbound(&[0xbe, 0xef]);
        drop(sender);

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let after = Utc::now().timestamp_millis();
        let contents = tokio::fs::read_to_string(file.path()).await.unwrap();
        let mut lines = contents.lines();

        let outbound: Vec<&str> = lines.next().unwrap().splitn(3, ' ').collect();
        let ts: i64 = outbound[0].parse().unwrap();
        assert!((before..=after).contains(&ts));
        assert_eq!(outbound[1], "=>");
        assert_eq!(outbound[2], "dead");

        let inbound: Vec<&str> = lines.next().unwrap().splitn(3, ' ').collect();
        assert_eq!(inbound[1], "<=");
        assert_eq!(inbound[2], "beef");

        assert_eq!(lines.next(), None);
    }
}
