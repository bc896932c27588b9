//! Push-channel client: the websocket that carries live events once the
//! signed handshake hands back a `push_server` URL and route params.
//!
//! The original's `tryConnectionUpgrade` spins up three collaborating
//! activities per session: a reader loop decoding frames into events, a
//! keepalive ticker, and an ack responder folded into the reader (this
//! implementation forwards acks to the keepalive task instead, since
//! `tokio-tungstenite` only allows one writer once the stream is split).

mod dial;
mod queue;
pub(crate) mod trace;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;

use crate::codec;
use crate::error::Result;
use crate::model::event::DisconnectEvent;
use crate::model::Event;
use trace::TraceSender;

pub(crate) use queue::EventQueue;

const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(10);
/// Matches `DEFAULT_EVENTS_CHAN_SIZE` in the original: once full, the oldest
/// queued event is dropped to make room rather than blocking the reader.
pub(crate) const DEFAULT_EVENTS_CAPACITY: usize = 100;

pub(crate) struct PushChannelParams {
    pub push_server: String,
    pub route_params: HashMap<String, String>,
    pub room_id: String,
    pub cookie_header: Option<String>,
    pub proxy_url: Option<String>,
    pub enable_experimental_events: bool,
    pub trace: Option<TraceSender>,
    /// The session's event queue; decoded events are pushed directly onto it
    /// so handshake backlog and live events share one ordered stream.
    pub events: Arc<EventQueue>,
    /// The session's cursor, shared so each decoded frame can advance it in
    /// place (mirrors `l.cursor = response.Cursor` in the original).
    pub cursor: Arc<tokio::sync::Mutex<String>>,
    /// The session's own cancel token. Reused directly (not wrapped in a
    /// child token) so a `StreamEnded` control message observed here tears
    /// down the whole session, and so `LiveSession::close` tears down these
    /// tasks without a separate signal.
    pub cancel: CancellationToken,
}

/// A connected push-channel socket. Holds the reader/keepalive task handles
/// so the session's `close()` can wait for both to actually finish.
pub(crate) struct PushChannel {
    reader: tokio::task::JoinHandle<()>,
    keepalive: tokio::task::JoinHandle<()>,
}

impl PushChannel {
    pub async fn connect(params: PushChannelParams) -> Result<Self> {
        let stream = dial::dial(&params).await?;
        let (mut write, mut read) = stream.split();

        let cancel = params.cancel;
        let events = params.events;

        let room_id = params.room_id.clone();
        let enable_experimental_events = params.enable_experimental_events;
        let trace = params.trace.clone();
        let reader_cancel = cancel.clone();
        let reader_events = events.clone();
        let reader_cursor = params.cursor.clone();
        let ack_trace = trace.clone();

        // The keepalive task owns the sink so acks are forwarded to it over
        // a small queue rather than splitting the sink a second time.
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<Vec<u8>>(8);

        let reader = tokio::spawn(async move {
            let mut close_reason = "push channel closed";
            loop {
                tokio::select! {
                    _ = reader_cancel.cancelled() => {
                        close_reason = "session cancelled";
                        break;
                    }
                    frame = read.next() => {
                        let Some(frame) = frame else {
                            close_reason = "server closed the socket";
                            break;
                        };
                        let frame = match frame {
                            Ok(f) => f,
                            Err(e) => {
                                log::warn!("push-channel read error: {e}");
                                close_reason = "read error";
                                break;
                            }
                        };
                        match frame {
                            WsMessage::Binary(bytes) => {
                                if let Some(t) = &trace {
                                    t.send_inbound(&bytes);
                                }
                                match codec::decode_frame(&bytes, enable_experimental_events, &room_id) {
                                    Ok(Some(batch)) => {
                                        *reader_cursor.lock().await = batch.cursor.clone();
                                        if batch.needs_ack {
                                            let ack = codec::encode_ack(batch.log_id, batch.internal_ext);
                                            let _ = outbound_tx.send(ack).await;
                                        }
                                        let mut stream_ended = false;
                                        for event in batch.events {
                                            if let Event::Control(ref c) = event {
                                                if c.action.ends_stream() {
                                                    stream_ended = true;
                                                }
                                            }
                                            reader_events.push(event);
                                        }
                                        if stream_ended {
                                            log::warn!("stream ended, tearing down session {room_id}");
                                            close_reason = "stream ended";
                                            reader_cancel.cancel();
                                            break;
                                        }
                                    }
                                    Ok(None) => {}
                                    Err(e) => log::warn!("failed to decode push-channel frame: {e}"),
                                }
                            }
                            WsMessage::Close(frame) => {
                                log::warn!("server closed push channel: {frame:?}");
                                close_reason = "server closed the socket";
                                break;
                            }
                            _ => {}
                        }
                    }
                }
            }
            reader_cancel.cancel();
            reader_events.push(Event::Disconnect(DisconnectEvent {
                room_info: None,
                reason: close_reason.to_string(),
            }));
            reader_events.close();
        });

        let keepalive_cancel = cancel.clone();
        let keepalive_trace = trace.clone();
        let keepalive = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(KEEPALIVE_INTERVAL);
            ticker.tick().await; // first tick fires immediately; skip it
            loop {
                tokio::select! {
                    _ = keepalive_cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let frame = codec::keepalive_frame();
                        if let Some(t) = &keepalive_trace {
                            t.send_outbound(&frame);
                        }
                        if write.send(WsMessage::Binary(frame)).await.is_err() {
                            break;
                        }
                    }
                    Some(ack) = outbound_rx.recv() => {
                        if let Some(t) = &ack_trace {
                            t.send_outbound(&ack);
                        }
                        if write.send(WsMessage::Binary(ack)).await.is_err() {
                            break;
                        }
                    }
                }
            }
            let _ = write.close().await;
        });

        Ok(PushChannel { reader, keepalive })
    }

    /// Waits for the reader and keepalive tasks to exit. Callers cancel the
    /// shared token first (directly, or via `LiveSession::close`) — this
    /// method only joins, it doesn't itself signal cancellation.
    pub async fn join(self) {
        let _ = self.reader.await;
        let _ = self.keepalive.await;
    }
}
