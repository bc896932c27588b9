//! Live Session: per-room supervisor tying discovery, handshake, and the
//! push-channel client together. One instance per tracked room; the
//! session's `events` queue is the caller's sole point of consumption,
//! matching `Client.trackRoom` in the original.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::discovery::DiscoveryClient;
use crate::error::Result;
use crate::handshake;
use crate::http::Transport;
use crate::model::event::DisconnectEvent;
use crate::model::{Event, GiftInfo};
use crate::push::{self, EventQueue, PushChannel, PushChannelParams};
use crate::signer::SignerClient;

/// Dependencies shared by every session, owned by the [`crate::hub::ClientHub`]
/// that spawns it. Cheap to clone (everything inside is an `Arc`).
#[derive(Clone)]
pub(crate) struct SessionDeps {
    pub transport: Transport,
    pub signer: Arc<SignerClient>,
    pub discovery: Arc<DiscoveryClient>,
    pub config: Arc<ClientConfig>,
    pub session_counter: Arc<std::sync::atomic::AtomicUsize>,
    pub hub_cancel: CancellationToken,
}

/// Per-room supervisor. Owns the bounded event queue, the optional
/// push-channel socket, and this session's slice of the cancellation tree.
pub struct LiveSession {
    room_id: String,
    cursor: Arc<Mutex<String>>,
    events: Arc<EventQueue>,
    cancel: CancellationToken,
    push_channel: Mutex<Option<PushChannel>>,
    close_gate: AtomicBool,
    deps: SessionDeps,
    gift_info: tokio::sync::OnceCell<GiftInfo>,
}

impl LiveSession {
    /// Equivalent of `Client.trackRoom(roomId)`: allocates the session,
    /// performs the signed handshake, drains the backlog into the event
    /// queue, then attempts the push-channel upgrade. A handshake failure
    /// unwinds the session counter and returns the error without creating a
    /// session.
    pub(crate) async fn connect(deps: SessionDeps, room_id: String) -> Result<Arc<Self>> {
        deps.session_counter.fetch_add(1, Ordering::SeqCst);

        let result = Self::connect_inner(deps.clone(), room_id).await;
        if result.is_err() {
            deps.session_counter.fetch_sub(1, Ordering::SeqCst);
        }
        result
    }

    async fn connect_inner(deps: SessionDeps, room_id: String) -> Result<Arc<Self>> {
        let events = Arc::new(EventQueue::new(push::DEFAULT_EVENTS_CAPACITY));
        let cancel = deps.hub_cancel.child_token();

        let room_data = match handshake::fetch_room_data(
            &deps.signer,
            &room_id,
            None,
            deps.config.enable_experimental_events,
        )
        .await
        {
            Ok(data) => data,
            Err(e) => {
                events.close();
                return Err(e);
            }
        };

        for event in room_data.backlog {
            events.push(event);
        }

        let session = Arc::new(LiveSession {
            room_id: room_id.clone(),
            cursor: Arc::new(Mutex::new(room_data.cursor)),
            events,
            cancel,
            push_channel: Mutex::new(None),
            close_gate: AtomicBool::new(false),
            deps,
            gift_info: tokio::sync::OnceCell::new(),
        });

        session.try_connection_upgrade(room_data.push_server, room_data.push_params).await;

        Ok(session)
    }

    /// Dials the push channel when the handshake handed back a push server
    /// and route params. Failure here is non-fatal: the session still
    /// exists with whatever backlog it already drained, matching the
    /// original's tolerance for a handshake that returns no live channel
    /// (e.g. a room that's between re-connects).
    async fn try_connection_upgrade(
        self: &Arc<Self>,
        push_server: Option<String>,
        push_params: std::collections::HashMap<String, String>,
    ) {
        let Some(push_server) = push_server else {
            return;
        };
        if push_params.is_empty() {
            return;
        }

        let trace = match &self.deps.config.ws_trace_file {
            Some(path) => match push::trace::spawn(path).await {
                Ok(sender) => Some(sender),
                Err(e) => {
                    log::warn!("failed to open ws trace file: {e}");
                    None
                }
            },
            None => None,
        };

        let proxy_url = match &self.deps.config.proxy {
            crate::config::ProxyConfig::Url { url, .. } => Some(url.clone()),
            crate::config::ProxyConfig::None => std::env::var("ALL_PROXY").ok(),
        };

        let params = PushChannelParams {
            push_server,
            route_params: push_params,
            room_id: self.room_id.clone(),
            cookie_header: self.deps.transport.cookies.snapshot_header(),
            proxy_url,
            enable_experimental_events: self.deps.config.enable_experimental_events,
            trace,
            events: self.events.clone(),
            cursor: self.cursor.clone(),
            cancel: self.cancel.clone(),
        };

        match PushChannel::connect(params).await {
            Ok(channel) => {
                *self.push_channel.lock().await = Some(channel);
                self.deps.signer.track_stream_started();
            }
            Err(e) => {
                log::warn!("push-channel dial failed for room {}: {e}", self.room_id);
            }
        }
    }

    /// Next event off this session's queue, in server order. Returns `None`
    /// once the queue has been closed and drained.
    pub async fn recv(&self) -> Option<Event> {
        self.events.recv().await
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Idempotent teardown: the first caller waits for the push-channel
    /// tasks to exit and decrements the hub's session counter; later callers
    /// observe the gate and return immediately.
    pub async fn close(&self) {
        if self.close_gate.swap(true, Ordering::SeqCst) {
            return;
        }

        self.cancel.cancel();
        if let Some(channel) = self.push_channel.lock().await.take() {
            channel.join().await;
            self.deps.signer.track_stream_stopped();
        } else {
            // No socket was ever opened (handshake-only session or a dial
            // that never succeeded): nothing decoded the backlog's end, so
            // synthesize the queue's closing event ourselves.
            self.events.push(Event::Disconnect(DisconnectEvent {
                room_info: None,
                reason: "session closed".to_string(),
            }));
            self.events.close();
        }

        self.deps.session_counter.fetch_sub(1, Ordering::SeqCst);
    }

    /// Lazily fetches and caches the room's gift catalogue on first call.
    pub async fn gift_info(&self) -> Result<&GiftInfo> {
        self.gift_info
            .get_or_try_init(|| async { self.deps.discovery.get_gift_info(&self.room_id).await })
            .await
    }

    /// The session's pagination cursor: seeded from the handshake's initial
    /// room fetch, then advanced to each push-channel frame's `cursor` as
    /// frames arrive.
    pub async fn cursor(&self) -> String {
        self.cursor.lock().await.clone()
    }
}

/// `Client.trackUser(username)`: resolve `username -> roomId`, then track it.
pub(crate) async fn track_user(deps: SessionDeps, username: &str) -> Result<Arc<LiveSession>> {
    let username = username.strip_prefix('@').unwrap_or(username);
    let room_id = deps.discovery.get_room_id(username).await?;
    LiveSession::connect(deps, room_id).await
}

impl std::fmt::Debug for LiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveSession").field("room_id", &self.room_id).finish()
    }
}

#[cfg(test)]
mod e2e;
