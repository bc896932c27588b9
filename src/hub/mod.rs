//! Client Hub: the process-level facade. Holds the shared HTTP transport
//! (and its cookie jar), the signer client, the global cancellation token,
//! and the active-session counter that every [`crate::session::LiveSession`]
//! increments and decrements.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::discovery::DiscoveryClient;
use crate::error::Result;
use crate::http::Transport;
use crate::model::{GiftInfo, PriceList, RoomInfo};
use crate::session::{self, LiveSession, SessionDeps};
use crate::signer::SignerClient;

/// Process-wide entry point. Construct one per process; it owns the HTTP
/// client, cookie jar, signer client, and the cancellation tree every
/// session hangs off of.
pub struct ClientHub {
    deps: SessionDeps,
}

impl ClientHub {
    /// Builds the shared transport and signer client. Fails if
    /// `config.query_signing_limits` is set and the signer's rate-limits
    /// endpoint is unreachable or returns a non-200 status.
    pub async fn new(config: ClientConfig) -> Result<Self> {
        let (proxy, insecure) = match &config.proxy {
            crate::config::ProxyConfig::Url { url, insecure } => {
                let proxy = reqwest::Proxy::all(url).map_err(|source| {
                    crate::error::Error::Transport {
                        endpoint: "proxy configuration".to_string(),
                        source,
                    }
                })?;
                (Some(proxy), *insecure)
            }
            // Left unset: reqwest reads `HTTP_PROXY`/`HTTPS_PROXY` itself.
            crate::config::ProxyConfig::None => (None, false),
        };

        let transport = Transport::new(proxy, insecure, config.enable_extra_debug)?;
        let discovery = Arc::new(DiscoveryClient::new(transport.clone()));
        let client_name = config.client_name.clone();
        let signer = Arc::new(SignerClient::new(transport.clone(), &config, client_name).await?);

        Ok(ClientHub {
            deps: SessionDeps {
                transport,
                signer,
                discovery,
                config: Arc::new(config),
                session_counter: Arc::new(AtomicUsize::new(0)),
                hub_cancel: CancellationToken::new(),
            },
        })
    }

    /// `Client.trackRoom(roomId)`.
    pub async fn track_room(&self, room_id: impl Into<String>) -> Result<Arc<LiveSession>> {
        LiveSession::connect(self.deps.clone(), room_id.into()).await
    }

    /// `Client.trackUser(username)`: resolves `username -> roomId` via
    /// discovery first. Accepts a leading `@`.
    pub async fn track_user(&self, username: &str) -> Result<Arc<LiveSession>> {
        session::track_user(self.deps.clone(), username).await
    }

    /// `Client.getRoomInfo(username)`: resolves the room and fetches its
    /// metadata without dialing the push channel or allocating a session.
    pub async fn get_room_info(&self, username: &str) -> Result<RoomInfo> {
        let username = username.strip_prefix('@').unwrap_or(username);
        let room_id = self.deps.discovery.get_room_id(username).await?;
        self.deps.discovery.get_room_info(&room_id).await
    }

    /// Gift catalogue for a room, independent of any open session.
    pub async fn get_gift_info(&self, room_id: &str) -> Result<GiftInfo> {
        self.deps.discovery.get_gift_info(room_id).await
    }

    /// Coin price list; not tied to any particular room.
    pub async fn get_price_list(&self) -> Result<PriceList> {
        self.deps.discovery.get_price_list().await
    }

    /// Number of sessions that have been created but not yet finished
    /// closing (`P1` in the design's testable properties).
    pub fn session_count(&self) -> usize {
        self.deps.session_counter.load(Ordering::SeqCst)
    }

    /// Cancels every session spawned from this hub. Advisory: sessions poll
    /// this on their own loop boundaries and still need their individual
    /// `close()` awaited to observe full teardown.
    pub fn shutdown(&self) {
        self.deps.hub_cancel.cancel();
    }
}
