//! Client library for tracking TikTok live-broadcast rooms: HTTP discovery,
//! signed long-poll handshake, binary framed push channel, protobuf demux,
//! and a typed event stream per tracked room. Optional stream capture to a
//! container file is supported via [`capture::StreamCapture`].
//!
//! The entry point is [`ClientHub`]: construct one per process, then call
//! [`ClientHub::track_room`] or [`ClientHub::track_user`] to open a
//! [`LiveSession`] and drain its [`Event`] stream with
//! [`LiveSession::recv`].
//!
//! ```no_run
//! # async fn run() -> tiktok_live::Result<()> {
//! let hub = tiktok_live::ClientHub::new(tiktok_live::ClientConfig::default()).await?;
//! let session = hub.track_user("@some_streamer").await?;
//! while let Some(event) = session.recv().await {
//!     println!("{event:?}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod capture;
mod codec;
mod config;
mod discovery;
mod error;
mod handshake;
mod http;
mod hub;
pub mod model;
mod push;
mod session;
mod signer;

pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{Error, Result};
pub use hub::ClientHub;
pub use model::Event;
pub use session::LiveSession;
