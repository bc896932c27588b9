//! Error types surfaced to callers of this crate.
//!
//! One variant per semantic tag from the design; transport/decode failures are
//! wrapped rather than re-stated, mirroring `PlatformError` in the teacher's
//! chat connector trait.

use crate::model::RoomInfo;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("user might be offline, room ID not found")]
    UserOffline,

    #[error("user not found")]
    UserNotFound,

    #[error("user info not found")]
    UserInfoNotFound,

    #[error("your IP or country might be blocked by TikTok")]
    IpBlockedOrBanned,

    #[error("captcha detected, unable to proceed")]
    Captcha,

    #[error("rate limit exceeded calling {url}")]
    RateLimitExceeded { url: String },

    #[error("livestream has ended")]
    LiveHasEnded { room_info: Box<RoomInfo> },

    #[error("unable to download stream, URL not found")]
    UrlNotFound,

    #[error("please install ffmpeg before downloading")]
    FfmpegNotFound,

    #[error("received HTTP status {status} from {url}")]
    Http { status: u16, url: String },

    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to decode protobuf message: {0}")]
    ProtobufDecode(#[from] prost::DecodeError),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("X-Set-TT-Cookie header was not parsable: {0}")]
    CookieParse(String),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("cannot upgrade connection without a push-channel URL and params")]
    NoPushChannel,

    #[error("signer limits request failed with status {0}")]
    SignerLimits(u16),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
