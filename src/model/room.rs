//! Room metadata fetched via the discovery client's JSON endpoints.

use serde::Deserialize;

/// TikTok room status code meaning the broadcast has ended.
pub const ROOM_STATUS_ENDED: i32 = 4;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamUrl {
    #[serde(default, rename = "hls_pull_url")]
    pub hls_pull_url: String,
    #[serde(default, rename = "rtmp_pull_url")]
    pub rtmp_pull_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoomOwner {
    #[serde(default)]
    pub username: String,
    #[serde(default, rename = "id_str")]
    pub id_str: String,
}

/// Room metadata returned by `room/info/`.
///
/// `status == 4` means the stream has ended; callers still get the struct
/// back alongside `Error::LiveHasEnded` (see spec §8 boundary behavior).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoomInfo {
    #[serde(default)]
    pub status: i32,
    #[serde(default)]
    pub owner: RoomOwner,
    #[serde(default, rename = "stream_url")]
    pub stream_url: StreamUrl,
    #[serde(default, rename = "create_time")]
    pub create_time: i64,
    #[serde(default)]
    pub title: String,
}

impl RoomInfo {
    pub fn has_ended(&self) -> bool {
        self.status == ROOM_STATUS_ENDED
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RoomInfoResponse {
    #[serde(default, rename = "room_info")]
    pub room_info: RoomInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GiftEntry {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub diamond_count: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GiftInfo {
    #[serde(default)]
    pub gifts: Vec<GiftEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GiftInfoResponse {
    #[serde(default, rename = "gift_info")]
    pub gift_info: GiftInfo,
}

/// Price list entry in USD cents, and the local-currency equivalent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PriceListEntry {
    #[serde(default)]
    pub diamond_count: i64,
    #[serde(default)]
    pub usd_cents: i64,
    #[serde(default)]
    pub local_cents: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PriceList {
    #[serde(default)]
    pub prices: Vec<PriceListEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CheckAliveEntry {
    #[serde(default, rename = "room_id_str")]
    pub room_id_str: String,
    #[serde(default)]
    pub alive: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_info_status_four_means_ended() {
        let json = r#"{"room_info":{"status":4,"stream_url":{"hls_pull_url":"https://x/hls.m3u8"}}}"#;
        let parsed: RoomInfoResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.room_info.has_ended());
        assert_eq!(parsed.room_info.stream_url.hls_pull_url, "https://x/hls.m3u8");
    }

    #[test]
    fn room_info_missing_fields_default_rather_than_error() {
        let json = r#"{"room_info":{}}"#;
        let parsed: RoomInfoResponse = serde_json::from_str(json).unwrap();
        assert!(!parsed.room_info.has_ended());
        assert_eq!(parsed.room_info.title, "");
    }

    #[test]
    fn gift_info_response_unwraps_nested_gifts() {
        let json = r#"{"gift_info":{"gifts":[{"id":1,"name":"Rose","diamond_count":1}]}}"#;
        let parsed: GiftInfoResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.gift_info.gifts.len(), 1);
        assert_eq!(parsed.gift_info.gifts[0].name, "Rose");
    }
}
