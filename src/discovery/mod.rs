//! Discovery: resolving a username to a room ID, and fetching room/gift/
//! price metadata that doesn't require the signed handshake.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::http::{Base, RequestOptions, Transport};
use crate::model::room::{
    CheckAliveEntry, GiftInfo, GiftInfoResponse, PriceList, RoomInfo, RoomInfoResponse,
};

const URL_USER_LIVE: &str = "live/";
const URL_ROOM_INFO: &str = "room/info/";
const URL_GIFT_INFO: &str = "gift/list/";
const URL_PRICE_LIST: &str = "wallet_api/fs/diamond";
const URL_CHECK_ALIVE: &str = "room/check_alive/";
const VERIFY_SENTINEL: &str = "tiktok-verify-page";

fn sigi_state_patterns() -> &'static [Regex; 2] {
    static PATTERNS: OnceLock<[Regex; 2]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r#"(?s)<script id="SIGI_STATE"[^>]+>(.*?)</script>"#).unwrap(),
            Regex::new(r#"(?s)<script id="sigi-persisted-data">window\['SIGI_STATE'\]=(.*);w"#)
                .unwrap(),
        ]
    })
}

#[derive(Debug, Deserialize)]
struct LiveRoomUserInfo {
    user: LiveRoomUser,
}

#[derive(Debug, Deserialize)]
struct LiveRoom {
    #[serde(rename = "liveRoomUserInfo")]
    live_room_user_info: Option<LiveRoomUserInfo>,
}

#[derive(Debug, Deserialize)]
struct SigiState {
    #[serde(rename = "liveRoom")]
    live_room: Option<LiveRoom>,
}

/// Publicly-visible user/room info scraped from a creator's live page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LiveRoomUser {
    #[serde(default, rename = "roomId")]
    pub room_id: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default, rename = "uniqueId")]
    pub unique_id: String,
}

/// Resolves usernames to room IDs and fetches metadata that doesn't
/// require a signed request.
pub(crate) struct DiscoveryClient {
    transport: Transport,
}

impl DiscoveryClient {
    pub fn new(transport: Transport) -> Self {
        DiscoveryClient { transport }
    }

    /// Scrapes `SIGI_STATE` out of a creator's live page HTML, the same way
    /// the original implementation does via two fallback regexes (TikTok has
    /// shipped both page layouts in the wild).
    pub async fn get_live_room_user_info(&self, username: &str) -> Result<LiveRoomUser> {
        let endpoint = format!("@{username}/{URL_USER_LIVE}");
        let opts = RequestOptions {
            endpoint: &endpoint,
            base: Base::TikTok,
            is_post: false,
            query: HashMap::new(),
            extra_headers: HashMap::new(),
            base_override: None,
        };
        let resp = match self.transport.send(opts).await {
            Ok(resp) => resp,
            Err(Error::Http { .. }) => return Err(Error::UserNotFound),
            Err(err) => return Err(err),
        };
        let body = String::from_utf8_lossy(&resp.body);

        if body.contains(VERIFY_SENTINEL) {
            return Err(Error::Captcha);
        }

        let mut captured = None;
        for re in sigi_state_patterns() {
            if let Some(caps) = re.captures(&body) {
                captured = caps.get(1).map(|m| m.as_str().to_string());
                break;
            }
        }
        let Some(json) = captured else {
            return Err(Error::IpBlockedOrBanned);
        };

        let state: SigiState = serde_json::from_str(&json)?;
        let user = state
            .live_room
            .and_then(|r| r.live_room_user_info)
            .map(|i| i.user)
            .ok_or(Error::UserNotFound)?;
        Ok(user)
    }

    pub async fn get_room_id(&self, username: &str) -> Result<String> {
        let info = self.get_live_room_user_info(username).await?;
        if info.room_id.is_empty() {
            return Err(Error::UserOffline);
        }
        Ok(info.room_id)
    }

    /// `status == 4` means the stream has ended; the caller still gets the
    /// room info back so it can surface details alongside the error.
    pub async fn get_room_info(&self, room_id: &str) -> Result<RoomInfo> {
        let mut query = HashMap::new();
        query.insert("room_id".to_string(), room_id.to_string());
        let opts = RequestOptions {
            endpoint: URL_ROOM_INFO,
            base: Base::Webcast,
            is_post: false,
            query,
            extra_headers: HashMap::new(),
            base_override: None,
        };
        let resp = self.transport.send(opts).await?;
        let parsed: RoomInfoResponse = serde_json::from_slice(&resp.body)?;
        if parsed.room_info.has_ended() {
            return Err(Error::LiveHasEnded {
                room_info: Box::new(parsed.room_info),
            });
        }
        Ok(parsed.room_info)
    }

    pub async fn get_gift_info(&self, room_id: &str) -> Result<GiftInfo> {
        let mut query = HashMap::new();
        query.insert("room_id".to_string(), room_id.to_string());
        let opts = RequestOptions {
            endpoint: URL_GIFT_INFO,
            base: Base::Webcast,
            is_post: false,
            query,
            extra_headers: HashMap::new(),
            base_override: None,
        };
        let resp = self.transport.send(opts).await?;
        let parsed: GiftInfoResponse = serde_json::from_slice(&resp.body)?;
        Ok(parsed.gift_info)
    }

    /// Coin prices in USD cents and local-currency cents. To fetch a
    /// different currency's prices, route the transport through a proxy in
    /// that country.
    pub async fn get_price_list(&self) -> Result<PriceList> {
        let opts = RequestOptions {
            endpoint: URL_PRICE_LIST,
            base: Base::Webcast,
            is_post: false,
            query: HashMap::new(),
            extra_headers: HashMap::new(),
            base_override: None,
        };
        let resp = self.transport.send(opts).await?;
        let parsed: PriceList = serde_json::from_slice(&resp.body)?;
        Ok(parsed)
    }

    pub async fn is_live(&self, room_id: &str) -> Result<bool> {
        let mut query = HashMap::new();
        query.insert("room_ids".to_string(), room_id.to_string());
        let opts = RequestOptions {
            endpoint: URL_CHECK_ALIVE,
            base: Base::Webcast,
            is_post: false,
            query,
            extra_headers: HashMap::new(),
            base_override: None,
        };
        let resp = self.transport.send(opts).await?;
        let parsed: CheckAliveResponse = serde_json::from_slice(&resp.body)?;
        resolve_alive(&parsed.data, room_id)
    }
}

#[derive(Debug, Deserialize)]
struct CheckAliveResponse {
    #[serde(default, rename = "data")]
    data: Vec<CheckAliveEntry>,
}

/// A `room_id` absent from `data` is an error, not "not alive" — the
/// endpoint only omits entries it doesn't recognize.
fn resolve_alive(data: &[CheckAliveEntry], room_id: &str) -> Result<bool> {
    match data.iter().find(|e| e.room_id_str == room_id) {
        Some(entry) => Ok(entry.alive),
        None => Err(Error::UserNotFound),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(body: &str) -> Option<String> {
        sigi_state_patterns()
            .iter()
            .find_map(|re| re.captures(body).and_then(|c| c.get(1)).map(|m| m.as_str().to_string()))
    }

    #[test]
    fn first_pattern_extracts_script_tag_json() {
        let body = r#"<html><body><script id="SIGI_STATE" type="application/json">{"liveRoom":{"liveRoomUserInfo":{"user":{"roomId":"123"}}}}</script></body></html>"#;
        let json = extract(body).unwrap();
        let state: SigiState = serde_json::from_str(&json).unwrap();
        let user = state.live_room.unwrap().live_room_user_info.unwrap().user;
        assert_eq!(user.room_id, "123");
    }

    #[test]
    fn second_pattern_extracts_persisted_data_json() {
        let body = r#"<script id="sigi-persisted-data">window['SIGI_STATE']={"liveRoom":{"liveRoomUserInfo":{"user":{"roomId":"456"}}}};window.SIGI_RETRY={}</script>"#;
        let json = extract(body).unwrap();
        let state: SigiState = serde_json::from_str(&json).unwrap();
        let user = state.live_room.unwrap().live_room_user_info.unwrap().user;
        assert_eq!(user.room_id, "456");
    }

    #[test]
    fn neither_pattern_matches_unrelated_html() {
        let body = "<html><body>not a live page</body></html>";
        assert!(extract(body).is_none());
    }

    #[test]
    fn sigi_state_missing_live_room_user_info_deserializes_to_none() {
        let json = r#"{"liveRoom":{}}"#;
        let state: SigiState = serde_json::from_str(json).unwrap();
        assert!(state.live_room.unwrap().live_room_user_info.is_none());
    }

    fn alive_entry(room_id: &str, alive: bool) -> CheckAliveEntry {
        CheckAliveEntry {
            room_id_str: room_id.to_string(),
            alive,
        }
    }

    #[test]
    fn resolve_alive_returns_true_for_matching_live_room() {
        let data = vec![alive_entry("1", true)];
        assert!(resolve_alive(&data, "1").unwrap());
    }

    #[test]
    fn resolve_alive_returns_false_for_matching_ended_room() {
        let data = vec![alive_entry("1", false)];
        assert!(!resolve_alive(&data, "1").unwrap());
    }

    #[test]
    fn resolve_alive_errors_when_room_id_is_absent_from_response() {
        let data = vec![alive_entry("2", true)];
        assert!(matches!(resolve_alive(&data, "1"), Err(Error::UserNotFound)));
    }
}
