//! Handshake: the signed `webcast/fetch/` call that returns the initial
//! message backlog plus the push-channel URL and route params needed to
//! open the websocket.

use std::collections::HashMap;

use prost::Message as _;

use crate::codec::proto::WebcastResponse;
use crate::error::Result;
use crate::model::Event;
use crate::signer::SignerClient;

const ROOM_DATA_ENDPOINT: &str = "webcast/fetch/";

fn default_get_params() -> HashMap<String, String> {
    let mut m = HashMap::new();
    m.insert("aid".to_string(), "1988".to_string());
    m.insert("app_language".to_string(), "en-US".to_string());
    m.insert("app_name".to_string(), "tiktok_web".to_string());
    m.insert("browser_language".to_string(), "en".to_string());
    m.insert("browser_name".to_string(), "Mozilla".to_string());
    m.insert("browser_online".to_string(), "true".to_string());
    m.insert("browser_platform".to_string(), "Win32".to_string());
    m.insert("cookie_enabled".to_string(), "true".to_string());
    m.insert("device_platform".to_string(), "web".to_string());
    m.insert("focus_state".to_string(), "true".to_string());
    m.insert("from_page".to_string(), "user".to_string());
    m.insert("history_len".to_string(), "4".to_string());
    m.insert("is_fullscreen".to_string(), "false".to_string());
    m.insert("is_page_visible".to_string(), "true".to_string());
    m.insert("did_rule".to_string(), "3".to_string());
    m.insert("fetch_rule".to_string(), "1".to_string());
    m.insert("last_rtt".to_string(), "0".to_string());
    m.insert("live_id".to_string(), "12".to_string());
    m.insert("resp_content_type".to_string(), "protobuf".to_string());
    m.insert("screen_height".to_string(), "1152".to_string());
    m.insert("screen_width".to_string(), "2048".to_string());
    m.insert("tz_name".to_string(), "Europe/Berlin".to_string());
    m.insert("version_code".to_string(), "180800".to_string());
    m.insert("webcast_sdk_version".to_string(), "1.3.0".to_string());
    m.insert("update_version_code".to_string(), "1.3.0".to_string());
    m
}

/// Ten random decimal digits, sent as `device_id` on every webcast request.
/// TikTok doesn't appear to validate it; it just needs to look plausible.
pub(crate) fn random_device_id() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    (0..20).map(|_| rng.gen_range(0..10).to_string()).collect()
}

pub(crate) struct RoomData {
    pub cursor: String,
    pub push_server: Option<String>,
    pub push_params: HashMap<String, String>,
    /// Messages returned inline with the handshake, decoded the same way as
    /// push-channel frames but flagged `is_history` on every event.
    pub backlog: Vec<Event>,
}

/// Performs the signed room-fetch call and decodes the resulting
/// [`WebcastResponse`] into cursor/push-channel/backlog data.
pub(crate) async fn fetch_room_data(
    signer: &SignerClient,
    room_id: &str,
    cursor: Option<&str>,
    enable_experimental_events: bool,
) -> Result<RoomData> {
    let mut query = default_get_params();
    query.insert("room_id".to_string(), room_id.to_string());
    query.insert("device_id".to_string(), random_device_id());
    if let Some(cursor) = cursor {
        query.insert("cursor".to_string(), cursor.to_string());
    }

    // The signer re-issues this request on our behalf, so it needs the full
    // target URL (query string included) rather than just the bare path.
    let mut encoded: Vec<(String, String)> = query
        .into_iter()
        .filter(|(_, v)| !v.is_empty())
        .collect();
    encoded.sort();
    let query_string = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    let unsigned_url = format!(
        "{}{ROOM_DATA_ENDPOINT}?{query_string}",
        crate::http::WEBCAST_BASE_URL
    );

    let body = signer.sign(&unsigned_url, room_id).await?;

    let response = WebcastResponse::decode(body.as_slice())?;

    let mut backlog = Vec::with_capacity(response.messages.len());
    for message in &response.messages {
        if let Some(mut event) =
            crate::codec::decode_message(message, enable_experimental_events, room_id)?
        {
            mark_history(&mut event);
            backlog.push(event);
        }
    }

    let push_server = if !response.push_server.is_empty() && !response.route_params_map.is_empty()
    {
        Some(response.push_server.clone())
    } else {
        None
    };

    Ok(RoomData {
        cursor: response.cursor,
        push_server,
        push_params: response.route_params_map,
        backlog,
    })
}


fn mark_history(event: &mut Event) {
    use crate::model::Event::*;
    match event {
        Chat(e) => e.meta.is_history = true,
        Gift(e) => e.meta.is_history = true,
        Like(e) => e.meta.is_history = true,
        User(e) => e.meta.is_history = true,
        Viewers(e) => e.meta.is_history = true,
        Room(e) => e.meta.is_history = true,
        RoomBanner(e) => e.meta.is_history = true,
        Question(e) => e.meta.is_history = true,
        Control(e) => e.meta.is_history = true,
        Intro(e) => e.meta.is_history = true,
        MicBattle(e) => e.meta.is_history = true,
        Battles(e) => e.meta.is_history = true,
        Disconnect(_) => {}
    }
}
