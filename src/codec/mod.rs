//! Message codec: decodes the wire frames off the push-channel socket into
//! typed [`Event`](crate::model::Event)s.
//!
//! The dispatch in [`decode_messages`] is a closed `match` over every
//! `method` string TikTok is known to send, the Rust equivalent of the
//! original implementation's `protoregistry`-backed type switch. Unknown
//! methods are logged and dropped rather than surfaced, matching its silent
//! `default:` case.

pub(crate) mod proto;

use prost::Message as _;

use crate::error::Result;
use crate::model::event::{
    BattleTeam, BattlesEvent, ChatEvent, ControlAction, ControlEvent, EventMeta, GiftEvent,
    IntroEvent, LikeEvent, MicBattleEvent, QuestionEvent, RoomBannerEvent, RoomEvent, UserEvent,
    UserEventKind, ViewersEvent,
};
use crate::model::{Event, User};

pub(crate) const KEEPALIVE_FRAME_HEX: &str = "3a026862";

pub(crate) struct DecodedBatch {
    pub cursor: String,
    pub needs_ack: bool,
    pub log_id: u64,
    pub internal_ext: Vec<u8>,
    pub events: Vec<Event>,
}

/// Decodes one push-channel frame: the outer [`proto::PushFrame`] envelope,
/// then (if `payload_type == "msg"`) the inner [`proto::WebcastResponse`]
/// and every message it carries.
///
/// Returns `Ok(None)` for frame types this client doesn't act on (anything
/// other than `"msg"`), matching the original's silent branch for unknown
/// `PayloadType`s.
pub(crate) fn decode_frame(
    raw: &[u8],
    enable_experimental_events: bool,
    room_id: &str,
) -> Result<Option<DecodedBatch>> {
    let frame = proto::PushFrame::decode(raw)?;
    if frame.payload_type != "msg" {
        return Ok(None);
    }

    let response = proto::WebcastResponse::decode(frame.payload.as_slice())?;
    let mut events = Vec::with_capacity(response.messages.len());
    for message in &response.messages {
        if let Some(event) = decode_message(message, enable_experimental_events, room_id)? {
            events.push(event);
        }
    }

    Ok(Some(DecodedBatch {
        cursor: response.cursor,
        needs_ack: response.needs_ack,
        log_id: frame.log_id,
        internal_ext: response.internal_ext,
        events,
    }))
}

fn meta_from_common(common: &Option<proto::Common>, room_id: &str) -> EventMeta {
    let (timestamp, message_id) = common
        .as_ref()
        .map(|c| (c.create_time, c.method.clone()))
        .unwrap_or_default();
    EventMeta {
        message_id,
        timestamp,
        room_id: room_id.to_string(),
        is_history: false,
    }
}

fn display_text(common: &Option<proto::Common>) -> String {
    common
        .as_ref()
        .and_then(|c| c.display_text.as_ref())
        .map(|t| t.default_pattern.clone())
        .unwrap_or_default()
}

/// Maps `displayText.key` to a [`UserEventKind`], mirroring `toUserType`.
fn user_event_kind(common: &Option<proto::Common>) -> UserEventKind {
    let key = common
        .as_ref()
        .and_then(|c| c.display_text.as_ref())
        .map(|t| t.key.as_str())
        .unwrap_or("");
    match key {
        "pm_main_follow_message_viewer_2" => UserEventKind::Follow,
        "pm_mt_guidance_share" => UserEventKind::Share,
        "live_room_enter_toast" => UserEventKind::Join,
        _ => UserEventKind::Other,
    }
}

pub(crate) fn decode_message(
    message: &proto::Message,
    enable_experimental_events: bool,
    room_id: &str,
) -> Result<Option<Event>> {
    let payload = message.payload.as_slice();
    match message.method.as_str() {
        "WebcastChatMessage" => {
            let m = proto::ChatMessage::decode(payload)?;
            Ok(Some(Event::Chat(ChatEvent {
                meta: meta_from_common(&m.common, room_id),
                user: User::from_proto_opt(m.user.as_ref()),
                content: m.content,
            })))
        }
        "WebcastRoomMessage" => {
            let m = proto::RoomMessage::decode(payload)?;
            Ok(Some(Event::Room(RoomEvent {
                meta: meta_from_common(&m.common, room_id),
                content: if m.content.is_empty() {
                    display_text(&m.common)
                } else {
                    m.content
                },
            })))
        }
        "WebcastRoomPinMessage" => decode_pinned(&proto::RoomPinMessage::decode(payload)?, room_id),
        "WebcastMemberMessage" => {
            let m = proto::MemberMessage::decode(payload)?;
            Ok(Some(Event::User(UserEvent {
                kind: user_event_kind(&m.common),
                meta: meta_from_common(&m.common, room_id),
                user: User::from_proto_opt(m.user.as_ref()),
            })))
        }
        "WebcastSocialMessage" => {
            let m = proto::SocialMessage::decode(payload)?;
            Ok(Some(Event::User(UserEvent {
                kind: user_event_kind(&m.common),
                meta: meta_from_common(&m.common, room_id),
                user: User::from_proto_opt(m.user.as_ref()),
            })))
        }
        "WebcastLiveGameIntroMessage" => {
            let m = proto::LiveGameIntroMessage::decode(payload)?;
            Ok(Some(Event::Room(RoomEvent {
                meta: meta_from_common(&m.common, room_id),
                content: m.game_text.map(|t| t.default_pattern).unwrap_or_default(),
            })))
        }
        "WebcastRoomUserSeqMessage" => {
            let m = proto::RoomUserSeqMessage::decode(payload)?;
            Ok(Some(Event::Viewers(ViewersEvent {
                meta: EventMeta {
                    room_id: room_id.to_string(),
                    ..Default::default()
                },
                viewer_count: m.total,
            })))
        }
        "WebcastGiftMessage" => {
            let m = proto::GiftMessage::decode(payload)?;
            if m.gift_id == 0 && m.user.is_none() {
                return Ok(None);
            }
            let gift = m.gift.unwrap_or_default();
            Ok(Some(Event::Gift(GiftEvent {
                meta: meta_from_common(&m.common, room_id),
                user: User::from_proto_opt(m.user.as_ref()),
                gift_id: m.gift_id,
                gift_name: gift.name,
                describe: gift.describe,
                diamond_count: gift.diamond_count,
                repeat_count: m.repeat_count,
                repeat_end: m.repeat_end == 1,
                receiver_user_id: m.user_gift_receiver.map(|r| r.user_id),
            })))
        }
        "WebcastLikeMessage" => {
            let m = proto::LikeMessage::decode(payload)?;
            Ok(Some(Event::Like(LikeEvent {
                meta: meta_from_common(&m.common, room_id),
                user: User::from_proto_opt(m.user.as_ref()),
                count: m.count,
                total: m.total,
            })))
        }
        "WebcastQuestionNewMessage" => {
            let m = proto::QuestionNewMessage::decode(payload)?;
            let details = m.details.unwrap_or_default();
            Ok(Some(Event::Question(QuestionEvent {
                meta: meta_from_common(&m.common, room_id),
                user: User::from_proto_opt(details.user.as_ref()),
                text: details.text,
            })))
        }
        "WebcastControlMessage" => {
            let m = proto::ControlMessage::decode(payload)?;
            Ok(Some(Event::Control(ControlEvent {
                meta: meta_from_common(&m.common, room_id),
                action: ControlAction::from_i32(m.action),
            })))
        }
        "WebcastLiveIntroMessage" => {
            let m = proto::LiveIntroMessage::decode(payload)?;
            Ok(Some(Event::Intro(IntroEvent {
                meta: meta_from_common(&m.common, room_id),
                host: User::from_proto_opt(m.host.as_ref()),
                content: m.content,
            })))
        }
        "WebcastInRoomBannerMessage" if enable_experimental_events => {
            let m = proto::InRoomBannerMessage::decode(payload)?;
            Ok(Some(Event::RoomBanner(RoomBannerEvent {
                meta: meta_from_common(&m.common, room_id),
                json: m.json,
            })))
        }
        "WebcastLinkMicBattle" if enable_experimental_events => {
            let m = proto::LinkMicBattle::decode(payload)?;
            let hosts = m
                .host_team
                .iter()
                .flat_map(|team| team.host_group.iter())
                .flat_map(|group| group.host.iter())
                .map(User::from_proto)
                .collect();
            Ok(Some(Event::MicBattle(MicBattleEvent {
                meta: meta_from_common(&m.common, room_id),
                hosts,
            })))
        }
        "WebcastLinkMicArmies" if enable_experimental_events => {
            let m = proto::LinkMicArmies::decode(payload)?;
            let teams = m
                .battle_items
                .iter()
                .flat_map(|item| item.battle_groups.iter())
                .map(|group| BattleTeam {
                    points: group.points,
                    users: group.users.iter().map(User::from_proto).collect(),
                })
                .collect();
            Ok(Some(Event::Battles(BattlesEvent {
                meta: meta_from_common(&m.common, room_id),
                battle_status: m.battle_status,
                teams,
            })))
        }
        _ => {
            log::debug!(
                "unmapped webcast method, dropping: {} ({} bytes)",
                message.method,
                payload.len()
            );
            Ok(None)
        }
    }
}

/// `WebcastRoomPinMessage` wraps another message type by raw bytes; only the
/// pinned-chat case is given a typed event, matching the original (every
/// other pinned type falls through to an `<unknown>` `RoomEvent`).
fn decode_pinned(m: &proto::RoomPinMessage, room_id: &str) -> Result<Option<Event>> {
    if m.original_msg_type == "WebcastChatMessage" {
        if let Ok(chat) = proto::ChatMessage::decode(m.pinned_message.as_slice()) {
            return Ok(Some(Event::Chat(ChatEvent {
                meta: meta_from_common(&m.common, room_id),
                user: User::from_proto_opt(chat.user.as_ref()),
                content: format!("<pinned>: {}", chat.content),
            })));
        }
    }
    Ok(Some(Event::Room(RoomEvent {
        meta: meta_from_common(&m.common, room_id),
        content: format!("<pinned unknown type: {}>", m.original_msg_type),
    })))
}

/// Builds the ack frame sent back when `WebcastResponse.needs_ack` is set.
pub(crate) fn encode_ack(log_id: u64, internal_ext: Vec<u8>) -> Vec<u8> {
    let frame = proto::PushFrame {
        log_id,
        payload_type: "ack".to_string(),
        payload: internal_ext,
    };
    frame.encode_to_vec()
}

pub(crate) fn keepalive_frame() -> Vec<u8> {
    hex::decode(KEEPALIVE_FRAME_HEX).expect("keepalive hex constant is well-formed")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn common(room_id: &str) -> proto::Common {
        proto::Common {
            method: "WebcastChatMessage".to_string(),
            create_time: 1700000000,
            display_text: None,
            room_id: room_id.to_string(),
        }
    }

    #[test]
    fn decodes_chat_message() {
        let msg = proto::ChatMessage {
            common: Some(common("123")),
            user: Some(proto::User {
                id: 42,
                id_str: "42".to_string(),
                nickname: "alice".to_string(),
                ..Default::default()
            }),
            content: "hello".to_string(),
        };
        let message = proto::Message {
            method: "WebcastChatMessage".to_string(),
            payload: msg.encode_to_vec(),
        };

        let event = decode_message(&message, false, "123").unwrap().unwrap();
        match event {
            Event::Chat(e) => {
                assert_eq!(e.content, "hello");
                assert_eq!(e.user.username, "42");
                assert_eq!(e.meta.room_id, "123");
                assert!(!e.meta.is_history);
            }
            other => panic!("expected Chat event, got {other:?}"),
        }
    }

    #[test]
    fn unmapped_method_is_dropped_not_errored() {
        let message = proto::Message {
            method: "WebcastSomeFutureMessage".to_string(),
            payload: vec![],
        };
        assert!(decode_message(&message, false, "123").unwrap().is_none());
    }

    #[test]
    fn experimental_events_gated_behind_flag() {
        let m = proto::InRoomBannerMessage {
            common: Some(common("1")),
            json: "{}".to_string(),
        };
        let message = proto::Message {
            method: "WebcastInRoomBannerMessage".to_string(),
            payload: m.encode_to_vec(),
        };

        assert!(decode_message(&message, false, "1").unwrap().is_none());
        assert!(decode_message(&message, true, "1").unwrap().is_some());
    }

    #[test]
    fn non_msg_frame_is_ignored() {
        let frame = proto::PushFrame {
            log_id: 1,
            payload_type: "hb".to_string(),
            payload: vec![],
        };
        let raw = frame.encode_to_vec();
        assert!(decode_frame(&raw, false, "1").unwrap().is_none());
    }

    #[test]
    fn decode_frame_unwraps_messages_and_ack_flag() {
        let chat = proto::ChatMessage {
            common: Some(common("7")),
            user: None,
            content: "hi".to_string(),
        };
        let inner = proto::WebcastResponse {
            cursor: "abc".to_string(),
            needs_ack: true,
            messages: vec![proto::Message {
                method: "WebcastChatMessage".to_string(),
                payload: chat.encode_to_vec(),
            }],
            ..Default::default()
        };
        let frame = proto::PushFrame {
            log_id: 99,
            payload_type: "msg".to_string(),
            payload: inner.encode_to_vec(),
        };

        let batch = decode_frame(&frame.encode_to_vec(), false, "7").unwrap().unwrap();
        assert_eq!(batch.cursor, "abc");
        assert!(batch.needs_ack);
        assert_eq!(batch.log_id, 99);
        assert_eq!(batch.events.len(), 1);
    }

    #[test]
    fn keepalive_frame_matches_hex_constant() {
        assert_eq!(keepalive_frame(), hex::decode(KEEPALIVE_FRAME_HEX).unwrap());
    }

    #[test]
    fn unparseable_pinned_chat_falls_through_to_unknown_room_event() {
        let pin = proto::RoomPinMessage {
            common: Some(common("3")),
            original_msg_type: "WebcastChatMessage".to_string(),
            pinned_message: vec![0xff, 0xff, 0xff], // not a valid ChatMessage
        };
        let message = proto::Message {
            method: "WebcastRoomPinMessage".to_string(),
            payload: pin.encode_to_vec(),
        };

        let event = decode_message(&message, false, "3").unwrap().unwrap();
        match event {
            Event::Room(e) => assert!(e.content.contains("WebcastChatMessage")),
            other => panic!("expected Room event, got {other:?}"),
        }
    }

    #[test]
    fn pinned_non_chat_type_is_unknown_room_event() {
        let pin = proto::RoomPinMessage {
            common: Some(common("3")),
            original_msg_type: "WebcastGiftMessage".to_string(),
            pinned_message: vec![],
        };
        let message = proto::Message {
            method: "WebcastRoomPinMessage".to_string(),
            payload: pin.encode_to_vec(),
        };

        let event = decode_message(&message, false, "3").unwrap().unwrap();
        match event {
            Event::Room(e) => assert!(e.content.contains("WebcastGiftMessage")),
            other => panic!("expected Room event, got {other:?}"),
        }
    }
}
