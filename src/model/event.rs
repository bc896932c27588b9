//! The public event stream surfaced by a [`crate::session::LiveSession`].

use serde::Serialize;

use crate::model::room::RoomInfo;
use crate::model::user::User;

/// Fields every decoded event carries, lifted out of `Common` on the wire.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EventMeta {
    pub message_id: String,
    pub timestamp: i64,
    pub room_id: String,
    /// True for messages replayed from the handshake backlog rather than
    /// pushed live over the socket.
    pub is_history: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatEvent {
    pub meta: EventMeta,
    pub user: User,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GiftEvent {
    pub meta: EventMeta,
    pub user: User,
    pub gift_id: u64,
    pub gift_name: String,
    pub describe: String,
    pub diamond_count: u64,
    pub repeat_count: u32,
    /// `repeat_end` is set on the final message of a combo streak.
    pub repeat_end: bool,
    pub receiver_user_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LikeEvent {
    pub meta: EventMeta,
    pub user: User,
    pub count: u32,
    pub total: u64,
}

/// The kind of social action a member-stream message represents, resolved
/// from `displayText.key` the way the original implementation's
/// `toUserType` switch does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UserEventKind {
    Join,
    Follow,
    Share,
    Other,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserEvent {
    pub meta: EventMeta,
    pub user: User,
    pub kind: UserEventKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewersEvent {
    pub meta: EventMeta,
    pub viewer_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomEvent {
    pub meta: EventMeta,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomBannerEvent {
    pub meta: EventMeta,
    pub json: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionEvent {
    pub meta: EventMeta,
    pub user: User,
    pub text: String,
}

/// `ControlAction` values the original stream cares about; anything else is
/// surfaced as `Other` rather than dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    StreamPaused,
    StreamUnpaused,
    StreamEnded,
    StreamEndedByModeration,
    Other,
}

impl ControlAction {
    pub(crate) fn from_i32(v: i32) -> Self {
        match v {
            1 => ControlAction::StreamPaused,
            2 => ControlAction::StreamUnpaused,
            3 => ControlAction::StreamEnded,
            4 => ControlAction::StreamEndedByModeration,
            _ => ControlAction::Other,
        }
    }

    pub fn ends_stream(self) -> bool {
        matches!(
            self,
            ControlAction::StreamEnded | ControlAction::StreamEndedByModeration
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ControlEvent {
    pub meta: EventMeta,
    pub action: ControlAction,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntroEvent {
    pub meta: EventMeta,
    pub host: User,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MicBattleEvent {
    pub meta: EventMeta,
    pub hosts: Vec<User>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BattleTeam {
    pub points: i32,
    pub users: Vec<User>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BattlesEvent {
    pub meta: EventMeta,
    pub battle_status: i32,
    pub teams: Vec<BattleTeam>,
}

/// Synthesized by the session when the socket is torn down, whether by the
/// remote side, the caller, or `Control(StreamEnded*)`. Never carries
/// `message_id`/`is_history` semantics since it has no wire origin.
#[derive(Debug, Clone, Serialize)]
pub struct DisconnectEvent {
    pub room_info: Option<Box<RoomInfo>>,
    pub reason: String,
}

/// Every event a [`crate::session::LiveSession`] can emit.
///
/// One variant per tracked message type (spec's component boundary between
/// "known, typed" events and everything else); unmapped `method` strings are
/// dropped by the codec rather than surfaced here, matching the original's
/// silent `default:` case in `parseMsg`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
#[serde(rename_all = "snake_case")]
pub enum Event {
    Chat(ChatEvent),
    Gift(GiftEvent),
    Like(LikeEvent),
    User(UserEvent),
    Viewers(ViewersEvent),
    Room(RoomEvent),
    RoomBanner(RoomBannerEvent),
    Question(QuestionEvent),
    Control(ControlEvent),
    Intro(IntroEvent),
    MicBattle(MicBattleEvent),
    Battles(BattlesEvent),
    Disconnect(DisconnectEvent),
}
