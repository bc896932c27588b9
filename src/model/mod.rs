//! Shared data types: the public [`Event`] stream and the structs it carries.

pub mod event;
pub mod room;
pub mod user;

pub use event::{
    BattleTeam, BattlesEvent, ChatEvent, ControlAction, ControlEvent, DisconnectEvent, Event,
    EventMeta, GiftEvent, IntroEvent, LikeEvent, MicBattleEvent, QuestionEvent, RoomBannerEvent,
    RoomEvent, UserEvent, UserEventKind, ViewersEvent,
};
pub use room::{GiftEntry, GiftInfo, PriceList, PriceListEntry, RoomInfo, RoomOwner, StreamUrl};
pub use user::{AvatarImages, Badge, User};
