//! The `User` and `SigningLimits`-adjacent shared types carried on most events.

use serde::{Deserialize, Serialize};

/// Avatar images grouped by the size variants TikTok serves.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AvatarImages {
    pub thumb: Vec<String>,
    pub medium: Vec<String>,
    pub large: Vec<String>,
    pub jpg: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Badge {
    pub display_type: String,
    pub display_name: String,
}

/// A TikTok user as carried on chat, gift, and member events.
///
/// `username` falls back to `nickname` when the id-string TikTok sends is
/// empty, matching `toUser` in the original implementation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub nickname: String,
    pub avatars: AvatarImages,
    pub follow_role: u64,
    pub badges: Vec<Badge>,
}

impl User {
    pub(crate) fn from_proto(u: &crate::codec::proto::User) -> Self {
        let username = if !u.id_str.is_empty() {
            u.id_str.clone()
        } else {
            u.nickname.clone()
        };

        User {
            id: u.id,
            username,
            nickname: u.nickname.clone(),
            avatars: AvatarImages {
                thumb: u.avatar_thumb.as_ref().map(|i| i.url_list.clone()).unwrap_or_default(),
                medium: u.avatar_medium.as_ref().map(|i| i.url_list.clone()).unwrap_or_default(),
                large: u.avatar_large.as_ref().map(|i| i.url_list.clone()).unwrap_or_default(),
                jpg: u.avatar_jpg.as_ref().map(|i| i.url_list.clone()).unwrap_or_default(),
            },
            follow_role: u.user_role,
            badges: u
                .badge_list
                .iter()
                .map(|b| Badge {
                    display_type: b.display_type.to_string(),
                    display_name: b.display_name.clone(),
                })
                .collect(),
        }
    }

    /// Mirrors `toUser(nil) -> &User{}` in the original: a nil proto user still
    /// yields a (empty) `User`, never an `Option::None`.
    pub(crate) fn from_proto_opt(u: Option<&crate::codec::proto::User>) -> Self {
        u.map(User::from_proto).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::proto;

    #[test]
    fn username_falls_back_to_nickname_when_id_str_empty() {
        let u = proto::User {
            id: 1,
            id_str: String::new(),
            nickname: "anon123".to_string(),
            ..Default::default()
        };
        assert_eq!(User::from_proto(&u).username, "anon123");
    }

    #[test]
    fn username_prefers_id_str_when_present() {
        let u = proto::User {
            id: 1,
            id_str: "user_handle".to_string(),
            nickname: "Display Name".to_string(),
            ..Default::default()
        };
        assert_eq!(User::from_proto(&u).username, "user_handle");
    }

    #[test]
    fn none_user_yields_default_not_panic() {
        let u = User::from_proto_opt(None);
        assert_eq!(u.id, 0);
        assert!(u.username.is_empty());
    }
}
