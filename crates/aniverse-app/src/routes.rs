//! The AniVerse route layout
//!
//! | Path | Route | View |
//! |---|---|---|
//! | `home` | `home` | [`View::Home`] |
//! | `community-detail`, `comunidades/:communityId` | `community-detail` | [`View::Community`] |
//! | `messages`, `messages/:chatId` | `messages` | [`View::Inbox`], [`View::Chat`] |
//! | `profile-detail`, `perfiles/:userId` | `profile-detail` | [`View::UserProfile`] |
//!
//! Every route answers its own name; the three above also take a trailing
//! id segment.

use aniverse_core::RecordId;
use aniverse_router::{RouteParams, RouteTable, RouterError};

/// Home feed route
pub const HOME: &str = "home";
/// Chat list and open chat route
pub const MESSAGES: &str = "messages";
/// Community detail route
pub const COMMUNITY_DETAIL: &str = "community-detail";
/// Another user's profile route
pub const PROFILE_DETAIL: &str = "profile-detail";

/// Path parameter naming the open chat
pub const CHAT_PARAM: &str = "chatId";
/// Path parameter naming the community
pub const COMMUNITY_PARAM: &str = "communityId";
/// Path parameter naming the user
pub const USER_PARAM: &str = "userId";

/// Screen the current route renders
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    /// Home feed
    Home,
    /// Explore
    Explore,
    /// Notifications
    Notifications,
    /// Chat list with no chat open
    Inbox,
    /// One open chat
    Chat {
        /// Open chat
        chat_id: RecordId,
    },
    /// Saved posts
    Saved,
    /// Community list
    Communities,
    /// One community
    Community {
        /// Shown community, when the path named one
        community_id: Option<RecordId>,
    },
    /// Premium plans
    Premium,
    /// Pricing
    Pricing,
    /// Own profile
    Profile,
    /// Another user's profile
    UserProfile {
        /// Shown user, when the path named one
        user_id: Option<RecordId>,
    },
    /// Settings
    Settings,
}

fn param(params: &RouteParams, name: &str) -> Option<RecordId> {
    params.get(name).cloned().map(RecordId::new)
}

/// Build the application's route table
pub fn route_table() -> Result<RouteTable<View>, RouterError> {
    let builder = RouteTable::builder()
        .register_route(HOME, HOME, |_| View::Home)?
        .register_route("explore", "explore", |_| View::Explore)?
        .register_route("notifications", "notifications", |_| View::Notifications)?
        .register_route(MESSAGES, MESSAGES, |p| match p.get(CHAT_PARAM) {
            Some(chat) => View::Chat {
                chat_id: RecordId::new(chat.clone()),
            },
            None => View::Inbox,
        })?
        .alias(MESSAGES, "messages/:chatId")?
        .register_route("saved", "saved", |_| View::Saved)?
        .register_route("communities", "communities", |_| View::Communities)?
        .register_route(COMMUNITY_DETAIL, COMMUNITY_DETAIL, |p| View::Community {
            community_id: param(p, COMMUNITY_PARAM),
        })?
        .alias(COMMUNITY_DETAIL, "comunidades/:communityId")?
        .register_route("premium", "premium", |_| View::Premium)?
        .register_route("pricing", "pricing", |_| View::Pricing)?
        .register_route("profile", "profile", |_| View::Profile)?
        .register_route(PROFILE_DETAIL, PROFILE_DETAIL, |p| View::UserProfile {
            user_id: param(p, USER_PARAM),
        })?
        .alias(PROFILE_DETAIL, "perfiles/:userId")?
        .register_route("settings", "settings", |_| View::Settings)?;
    Ok(builder.build())
}

/// Path of a community page
pub fn community_path(community_id: &RecordId) -> String {
    format!("comunidades/{community_id}")
}

/// Path of an open chat
pub fn chat_path(chat_id: &RecordId) -> String {
    format!("messages/{chat_id}")
}

/// Path of a user's profile
pub fn profile_path(user_id: &RecordId) -> String {
    format!("perfiles/{user_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_resolves() {
        let table = route_table().unwrap();
        assert_eq!(table.route_names().len(), 12);

        let chat = table.resolve(&chat_path(&RecordId::new("c-9"))).unwrap();
        assert_eq!(chat.route, MESSAGES);
        assert_eq!(
            table.view(&chat),
            Some(View::Chat {
                chat_id: RecordId::new("c-9")
            })
        );

        let inbox = table.resolve(MESSAGES).unwrap();
        assert_eq!(table.view(&inbox), Some(View::Inbox));

        let community = table.resolve(&community_path(&RecordId::new("7"))).unwrap();
        assert_eq!(community.route, COMMUNITY_DETAIL);
        assert_eq!(community.param(COMMUNITY_PARAM), Some("7"));

        let profile = table.resolve(&profile_path(&RecordId::new("u1"))).unwrap();
        assert_eq!(
            table.view(&profile),
            Some(View::UserProfile {
                user_id: Some(RecordId::new("u1"))
            })
        );
    }

    #[test]
    fn test_unknown_paths() {
        let table = route_table().unwrap();
        assert!(table.resolve("comunidades/").is_none());
        assert!(table.resolve("nowhere").is_none());

        let bare = table.resolve(COMMUNITY_DETAIL).unwrap();
        assert_eq!(table.view(&bare), Some(View::Community { community_id: None }));
    }
}
