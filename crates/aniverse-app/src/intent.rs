//! # Intents: User Actions
//!
//! Every user interaction the core handles is one [`Intent`]. Navigation and
//! actions are separate variants, so a click on a post card dispatches
//! either a navigation (opening the author's profile, the community) or an
//! action (like, comment), never both.
//!
//! ```text
//! Intent::Navigate → Router::navigate → route listeners
//! Intent::<action> → stream adapter → optimistic entry → store → reconcile
//! ```

use crate::routes;
use aniverse_core::RecordId;
use serde::{Deserialize, Serialize};

/// A user action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    // =========================================================================
    // Navigation
    // =========================================================================
    /// Show another view
    Navigate {
        /// Target path
        path: String,
    },

    // =========================================================================
    // Feed
    // =========================================================================
    /// Publish a post
    CreatePost {
        /// Text
        content: Option<String>,
        /// Attached image
        image_url: Option<String>,
        /// Community to post in
        community_id: Option<RecordId>,
    },

    /// Delete one of the user's posts
    DeletePost {
        /// Post to delete
        post_id: RecordId,
    },

    // =========================================================================
    // Post interactions
    // =========================================================================
    /// Like or unlike a post
    ToggleLike {
        /// Target post
        post_id: RecordId,
    },

    /// Comment on a post
    AddComment {
        /// Target post
        post_id: RecordId,
        /// Text
        content: String,
    },

    /// Delete one of the user's comments
    DeleteComment {
        /// Post the comment is on
        post_id: RecordId,
        /// Comment to delete
        comment_id: RecordId,
    },

    // =========================================================================
    // Chat
    // =========================================================================
    /// Send a message to a chat
    SendMessage {
        /// Target chat
        chat_id: RecordId,
        /// Text
        content: String,
    },
}

impl Intent {
    /// Navigate to `path`
    pub fn navigate(path: impl Into<String>) -> Self {
        Self::Navigate { path: path.into() }
    }

    /// Open a community page
    pub fn open_community(community_id: &RecordId) -> Self {
        Self::navigate(routes::community_path(community_id))
    }

    /// Open a chat
    pub fn open_chat(chat_id: &RecordId) -> Self {
        Self::navigate(routes::chat_path(chat_id))
    }

    /// Open a user's profile
    pub fn open_profile(user_id: &RecordId) -> Self {
        Self::navigate(routes::profile_path(user_id))
    }

    /// Whether this intent only changes the view
    pub fn is_navigation(&self) -> bool {
        matches!(self, Self::Navigate { .. })
    }

    /// Post this intent acts on, if any
    pub fn post_id(&self) -> Option<&RecordId> {
        match self {
            Self::DeletePost { post_id }
            | Self::ToggleLike { post_id }
            | Self::AddComment { post_id, .. }
            | Self::DeleteComment { post_id, .. } => Some(post_id),
            _ => None,
        }
    }

    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Navigate { .. } => "navigate",
            Self::CreatePost { .. } => "create post",
            Self::DeletePost { .. } => "delete post",
            Self::ToggleLike { .. } => "toggle like",
            Self::AddComment { .. } => "add comment",
            Self::DeleteComment { .. } => "delete comment",
            Self::SendMessage { .. } => "send message",
        }
    }
}

/// What a dispatched intent did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentOutcome {
    /// Navigation ran; `matched` is false when no route answered the path
    Navigated {
        /// Whether the path resolved
        matched: bool,
    },
    /// A record was created
    Created(RecordId),
    /// A post is now liked or unliked
    Like(crate::streams::LikeToggle),
    /// A record was deleted
    Deleted,
}
