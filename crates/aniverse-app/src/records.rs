//! Rows of the shared tables, as the store delivers them
//!
//! Ids are opaque strings (numeric ids on the wire are accepted and kept as
//! their decimal text). Optimistic records are built locally with an empty
//! id and a provisional `created_at`; the store supplies both on insert.

use crate::AppError;
use aniverse_core::RecordId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum post length in characters
pub const POST_MAX_CHARS: usize = 500;

/// Minimum post length in characters when the post has no image
pub const POST_MIN_CHARS: usize = 3;

/// Maximum comment length in characters
pub const COMMENT_MAX_CHARS: usize = 500;

/// A feed post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Post id
    pub id: RecordId,
    /// Author
    pub user_id: RecordId,
    /// Text, absent for image-only posts
    #[serde(default)]
    pub content: Option<String>,
    /// Attached image
    #[serde(default)]
    pub image_url: Option<String>,
    /// Community the post was made in
    #[serde(default)]
    pub community_id: Option<RecordId>,
    /// Store timestamp
    pub created_at: DateTime<Utc>,
}

/// One user's like of one post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Like {
    /// Like id
    pub id: RecordId,
    /// Liked post
    pub post_id: RecordId,
    /// User who liked it
    pub user_id: RecordId,
    /// Store timestamp
    pub created_at: DateTime<Utc>,
}

/// A comment under a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Comment id
    pub id: RecordId,
    /// Commented post
    pub post_id: RecordId,
    /// Author
    pub user_id: RecordId,
    /// Text
    pub content: String,
    /// Store timestamp
    pub created_at: DateTime<Utc>,
}

/// A chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message id
    pub id: RecordId,
    /// Chat it belongs to
    pub chat_id: RecordId,
    /// Sender
    pub sender_id: RecordId,
    /// Text
    pub content: String,
    /// Store timestamp
    pub created_at: DateTime<Utc>,
}

/// Id given to records that the store has not assigned one yet
pub(crate) fn unassigned() -> RecordId {
    RecordId::new("")
}

// ============================================================================
// Input checks
// ============================================================================

/// Trim post text and check it against the post limits.
///
/// A post needs either an image or at least [`POST_MIN_CHARS`] of text.
pub fn check_post(
    content: Option<&str>,
    image_url: Option<&str>,
) -> Result<Option<String>, AppError> {
    let content = content.map(str::trim).filter(|c| !c.is_empty());
    let has_image = image_url.is_some_and(|url| !url.trim().is_empty());
    let chars = content.map_or(0, |c| c.chars().count());

    if chars > POST_MAX_CHARS {
        return Err(AppError::input(
            "post",
            format!("at most {POST_MAX_CHARS} characters"),
        ));
    }
    if !has_image && chars < POST_MIN_CHARS {
        return Err(AppError::input(
            "post",
            format!("at least {POST_MIN_CHARS} characters or an image"),
        ));
    }
    Ok(content.map(str::to_string))
}

/// Trim required text and check it against `max_chars`
pub fn check_text(
    field: &str,
    content: &str,
    max_chars: Option<usize>,
) -> Result<String, AppError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::input(field, "must not be empty"));
    }
    if let Some(max) = max_chars {
        if content.chars().count() > max {
            return Err(AppError::input(field, format!("at most {max} characters")));
        }
    }
    Ok(content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_ids_decode() {
        let like: Like = serde_json::from_value(json!({
            "id": 7,
            "post_id": 3,
            "user_id": "u1",
            "created_at": "2024-01-01T00:00:00Z",
        }))
        .unwrap();
        assert_eq!(like.id.as_str(), "7");
        assert_eq!(like.post_id.as_str(), "3");
    }

    #[test]
    fn test_post_optional_columns() {
        let post: Post = serde_json::from_value(json!({
            "id": "p1",
            "user_id": "u1",
            "created_at": "2024-01-01T00:00:00Z",
        }))
        .unwrap();
        assert!(post.content.is_none());
        assert!(post.community_id.is_none());
    }

    #[test]
    fn test_post_limits() {
        assert_eq!(check_post(Some("  hola  "), None).unwrap().as_deref(), Some("hola"));
        assert!(check_post(Some("hi"), None).is_err());
        assert_eq!(check_post(None, Some("https://img/1.png")).unwrap(), None);
        assert!(check_post(Some(&"a".repeat(501)), None).is_err());
        assert!(check_post(Some(&"ñ".repeat(500)), None).is_ok());
    }

    #[test]
    fn test_text_limits() {
        assert_eq!(check_text("comment", " ok ", Some(500)).unwrap(), "ok");
        assert!(check_text("comment", "   ", Some(500)).is_err());
        assert!(check_text("comment", &"x".repeat(501), Some(500)).is_err());
        assert!(check_text("message", &"x".repeat(5000), None).is_ok());
    }
}
