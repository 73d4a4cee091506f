//! Row factories
//!
//! Rows are built as the store delivers them: JSON objects with string ids
//! and RFC 3339 timestamps.

use crate::time::ts;
use aniverse_core::ChangeEvent;
use serde_json::{json, Value};

/// `posts` row
pub fn post_row(id: &str, user_id: &str, content: &str, secs: i64) -> Value {
    json!({
        "id": id,
        "user_id": user_id,
        "content": content,
        "image_url": null,
        "community_id": null,
        "created_at": ts(secs).to_rfc3339(),
    })
}

/// `post_likes` row
pub fn like_row(id: &str, post_id: &str, user_id: &str, secs: i64) -> Value {
    json!({
        "id": id,
        "post_id": post_id,
        "user_id": user_id,
        "created_at": ts(secs).to_rfc3339(),
    })
}

/// `comments` row
pub fn comment_row(id: &str, post_id: &str, user_id: &str, content: &str, secs: i64) -> Value {
    json!({
        "id": id,
        "post_id": post_id,
        "user_id": user_id,
        "content": content,
        "created_at": ts(secs).to_rfc3339(),
    })
}

/// `messages` row
pub fn message_row(id: &str, chat_id: &str, sender_id: &str, content: &str, secs: i64) -> Value {
    json!({
        "id": id,
        "chat_id": chat_id,
        "sender_id": sender_id,
        "content": content,
        "created_at": ts(secs).to_rfc3339(),
    })
}

/// Key-only delete image, as sent for tables without full replica identity
pub fn deleted(id: &str) -> ChangeEvent {
    ChangeEvent::delete(json!({ "id": id }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aniverse_core::{ChangeKind, StreamFilter};

    #[test]
    fn test_rows_match_their_stream_filters() {
        let like = like_row("1", "p1", "u1", 0);
        assert!(StreamFilter::eq("post_id", "p1").matches(&like));
        assert!(!StreamFilter::eq("post_id", "p2").matches(&like));

        let message = message_row("m1", "c1", "u1", "hola", 3);
        assert!(StreamFilter::eq("chat_id", "c1").matches(&message));

        let gone = deleted("1");
        assert_eq!(gone.kind(), Some(ChangeKind::Delete));
        assert!(StreamFilter::eq("post_id", "p9").matches(gone.row().unwrap()));
    }
}
