//! Comments of one post, oldest first
//!
//! Author and content tie an optimistic comment to its echo.

use super::store_assigned_stripped;
use crate::records::{check_text, unassigned, Comment, COMMENT_MAX_CHARS};
use crate::AppError;
use aniverse_core::reactive::Dynamic;
use aniverse_core::{Clock, RecordId, StreamFilter};
use aniverse_sync::{
    LiveStream, MutationClient, StreamEntry, StreamOptions, StreamSpec, SubscriptionManager,
    SyncError,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;

/// `comments` where `post_id = X`
#[derive(Debug, Clone)]
pub struct CommentsSpec {
    post_id: RecordId,
}

impl CommentsSpec {
    /// Comments of `post_id`
    pub fn new(post_id: RecordId) -> Self {
        Self { post_id }
    }
}

impl StreamSpec for CommentsSpec {
    type Record = Comment;
    type Key = DateTime<Utc>;

    fn table(&self) -> &str {
        "comments"
    }

    fn filter(&self) -> StreamFilter {
        StreamFilter::eq("post_id", self.post_id.as_str())
    }

    fn sort_key(&self, comment: &Comment) -> DateTime<Utc> {
        comment.created_at
    }

    fn record_id(&self, comment: &Comment) -> RecordId {
        comment.id.clone()
    }

    fn correlation_key(&self, comment: &Comment) -> Option<String> {
        Some(format!("{}/{}", comment.user_id, comment.content))
    }

    fn insert_row(&self, comment: &Comment) -> Result<Value, SyncError> {
        store_assigned_stripped(self.table(), comment)
    }
}

/// Live comments of one post
#[derive(Clone)]
pub struct CommentsStream {
    post_id: RecordId,
    stream: LiveStream<CommentsSpec>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CommentsStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommentsStream")
            .field("post_id", &self.post_id)
            .field("count", &self.comment_count())
            .finish_non_exhaustive()
    }
}

impl CommentsStream {
    /// Subscribe to the comments of `post_id` on behalf of `view`
    pub fn open(
        subscriptions: &SubscriptionManager,
        view: &str,
        post_id: RecordId,
        client: Arc<dyn MutationClient>,
        clock: Arc<dyn Clock>,
        options: StreamOptions,
    ) -> Result<Self, AppError> {
        let spec = CommentsSpec::new(post_id.clone());
        let stream = LiveStream::open(subscriptions, view, "comments", spec, client, options)?;
        Ok(Self {
            post_id,
            stream,
            clock,
        })
    }

    /// Underlying live stream
    pub fn stream(&self) -> &LiveStream<CommentsSpec> {
        &self.stream
    }

    /// Published comments for the view layer
    pub fn view(&self) -> Dynamic<Vec<StreamEntry<Comment>>> {
        self.stream.view()
    }

    /// Comments, oldest first
    pub fn comments(&self) -> Vec<Comment> {
        self.stream.records()
    }

    /// Number of comments, pending ones included
    pub fn comment_count(&self) -> usize {
        self.stream.len()
    }

    /// Comment as `author`
    pub async fn add_comment(
        &self,
        author: &RecordId,
        content: &str,
    ) -> Result<RecordId, AppError> {
        let content = check_text("comment", content, Some(COMMENT_MAX_CHARS))?;
        let comment = Comment {
            id: unassigned(),
            post_id: self.post_id.clone(),
            user_id: author.clone(),
            content,
            created_at: self.clock.now(),
        };
        Ok(self.stream.create(comment).await?)
    }

    /// Delete one of `author`'s own comments
    pub async fn delete_comment(&self, author: &RecordId, id: &RecordId) -> Result<(), AppError> {
        let owner = self
            .stream
            .with(|comments| comments.get(id).map(|c| c.user_id.clone()))
            .ok_or_else(|| AppError::not_found(format!("comment {id}")))?;
        if owner != *author {
            return Err(AppError::permission_denied("delete another user's comment"));
        }
        Ok(self.stream.delete(id).await?)
    }
}
