//! Home feed: every post, newest first

use super::store_assigned_stripped;
use crate::records::{check_post, unassigned, Post};
use crate::AppError;
use aniverse_core::reactive::Dynamic;
use aniverse_core::{Clock, RecordId, StreamFilter};
use aniverse_sync::{
    LiveStream, MutationClient, StreamEntry, StreamOptions, StreamSpec, SubscriptionManager,
    SyncError,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::cmp::Reverse;
use std::sync::Arc;

/// Owning view of the feed subscription
pub const FEED_VIEW: &str = "feed";

/// `posts`, unfiltered, newest first
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedSpec;

impl StreamSpec for FeedSpec {
    type Record = Post;
    type Key = Reverse<DateTime<Utc>>;

    fn table(&self) -> &str {
        "posts"
    }

    fn filter(&self) -> StreamFilter {
        StreamFilter::All
    }

    fn sort_key(&self, post: &Post) -> Self::Key {
        Reverse(post.created_at)
    }

    fn record_id(&self, post: &Post) -> RecordId {
        post.id.clone()
    }

    fn correlation_key(&self, post: &Post) -> Option<String> {
        Some(format!("{}/{:?}/{:?}", post.user_id, post.content, post.image_url))
    }

    fn insert_row(&self, post: &Post) -> Result<Value, SyncError> {
        store_assigned_stripped(self.table(), post)
    }
}

/// The live home feed
#[derive(Clone)]
pub struct FeedStream {
    stream: LiveStream<FeedSpec>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for FeedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedStream")
            .field("stream", &self.stream)
            .finish_non_exhaustive()
    }
}

impl FeedStream {
    /// Subscribe to `posts`
    pub fn open(
        subscriptions: &SubscriptionManager,
        client: Arc<dyn MutationClient>,
        clock: Arc<dyn Clock>,
        options: StreamOptions,
    ) -> Result<Self, AppError> {
        let stream =
            LiveStream::open(subscriptions, FEED_VIEW, "posts", FeedSpec, client, options)?;
        Ok(Self { stream, clock })
    }

    /// Underlying live stream
    pub fn stream(&self) -> &LiveStream<FeedSpec> {
        &self.stream
    }

    /// Published feed for the view layer
    pub fn view(&self) -> Dynamic<Vec<StreamEntry<Post>>> {
        self.stream.view()
    }

    /// Posts, newest first
    pub fn posts(&self) -> Vec<Post> {
        self.stream.records()
    }

    /// Look up a visible post
    pub fn get(&self, id: &RecordId) -> Option<Post> {
        self.stream.with(|r| r.get(id).cloned())
    }

    /// Publish a post by `author`
    pub async fn create_post(
        &self,
        author: &RecordId,
        content: Option<&str>,
        image_url: Option<&str>,
        community_id: Option<RecordId>,
    ) -> Result<RecordId, AppError> {
        let content = check_post(content, image_url)?;
        let post = Post {
            id: unassigned(),
            user_id: author.clone(),
            content,
            image_url: image_url.map(str::to_string),
            community_id,
            created_at: self.clock.now(),
        };
        Ok(self.stream.create(post).await?)
    }

    /// Delete one of `author`'s own posts
    pub async fn delete_post(&self, author: &RecordId, id: &RecordId) -> Result<(), AppError> {
        let post = self
            .get(id)
            .ok_or_else(|| AppError::not_found(format!("post {id}")))?;
        if post.user_id != *author {
            return Err(AppError::permission_denied("delete another user's post"));
        }
        Ok(self.stream.delete(id).await?)
    }
}
