//! Likes of one post
//!
//! A user likes a post at most once, so `user_id` correlates an optimistic
//! like with its canonical row: the echo and the store answer can arrive in
//! either order and the count never reads 2.

use super::store_assigned_stripped;
use crate::records::{unassigned, Like};
use crate::AppError;
use aniverse_core::reactive::Dynamic;
use aniverse_core::{Clock, EntityId, RecordId, StreamFilter};
use aniverse_sync::{
    LiveStream, MutationClient, StreamEntry, StreamOptions, StreamSpec, SubscriptionManager,
    SyncError,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;

/// `post_likes` where `post_id = X`, oldest first
#[derive(Debug, Clone)]
pub struct LikesSpec {
    post_id: RecordId,
}

impl LikesSpec {
    /// Likes of `post_id`
    pub fn new(post_id: RecordId) -> Self {
        Self { post_id }
    }
}

impl StreamSpec for LikesSpec {
    type Record = Like;
    type Key = DateTime<Utc>;

    fn table(&self) -> &str {
        "post_likes"
    }

    fn filter(&self) -> StreamFilter {
        StreamFilter::eq("post_id", self.post_id.as_str())
    }

    fn sort_key(&self, like: &Like) -> DateTime<Utc> {
        like.created_at
    }

    fn record_id(&self, like: &Like) -> RecordId {
        like.id.clone()
    }

    fn correlation_key(&self, like: &Like) -> Option<String> {
        Some(like.user_id.to_string())
    }

    fn insert_row(&self, like: &Like) -> Result<Value, SyncError> {
        store_assigned_stripped(self.table(), like)
    }
}

/// What a toggle did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LikeToggle {
    /// The post is now liked, under this like id
    Liked(RecordId),
    /// The like was removed
    Unliked,
}

/// Live likes of one post
#[derive(Clone)]
pub struct LikesStream {
    post_id: RecordId,
    stream: LiveStream<LikesSpec>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for LikesStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LikesStream")
            .field("post_id", &self.post_id)
            .field("count", &self.like_count())
            .finish_non_exhaustive()
    }
}

impl LikesStream {
    /// Subscribe to the likes of `post_id` on behalf of `view`
    pub fn open(
        subscriptions: &SubscriptionManager,
        view: &str,
        post_id: RecordId,
        client: Arc<dyn MutationClient>,
        clock: Arc<dyn Clock>,
        options: StreamOptions,
    ) -> Result<Self, AppError> {
        let spec = LikesSpec::new(post_id.clone());
        let stream = LiveStream::open(subscriptions, view, "likes", spec, client, options)?;
        Ok(Self {
            post_id,
            stream,
            clock,
        })
    }

    /// Liked post
    pub fn post_id(&self) -> &RecordId {
        &self.post_id
    }

    /// Underlying live stream
    pub fn stream(&self) -> &LiveStream<LikesSpec> {
        &self.stream
    }

    /// Published likes for the view layer
    pub fn view(&self) -> Dynamic<Vec<StreamEntry<Like>>> {
        self.stream.view()
    }

    /// Number of likes, pending ones included
    pub fn like_count(&self) -> usize {
        self.stream.len()
    }

    /// Whether `user` currently likes the post
    pub fn is_liked_by(&self, user: &RecordId) -> bool {
        self.entry_of(user).is_some()
    }

    /// Like the post if `user` does not already, unlike it otherwise
    pub async fn toggle_like(&self, user: &RecordId) -> Result<LikeToggle, AppError> {
        match self.entry_of(user) {
            Some(EntityId::Pending(_)) => Err(AppError::input(
                "like",
                "the previous like is still being saved",
            )),
            Some(EntityId::Canonical(id)) => {
                self.stream.delete(&id).await?;
                Ok(LikeToggle::Unliked)
            }
            None => {
                let like = Like {
                    id: unassigned(),
                    post_id: self.post_id.clone(),
                    user_id: user.clone(),
                    created_at: self.clock.now(),
                };
                let id = self.stream.create(like).await?;
                Ok(LikeToggle::Liked(id))
            }
        }
    }

    fn entry_of(&self, user: &RecordId) -> Option<EntityId> {
        self.stream.with(|likes| {
            likes
                .iter()
                .find(|(_, like)| like.user_id == *user)
                .map(|(id, _)| id.clone())
        })
    }
}
