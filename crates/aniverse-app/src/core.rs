//! # AppCore
//!
//! Ties the router to the live streams. The home feed is subscribed for the
//! lifetime of the core; a post's likes and comments are subscribed when
//! the post is opened; the chat stream follows the `messages/:chatId` route
//! parameter, so exactly one chat subscription exists while a chat is shown
//! and none otherwise.

use crate::config::AppConfig;
use crate::intent::{Intent, IntentOutcome};
use crate::routes::{self, View};
use crate::streams::{ChatStream, CommentsStream, FeedStream, LikesStream};
use crate::AppError;
use aniverse_core::config::ClientConfig;
use aniverse_core::{Clock, RecordId};
use aniverse_router::{RouteState, Router, Unsubscribe};
use aniverse_sync::{ChangeFeed, MutationClient, StreamOptions, SubscriptionManager};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Likes and comments of one opened post
#[derive(Debug, Clone)]
pub struct PostStreams {
    /// Likes
    pub likes: LikesStream,
    /// Comments
    pub comments: CommentsStream,
}

/// Subscription owner name for a post's streams
pub fn post_view(post_id: &RecordId) -> String {
    format!("post:{post_id}")
}

/// Keeps the chat subscription in step with the route
struct ChatFollower {
    subscriptions: Arc<SubscriptionManager>,
    client: Arc<dyn MutationClient>,
    clock: Arc<dyn Clock>,
    options: StreamOptions,
    current: Arc<Mutex<Option<ChatStream>>>,
}

impl ChatFollower {
    fn follow(&self, state: &RouteState) {
        let wanted = (state.route == routes::MESSAGES)
            .then(|| state.param(routes::CHAT_PARAM))
            .flatten()
            .map(RecordId::new);

        let mut current = self.current.lock();
        if current.as_ref().map(ChatStream::chat_id) == wanted.as_ref() {
            return;
        }

        // Never two chats live at once
        if let Some(previous) = current.take() {
            previous.close(&self.subscriptions);
            tracing::debug!(chat_id = %previous.chat_id(), "Left chat");
        }

        if let Some(chat_id) = wanted {
            match ChatStream::open(
                &self.subscriptions,
                chat_id.clone(),
                self.client.clone(),
                self.clock.clone(),
                self.options,
            ) {
                Ok(chat) => *current = Some(chat),
                Err(error) => tracing::warn!(%chat_id, %error, "Could not subscribe to chat"),
            }
        }
    }
}

/// Headless application core for one signed-in user
pub struct AppCore {
    user: RecordId,
    config: AppConfig,
    router: Router<View>,
    subscriptions: Arc<SubscriptionManager>,
    client: Arc<dyn MutationClient>,
    clock: Arc<dyn Clock>,
    feed: FeedStream,
    chat: Arc<Mutex<Option<ChatStream>>>,
    posts: Mutex<HashMap<RecordId, PostStreams>>,
    route_listener: Unsubscribe,
}

impl fmt::Debug for AppCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppCore")
            .field("user", &self.user)
            .field("route", &self.router.current())
            .field("subscriptions", &self.subscriptions.active_count())
            .field("open_posts", &self.posts.lock().len())
            .finish_non_exhaustive()
    }
}

impl AppCore {
    /// Build the core and subscribe the home feed
    pub fn new(
        config: AppConfig,
        user: RecordId,
        feed: Arc<dyn ChangeFeed>,
        client: Arc<dyn MutationClient>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AppError> {
        config.validate()?;
        let router = Router::new(routes::route_table()?, &config.router.default_route)?;
        let subscriptions = Arc::new(SubscriptionManager::new(feed));
        let options = config.stream_options();

        let home = FeedStream::open(&subscriptions, client.clone(), clock.clone(), options)?;

        let chat = Arc::new(Mutex::new(None));
        let follower = ChatFollower {
            subscriptions: subscriptions.clone(),
            client: client.clone(),
            clock: clock.clone(),
            options,
            current: chat.clone(),
        };
        follower.follow(&router.current());
        let route_listener = router.subscribe(move |state| follower.follow(state));

        tracing::info!(%user, route = %router.current_route(), "App core started");
        Ok(Self {
            user,
            config,
            router,
            subscriptions,
            client,
            clock,
            feed: home,
            chat,
            posts: Mutex::new(HashMap::new()),
            route_listener,
        })
    }

    // ============================================================================
    // Accessors
    // ============================================================================

    /// Signed-in user
    pub fn user(&self) -> &RecordId {
        &self.user
    }

    /// Active configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The router
    pub fn router(&self) -> &Router<View> {
        &self.router
    }

    /// Subscription registry
    pub fn subscriptions(&self) -> &SubscriptionManager {
        &self.subscriptions
    }

    /// Home feed
    pub fn feed(&self) -> &FeedStream {
        &self.feed
    }

    /// Currently open chat
    pub fn chat(&self) -> Option<ChatStream> {
        self.chat.lock().clone()
    }

    /// View of the current route
    pub fn current_view(&self) -> Option<View> {
        self.router.current_view()
    }

    // ============================================================================
    // Navigation
    // ============================================================================

    /// Resolve `path` and switch to it; false when nothing matched
    pub fn navigate(&self, path: &str) -> bool {
        self.router.navigate(path)
    }

    // ============================================================================
    // Posts
    // ============================================================================

    /// Likes and comments of `post_id`, subscribing them on first use
    pub fn open_post(&self, post_id: &RecordId) -> Result<PostStreams, AppError> {
        let mut posts = self.posts.lock();
        if let Some(open) = posts.get(post_id) {
            if open.likes.stream().is_live() && open.comments.stream().is_live() {
                return Ok(open.clone());
            }
        }

        let view = post_view(post_id);
        let options = self.config.stream_options();
        let streams = PostStreams {
            likes: LikesStream::open(
                &self.subscriptions,
                &view,
                post_id.clone(),
                self.client.clone(),
                self.clock.clone(),
                options,
            )?,
            comments: CommentsStream::open(
                &self.subscriptions,
                &view,
                post_id.clone(),
                self.client.clone(),
                self.clock.clone(),
                options,
            )?,
        };
        posts.insert(post_id.clone(), streams.clone());
        Ok(streams)
    }

    /// Release the streams of `post_id`; false if it was not open
    pub fn close_post(&self, post_id: &RecordId) -> bool {
        let was_open = self.posts.lock().remove(post_id).is_some();
        self.subscriptions.release_view(&post_view(post_id));
        was_open
    }

    // ============================================================================
    // Intents
    // ============================================================================

    /// Run one user intent
    pub async fn dispatch(&self, intent: Intent) -> Result<IntentOutcome, AppError> {
        tracing::debug!(intent = intent.description(), "Dispatching intent");
        match intent {
            Intent::Navigate { path } => Ok(IntentOutcome::Navigated {
                matched: self.navigate(&path),
            }),
            Intent::CreatePost {
                content,
                image_url,
                community_id,
            } => self
                .feed
                .create_post(&self.user, content.as_deref(), image_url.as_deref(), community_id)
                .await
                .map(IntentOutcome::Created),
            Intent::DeletePost { post_id } => {
                self.feed.delete_post(&self.user, &post_id).await?;
                Ok(IntentOutcome::Deleted)
            }
            Intent::ToggleLike { post_id } => {
                let post = self.open_post(&post_id)?;
                post.likes
                    .toggle_like(&self.user)
                    .await
                    .map(IntentOutcome::Like)
            }
            Intent::AddComment { post_id, content } => {
                let post = self.open_post(&post_id)?;
                post.comments
                    .add_comment(&self.user, &content)
                    .await
                    .map(IntentOutcome::Created)
            }
            Intent::DeleteComment {
                post_id,
                comment_id,
            } => {
                let post = self.open_post(&post_id)?;
                post.comments.delete_comment(&self.user, &comment_id).await?;
                Ok(IntentOutcome::Deleted)
            }
            Intent::SendMessage { chat_id, content } => {
                let chat = self
                    .chat()
                    .filter(|chat| *chat.chat_id() == chat_id)
                    .ok_or_else(|| AppError::not_found(format!("open chat {chat_id}")))?;
                chat.send_message(&self.user, &content)
                    .await
                    .map(IntentOutcome::Created)
            }
        }
    }
}

impl Drop for AppCore {
    fn drop(&mut self) {
        self.route_listener.unsubscribe();
        self.subscriptions.release_all();
    }
}
