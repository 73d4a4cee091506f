//! Navigation behavior against the AniVerse route layout

use aniverse_router::{RouteState, RouteTable, Router};
use parking_lot::Mutex;
use proptest::prelude::*;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
enum View {
    Feed,
    Communities,
    Community(String),
    Inbox,
    Chat(String),
    Profile(String),
}

fn app_router() -> Router<View> {
    let table = RouteTable::builder()
        .register_route("home", "home", |_| View::Feed)
        .and_then(|b| b.register_route("communities", "comunidades", |_| View::Communities))
        .and_then(|b| {
            b.register_route("community-detail", "comunidades/:communityId", |p| {
                View::Community(p.get("communityId").cloned().unwrap_or_default())
            })
        })
        .and_then(|b| {
            b.register_route("messages", "messages", |p| match p.get("chatId") {
                Some(chat) => View::Chat(chat.clone()),
                None => View::Inbox,
            })
        })
        .and_then(|b| b.alias("messages", "messages/:chatId"))
        .and_then(|b| {
            b.register_route("profile", "perfil/:userId", |p| {
                View::Profile(p.get("userId").cloned().unwrap_or_default())
            })
        })
        .expect("route table")
        .build();
    Router::new(table, "home").expect("router")
}

fn recorder(router: &Router<View>) -> Arc<Mutex<Vec<RouteState>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    // Dropping the handle keeps the listener registered
    let _ = router.subscribe(move |state| sink.lock().push(state.clone()));
    seen
}

#[test]
fn dynamic_segment_captures_param() {
    let router = app_router();
    let seen = recorder(&router);

    assert!(router.navigate("messages/abc-123"));

    assert_eq!(router.current_route(), "messages");
    assert_eq!(router.current().param("chatId"), Some("abc-123"));
    assert_eq!(router.current_view(), Some(View::Chat("abc-123".into())));

    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].route, "messages");
    assert_eq!(seen[0].param("chatId"), Some("abc-123"));
}

#[test]
fn static_route_after_dynamic_clears_params() {
    let router = app_router();
    router.navigate("messages/abc");
    router.navigate("messages");

    assert_eq!(router.current_route(), "messages");
    assert!(router.current_params().is_empty());
    assert_eq!(router.current_view(), Some(View::Inbox));
}

#[test]
fn remainder_with_slashes_is_one_param() {
    let router = app_router();
    assert!(router.navigate("perfil/user/42"));
    assert_eq!(router.current().param("userId"), Some("user/42"));
}

#[test]
fn unknown_path_keeps_state_and_is_silent() {
    let router = app_router();
    router.navigate("comunidades/7");
    let seen = recorder(&router);

    assert!(!router.navigate("unknown/path"));
    assert!(!router.navigate(""));
    assert!(!router.navigate("messages/"));

    assert_eq!(router.current_route(), "community-detail");
    assert_eq!(router.current().param("communityId"), Some("7"));
    assert!(seen.lock().is_empty());
}

#[test]
fn independent_subscriptions_revoke_independently() {
    let router = app_router();
    let a = Arc::new(Mutex::new(0));
    let b = Arc::new(Mutex::new(0));

    let a_count = a.clone();
    let a_handle = router.subscribe(move |_| *a_count.lock() += 1);
    let b_count = b.clone();
    let _b_handle = router.subscribe(move |_| *b_count.lock() += 1);

    router.navigate("comunidades");
    a_handle.unsubscribe();
    router.navigate("home");

    assert_eq!(*a.lock(), 1);
    assert_eq!(*b.lock(), 2);
}

#[test]
fn concurrent_navigations_deliver_the_final_state_last() {
    let router = app_router();
    let last = Arc::new(Mutex::new(None));
    let sink = last.clone();
    let _handle = router.subscribe(move |state| {
        if state.param("chatId") == Some("a") {
            thread::sleep(Duration::from_millis(50));
        }
        *sink.lock() = Some(state.clone());
    });

    let slow = {
        let router = router.clone();
        thread::spawn(move || router.navigate("messages/a"))
    };
    thread::sleep(Duration::from_millis(10));
    let fast = {
        let router = router.clone();
        thread::spawn(move || router.navigate("messages/b"))
    };
    assert!(slow.join().unwrap());
    assert!(fast.join().unwrap());

    let delivered = last.lock().clone();
    assert_eq!(delivered, Some(router.current()));
}

fn path_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("home".to_string()),
        Just("comunidades".to_string()),
        Just("messages".to_string()),
        "[a-z0-9-]{1,12}".prop_map(|id| format!("comunidades/{id}")),
        "[a-z0-9/-]{1,16}".prop_map(|id| format!("messages/{id}")),
        "[a-z/]{0,12}",
    ]
}

proptest! {
    /// Navigating to the same path from any state yields the same state
    #[test]
    fn prop_navigation_is_deterministic(
        warmup in prop::collection::vec(path_strategy(), 0..6),
        path in path_strategy(),
    ) {
        let fresh = app_router();
        let matched = fresh.navigate(&path);

        let warmed = app_router();
        for p in &warmup {
            warmed.navigate(p);
        }
        let before = warmed.current();
        prop_assert_eq!(warmed.navigate(&path), matched);

        if matched {
            prop_assert_eq!(warmed.current(), fresh.current());
        } else {
            prop_assert_eq!(warmed.current(), before);
        }
    }

    /// Every delivered state equals the router state at delivery time
    #[test]
    fn prop_notifications_match_state(paths in prop::collection::vec(path_strategy(), 1..12)) {
        let router = app_router();
        let probe = router.clone();
        let mismatches = Arc::new(Mutex::new(0usize));
        let sink = mismatches.clone();
        let _handle = router.subscribe(move |state| {
            if *state != probe.current() {
                *sink.lock() += 1;
            }
        });

        for p in &paths {
            router.navigate(p);
        }
        prop_assert_eq!(*mismatches.lock(), 0);
    }
}
