//! The chat subscription tracks the route under arbitrary navigation

use aniverse_app::{AppConfig, AppCore};
use aniverse_core::{RecordId, StreamFilter};
use aniverse_testkit::{ManualClock, ScriptedMutationClient, SpyFeed};
use proptest::prelude::*;
use std::sync::Arc;

fn arb_path() -> impl Strategy<Value = String> {
    prop_oneof![
        (0u8..4).prop_map(|chat| format!("messages/c{chat}")),
        Just("messages".to_string()),
        Just("home".to_string()),
        Just("comunidades/7".to_string()),
        Just("nowhere".to_string()),
        Just("messages/".to_string()),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_at_most_one_chat_subscription(paths in prop::collection::vec(arb_path(), 1..24)) {
        let feed = Arc::new(SpyFeed::new());
        let core = AppCore::new(
            AppConfig::default(),
            RecordId::new("u1"),
            feed.clone(),
            Arc::new(ScriptedMutationClient::new()),
            Arc::new(ManualClock::default()),
        )
        .unwrap();

        for path in &paths {
            core.navigate(path);

            let state = core.router().current();
            let expected: Vec<StreamFilter> = match state.param("chatId") {
                Some(chat) if state.route == "messages" => vec![StreamFilter::eq("chat_id", chat)],
                _ => Vec::new(),
            };
            prop_assert_eq!(feed.active_filters("messages"), expected);
            prop_assert_eq!(
                core.chat().map(|chat| chat.chat_id().to_string()),
                state.param("chatId").map(str::to_string)
            );
        }
    }
}
