use std::collections::HashMap;
use std::{num::NonZeroU32, sync::Arc, time::Duration};

use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header::COOKIE, header::SET_COOKIE},
};
use http_body_util::BodyExt;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use tagfeed::{
    application::{posts_hook::HookOptions, repos::PostsRepo, sessions::SessionStore},
    infra::{
        http::{HttpState, USER_HEADER, build_router},
        memory::{MemoryPostsRepo, parse_seed},
    },
};
use tower::ServiceExt;

const SEED: &str = r#"
[[posts]]
id = "0b9f3c52-3f0e-4d8b-9d0e-2a7c5f1e9a11"
slug = "first"
title = "First post"
author_id = "ada"
tags = ["rust"]
published_at = "2024-01-01T00:00:00Z"

[[posts]]
slug = "second"
title = "Second post"
author_id = "grace"
tags = ["go"]
published_at = "2024-02-01T00:00:00Z"
"#;

#[tokio::test]
async fn ui_interactions_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let posts = parse_seed(SEED, "seed.toml").expect("seed should parse");
    let repo: Arc<dyn PostsRepo> = Arc::new(MemoryPostsRepo::new(posts));
    let options = HookOptions {
        initial_page: NonZeroU32::MIN,
        page_size: NonZeroU32::MIN,
    };
    let sessions = Arc::new(SessionStore::new(repo, options, Duration::from_secs(60)));
    let app = build_router(HttpState::new(sessions));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/ui/posts")
                .body(Body::empty())
                .expect("request should build"),
        )
        .await
        .expect("router should respond");
    let cookie = response
        .headers()
        .get(SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .expect("session cookie")
        .to_string();
    response
        .into_body()
        .collect()
        .await
        .expect("stream should finish");

    for (uri, user) in [
        ("/ui/pages/next", None),
        ("/ui/filter/toggle", None),
        (
            "/ui/posts/0b9f3c52-3f0e-4d8b-9d0e-2a7c5f1e9a11/delete",
            Some("ada"),
        ),
    ] {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(COOKIE, cookie.as_str());
        if let Some(user) = user {
            builder = builder.header(USER_HEADER, user);
        }
        let response = app
            .clone()
            .oneshot(builder.body(Body::empty()).expect("request should build"))
            .await
            .expect("router should respond");
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
    }

    let counters: HashMap<String, u64> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .filter_map(|(composite_key, _, _, value)| {
            let key = composite_key.key();
            let action = key
                .labels()
                .find(|label| label.key() == "action")
                .map(|label| format!("{{{}}}", label.value()))
                .unwrap_or_default();
            match value {
                DebugValue::Counter(count) => Some((format!("{}{action}", key.name()), count)),
                _ => None,
            }
        })
        .collect();

    for (metric, expected) in [
        ("tagfeed_ui_events_total{load}", 1),
        ("tagfeed_ui_events_total{next_page}", 1),
        ("tagfeed_ui_events_total{toggle_filter}", 1),
        ("tagfeed_ui_events_total{delete_post}", 1),
        ("tagfeed_posts_deleted_total", 1),
    ] {
        assert_eq!(
            counters.get(metric).copied(),
            Some(expected),
            "metric {metric}"
        );
    }
}
