use std::{num::NonZeroU32, sync::Arc, time::Duration};

use axum::{
    Router,
    body::Body,
    http::{
        HeaderMap, Method, Request, StatusCode,
        header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
    },
};
use http_body_util::BodyExt;
use tagfeed::{
    application::{posts_hook::HookOptions, repos::PostsRepo, sessions::SessionStore},
    infra::{
        http::{HttpState, SESSION_COOKIE, USER_HEADER, build_router},
        memory::{MemoryPostsRepo, parse_seed},
    },
};
use tower::ServiceExt;

const DELETABLE_ID: &str = "6f1c1d1e-8c1b-4a8e-9d43-5b1f0c1a2b3c";

const SEED: &str = r#"
[[posts]]
slug = "ownership"
title = "Ownership in practice"
author_id = "ada"
author_name = "Ada Lovelace"
excerpt = "Borrowing without tears."
tags = ["rust", "memory"]
published_at = "2024-01-01T09:00:00Z"

[[posts]]
slug = "async-io"
title = "Async IO basics"
author_id = "grace"
author_name = "Grace Hopper"
tags = ["rust", "async"]
published_at = "2024-02-01T09:00:00Z"

[[posts]]
slug = "goroutines"
title = "Goroutines versus tasks"
author_id = "ada"
author_name = "Ada Lovelace"
tags = ["go", "rust"]
published_at = "2024-03-01T09:00:00Z"

[[posts]]
id = "6f1c1d1e-8c1b-4a8e-9d43-5b1f0c1a2b3c"
slug = "channels"
title = "Channels in Go"
author_id = "linus"
author_name = "Linus Torvalds"
excerpt = "Buffered and unbuffered."
tags = ["go"]
published_at = "2024-04-01T09:00:00Z"

[[posts]]
slug = "profiling"
title = "Profiling Go services"
author_id = "linus"
author_name = "Linus Torvalds"
tags = ["go", "performance"]
published_at = "2024-05-01T09:00:00Z"
"#;

fn app_with_page_size(page_size: u32) -> Router {
    let posts = parse_seed(SEED, "seed.toml").expect("seed should parse");
    let repo: Arc<dyn PostsRepo> = Arc::new(MemoryPostsRepo::new(posts));
    let options = HookOptions {
        initial_page: NonZeroU32::MIN,
        page_size: NonZeroU32::new(page_size).expect("non-zero page size"),
    };
    let sessions = Arc::new(SessionStore::new(repo, options, Duration::from_secs(600)));
    build_router(HttpState::new(sessions))
}

fn app() -> Router {
    app_with_page_size(12)
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

async fn send(app: &Router, request: Request<Body>) -> Reply {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    Reply {
        status,
        headers,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    }
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("request should build")
}

fn post(uri: &str, cookie: &str, form: &str, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(COOKIE, cookie)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(user) = user {
        builder = builder.header(USER_HEADER, user);
    }
    builder
        .body(Body::from(form.to_string()))
        .expect("request should build")
}

fn session_cookie(reply: &Reply) -> String {
    let header = reply
        .headers
        .get(SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .expect("new sessions set a cookie");
    let pair = header.split(';').next().expect("cookie pair");
    assert!(pair.starts_with(SESSION_COOKIE));
    pair.to_string()
}

/// Open a session and stream its first fetch.
async fn loaded_session(app: &Router) -> String {
    let reply = send(app, get("/ui/posts", None)).await;
    assert_eq!(reply.status, StatusCode::OK);
    session_cookie(&reply)
}

#[tokio::test]
async fn index_renders_loader_that_requests_the_stream() {
    let app = app();
    let reply = send(&app, get("/", None)).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.contains(r#"id="tag-posts""#));
    assert!(reply.body.contains("data-init=\"@get('/ui/posts')\""));
    assert!(reply.body.contains("Loading posts"));
    session_cookie(&reply);
}

#[tokio::test]
async fn stream_sends_loader_before_results() {
    let app = app();
    let reply = send(&app, get("/ui/posts", None)).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body.matches("datastar-patch-elements").count(), 2);
    assert!(reply.body.contains("selector #tag-posts"));

    let loader = reply.body.find("Loading posts").expect("loader patch");
    let results = reply.body.find("Profiling Go services").expect("results patch");
    assert!(loader < results);
    assert!(!reply.body.contains("data-init"));
}

#[tokio::test]
async fn existing_session_is_reused_without_new_cookie() {
    let app = app();
    let cookie = loaded_session(&app).await;

    let reply = send(&app, get("/ui/posts", Some(&cookie))).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.headers.get(SET_COOKIE).is_none());
}

#[tokio::test]
async fn tag_route_limits_cards_to_that_tag() {
    let app = app();
    let cookie = loaded_session(&app).await;

    let page = send(&app, get("/tags/go", Some(&cookie))).await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("<title>go Posts</title>"));

    let reply = send(&app, get("/ui/posts", Some(&cookie))).await;
    assert!(reply.body.contains("go Posts"));
    assert!(reply.body.contains("Channels in Go"));
    assert!(reply.body.contains("Goroutines versus tasks"));
    assert!(!reply.body.contains("Ownership in practice"));
    assert!(!reply.body.contains("Async IO basics"));
}

#[tokio::test]
async fn reloading_tag_route_reapplies_its_tag() {
    let app = app();
    let page = send(&app, get("/tags/rust", None)).await;
    let cookie = session_cookie(&page);

    let first = send(&app, get("/ui/posts", Some(&cookie))).await;
    assert!(!first.body.contains("Channels in Go"));

    let cleared = send(
        &app,
        post("/ui/filter/tags/remove", &cookie, "tag=rust", None),
    )
    .await;
    assert!(cleared.body.contains("Channels in Go"));

    let reload = send(&app, get("/tags/rust", Some(&cookie))).await;
    assert_eq!(reload.status, StatusCode::OK);
    let reply = send(&app, get("/ui/posts", Some(&cookie))).await;
    assert!(reply.body.contains("Ownership in practice"));
    assert!(!reply.body.contains("Channels in Go"));
    assert!(!reply.body.contains(r#"role="dialog""#));
}

#[tokio::test]
async fn typed_tag_text_survives_other_patches() {
    let app = app();
    let cookie = loaded_session(&app).await;
    send(&app, post("/ui/filter/toggle", &cookie, "", None)).await;

    let typed = send(&app, post("/ui/filter/input", &cookie, "tag=perf", None)).await;
    assert_eq!(typed.status, StatusCode::NO_CONTENT);
    assert!(typed.body.is_empty());

    let searched = send(&app, post("/ui/search", &cookie, "search=go", None)).await;
    assert!(searched.body.contains(r#"value="perf""#));

    let added = send(&app, post("/ui/filter/tags", &cookie, "tag=performance", None)).await;
    assert!(added.body.contains("Profiling Go services"));
    assert!(!added.body.contains(r#"value="perf""#));
}

#[tokio::test]
async fn filter_tags_require_every_selected_tag() {
    let app = app();
    let cookie = loaded_session(&app).await;

    let toggled = send(&app, post("/ui/filter/toggle", &cookie, "", None)).await;
    assert!(toggled.body.contains(r#"role="dialog""#));

    send(&app, post("/ui/filter/tags", &cookie, "tag=Rust", None)).await;
    let reply = send(&app, post("/ui/filter/tags", &cookie, "tag=go", None)).await;

    assert!(reply.body.contains("Goroutines versus tasks"));
    assert!(!reply.body.contains("Channels in Go"));
    assert!(!reply.body.contains("Ownership in practice"));

    let removed = send(
        &app,
        post("/ui/filter/tags/remove", &cookie, "tag=rust", None),
    )
    .await;
    assert!(removed.body.contains("Channels in Go"));
    assert!(!removed.body.contains("Ownership in practice"));
}

#[tokio::test]
async fn enter_key_adds_pending_tag_and_other_keys_are_ignored() {
    let app = app();
    let cookie = loaded_session(&app).await;
    send(&app, post("/ui/filter/toggle", &cookie, "", None)).await;

    let ignored = send(
        &app,
        post("/ui/filter/keydown?key=a", &cookie, "tag=go", None),
    )
    .await;
    assert_eq!(ignored.status, StatusCode::NO_CONTENT);

    let added = send(
        &app,
        post("/ui/filter/keydown?key=Enter", &cookie, "tag=performance", None),
    )
    .await;
    assert_eq!(added.status, StatusCode::OK);
    assert!(added.body.contains("Profiling Go services"));
    assert!(!added.body.contains("Channels in Go"));
}

#[tokio::test]
async fn search_queries_the_repository() {
    let app = app();
    let cookie = loaded_session(&app).await;

    let reply = send(&app, post("/ui/search", &cookie, "search=channels", None)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.contains("Channels in Go"));
    assert!(!reply.body.contains("Profiling Go services"));
    assert!(reply.body.contains(r#"value="channels""#));
    assert!(reply.body.contains(r#"data-on:input="@post('/ui/search'"#));
    assert!(!reply.body.contains("debounce"));

    let empty = send(&app, post("/ui/search", &cookie, "search=nothing+matches", None)).await;
    assert!(empty.body.contains("No posts found."));
}

#[tokio::test]
async fn pagination_moves_between_pages_and_clamps() {
    let app = app_with_page_size(2);
    let cookie = loaded_session(&app).await;

    let next = send(&app, post("/ui/pages/next", &cookie, "", None)).await;
    assert!(next.body.contains("Goroutines versus tasks"));
    assert!(!next.body.contains("Profiling Go services"));

    let far = send(&app, post("/ui/pages/9", &cookie, "", None)).await;
    assert!(far.body.contains("Ownership in practice"));

    let beyond = send(&app, post("/ui/pages/next", &cookie, "", None)).await;
    assert!(beyond.body.contains("Ownership in practice"));

    let back = send(&app, post("/ui/pages/previous", &cookie, "", None)).await;
    assert!(back.body.contains("Goroutines versus tasks"));
}

#[tokio::test]
async fn delete_is_limited_to_the_author() {
    let app = app();
    let cookie = loaded_session(&app).await;
    let uri = format!("/ui/posts/{DELETABLE_ID}/delete");

    let anonymous = send(&app, post(&uri, &cookie, "", None)).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let stranger = send(&app, post(&uri, &cookie, "", Some("ada:Ada Lovelace"))).await;
    assert_eq!(stranger.status, StatusCode::FORBIDDEN);

    let author = send(&app, post(&uri, &cookie, "", Some("linus"))).await;
    assert_eq!(author.status, StatusCode::OK);
    assert!(!author.body.contains("Channels in Go"));
    assert!(author.body.contains("Signed in as linus"));

    let again = send(&app, post(&uri, &cookie, "", Some("linus"))).await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_button_only_shows_on_own_posts() {
    let app = app();
    let request = Request::builder()
        .method(Method::GET)
        .uri("/ui/posts")
        .header(USER_HEADER, "linus:Linus Torvalds")
        .body(Body::empty())
        .expect("request should build");
    let reply = send(&app, request).await;

    assert_eq!(reply.body.matches("post-card-delete").count(), 2);
    assert!(reply.body.contains("Signed in as Linus Torvalds"));
}

#[tokio::test]
async fn health_and_unknown_routes() {
    let app = app();

    let health = send(&app, get("/_health", None)).await;
    assert_eq!(health.status, StatusCode::NO_CONTENT);

    let missing = send(&app, get("/no/such/page", None)).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert!(missing.body.contains("Page Not Found"));
}
