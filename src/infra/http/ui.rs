//! Datastar endpoints driving the tag-posts component.
//!
//! Every interaction locks the caller's view, applies one operation and
//! answers with a morph patch of `#tag-posts`.

use std::convert::Infallible;

use async_stream::stream;
use axum::{
    Form, Router,
    extract::{Path, Query},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, Sse},
    },
    routing::{get, post},
};
use metrics::counter;
use serde::Deserialize;
use tracing::{debug, error};
use uuid::Uuid;

use crate::{
    application::{
        error::HttpError,
        posts_hook::PostsHook,
        stream::{PatchStream, morph_event},
        tag_posts::{AddTagOutcome, KeyOutcome, TagPostsView},
    },
    domain::entities::CurrentUser,
    infra::telemetry::UI_EVENTS_TOTAL,
    presentation::views::{TagPostsContext, TagPostsPartial, render_fragment},
};

use super::{
    HttpState,
    identity::{Session, Viewer},
    selectors::TAG_POSTS,
};

pub(super) fn router() -> Router<HttpState> {
    Router::new()
        .route("/ui/posts", get(posts_stream))
        .route("/ui/filter/toggle", post(toggle_filter))
        .route("/ui/filter/input", post(tag_input_changed))
        .route("/ui/filter/tags", post(add_tag))
        .route("/ui/filter/tags/remove", post(remove_tag))
        .route("/ui/filter/keydown", post(tag_input_keydown))
        .route("/ui/search", post(search))
        .route("/ui/pages/next", post(next_page))
        .route("/ui/pages/previous", post(previous_page))
        .route("/ui/pages/{page}", post(page_click))
        .route("/ui/posts/{id}/delete", post(delete_post))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TagForm {
    tag: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchForm {
    search: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct KeyQuery {
    key: String,
}

fn record_event(action: &'static str) {
    counter!(UI_EVENTS_TOTAL, "action" => action).increment(1);
}

fn render_component(
    view: &TagPostsView<PostsHook>,
    user: Option<&CurrentUser>,
) -> Result<String, HttpError> {
    let content = TagPostsContext::from_view(view, user);
    render_fragment(
        TagPostsPartial { content },
        "infra::http::ui::render_component",
    )
}

fn component_patch(view: &TagPostsView<PostsHook>, user: Option<&CurrentUser>) -> Response {
    match render_component(view, user) {
        Ok(html) => PatchStream::new().morph(html, TAG_POSTS).into_response(),
        Err(err) => err.into_response(),
    }
}

fn component_event(view: &TagPostsView<PostsHook>, user: Option<&CurrentUser>) -> Option<Event> {
    match render_component(view, user) {
        Ok(html) => Some(morph_event(html, TAG_POSTS)),
        Err(err) => {
            error!(
                target = "tagfeed::http::ui",
                status = err.status().as_u16(),
                "failed to render tag posts patch"
            );
            None
        }
    }
}

/// Stream the loading state, run the fetch, then stream the result.
async fn posts_stream(session: Session, Viewer(user): Viewer) -> Response {
    record_event("load");
    let shared = session.view();
    let events = stream! {
        let mut view = shared.lock_owned().await;
        view.begin_fetch();
        if let Some(event) = component_event(&view, user.as_ref()) {
            yield Ok::<Event, Infallible>(event);
        }
        view.refresh().await;
        if let Some(event) = component_event(&view, user.as_ref()) {
            yield Ok::<Event, Infallible>(event);
        }
    };
    session.respond(Sse::new(events).into_response())
}

async fn toggle_filter(session: Session, Viewer(user): Viewer) -> Response {
    record_event("toggle_filter");
    let shared = session.view();
    let mut view = shared.lock().await;
    view.toggle_filter_dialog();
    session.respond(component_patch(&view, user.as_ref()))
}

/// Mirror the tag field into the view so later patches keep the typed text.
async fn tag_input_changed(session: Session, Form(form): Form<TagForm>) -> Response {
    let shared = session.view();
    shared.lock().await.set_tag_input(form.tag);
    session.respond(StatusCode::NO_CONTENT.into_response())
}

async fn add_tag(session: Session, Viewer(user): Viewer, Form(form): Form<TagForm>) -> Response {
    record_event("add_tag");
    let shared = session.view();
    let mut view = shared.lock().await;
    view.set_tag_input(form.tag);
    if let AddTagOutcome::Added(tag) = view.add_pending_tag() {
        debug!(target = "tagfeed::http::ui", tag = %tag, "tag added to filter");
    }
    session.respond(component_patch(&view, user.as_ref()))
}

async fn remove_tag(session: Session, Viewer(user): Viewer, Form(form): Form<TagForm>) -> Response {
    record_event("remove_tag");
    let shared = session.view();
    let mut view = shared.lock().await;
    view.remove_tag(&form.tag);
    session.respond(component_patch(&view, user.as_ref()))
}

async fn tag_input_keydown(
    session: Session,
    Viewer(user): Viewer,
    Query(query): Query<KeyQuery>,
    Form(form): Form<TagForm>,
) -> Response {
    let shared = session.view();
    let mut view = shared.lock().await;
    view.set_tag_input(form.tag);
    match view.handle_tag_input_key(&query.key) {
        KeyOutcome::PreventDefault => {
            record_event("add_tag");
            session.respond(component_patch(&view, user.as_ref()))
        }
        KeyOutcome::Ignored => session.respond(StatusCode::NO_CONTENT.into_response()),
    }
}

async fn search(
    session: Session,
    Viewer(user): Viewer,
    Form(form): Form<SearchForm>,
) -> Response {
    record_event("search");
    let shared = session.view();
    let mut view = shared.lock().await;
    view.set_search_query(&form.search).await;
    session.respond(component_patch(&view, user.as_ref()))
}

async fn next_page(session: Session, Viewer(user): Viewer) -> Response {
    record_event("next_page");
    let shared = session.view();
    let mut view = shared.lock().await;
    view.next_page().await;
    session.respond(component_patch(&view, user.as_ref()))
}

async fn previous_page(session: Session, Viewer(user): Viewer) -> Response {
    record_event("previous_page");
    let shared = session.view();
    let mut view = shared.lock().await;
    view.previous_page().await;
    session.respond(component_patch(&view, user.as_ref()))
}

async fn page_click(session: Session, Viewer(user): Viewer, Path(page): Path<u32>) -> Response {
    record_event("page_click");
    let shared = session.view();
    let mut view = shared.lock().await;
    view.page_click(page).await;
    session.respond(component_patch(&view, user.as_ref()))
}

async fn delete_post(session: Session, Viewer(user): Viewer, Path(id): Path<Uuid>) -> Response {
    record_event("delete_post");
    let shared = session.view();
    let mut view = shared.lock().await;
    let response = match view.delete_post(id, user.as_ref()).await {
        Ok(()) => component_patch(&view, user.as_ref()),
        Err(err) => HttpError::from(err).into_response(),
    };
    session.respond(response)
}
