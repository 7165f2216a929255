use std::sync::Arc;

use axum::{
    Router,
    extract::Path,
    http::StatusCode,
    middleware,
    response::Response,
    routing::get,
};

use crate::{
    application::sessions::SessionStore,
    presentation::views::{
        IndexTemplate, LayoutContext, TagPostsContext, heading_text, render_not_found_response,
        render_template_response,
    },
};

use super::{
    identity::{Session, Viewer},
    middleware::{log_responses, set_request_context},
    ui,
};

#[derive(Clone)]
pub struct HttpState {
    pub sessions: Arc<SessionStore>,
}

impl HttpState {
    pub fn new(sessions: Arc<SessionStore>) -> Self {
        Self { sessions }
    }
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/tags/{tag}", get(tag_index))
        .route("/_health", get(health))
        .merge(ui::router())
        .fallback(fallback_router)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn index(session: Session, viewer: Viewer) -> Response {
    render_page(session, viewer, None).await
}

async fn tag_index(session: Session, viewer: Viewer, Path(tag): Path<String>) -> Response {
    render_page(session, viewer, Some(&tag)).await
}

/// Full-page render mounts the component afresh. It starts in its loading
/// state and the browser streams the fetch from `/ui/posts`.
async fn render_page(session: Session, Viewer(user): Viewer, route_tag: Option<&str>) -> Response {
    let shared = session.view();
    let (title, content) = {
        let mut view = shared.lock().await;
        view.mount(route_tag);
        view.begin_fetch();
        (
            heading_text(view.route_tag()),
            TagPostsContext::from_view(&view, user.as_ref()).with_autoload(),
        )
    };

    let template = IndexTemplate {
        view: LayoutContext::new(title, ()),
        content,
    };
    session.respond(render_template_response(template, StatusCode::OK))
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn fallback_router() -> Response {
    render_not_found_response()
}
