use crate::application::error::{ErrorReport, HttpError};
use crate::application::posts_hook::PostsSource;
use crate::application::tag_posts::{LoadedView, PaginationControls, TagPostsView, ViewState};
use crate::domain::entities::{CurrentUser, PostRecord};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::{
    format_description::{FormatItem, well_known::Rfc3339},
    macros::format_description,
};
use url::form_urlencoded;

pub const HUMAN_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[month repr:long] [day padding:none], [year]");

const SITE_TITLE: &str = "Posts";

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    render_fragment(template, "presentation::views::render_template").map(Html)
}

/// Render a template to a bare string, for SSE patches.
pub fn render_fragment<T: Template>(template: T, source: &'static str) -> Result<String, HttpError> {
    template
        .render()
        .map_err(|err| TemplateRenderError::new(source, "Template rendering failed", err).into())
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response() -> Response {
    let view = LayoutContext::new(SITE_TITLE, ErrorPageView::not_found());
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub title: String,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(title: impl Into<String>, content: T) -> Self {
        Self {
            title: title.into(),
            content,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TagBadge {
    pub label: String,
    pub href: String,
}

#[derive(Clone, Debug)]
pub struct PostCardView {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub author_name: String,
    pub excerpt: String,
    pub published: String,
    pub iso_date: String,
    pub badges: Vec<TagBadge>,
    pub can_delete: bool,
    pub delete_action: String,
}

impl PostCardView {
    pub fn new(post: &PostRecord, user: Option<&CurrentUser>) -> Self {
        Self {
            id: post.id.to_string(),
            slug: post.slug.clone(),
            title: post.title.clone(),
            author_name: post.author.name.clone(),
            excerpt: post.excerpt.clone(),
            published: post
                .published_at
                .format(HUMAN_DATE_FORMAT)
                .unwrap_or_default(),
            iso_date: post.published_at.format(&Rfc3339).unwrap_or_default(),
            badges: build_tag_badges(&post.tags),
            can_delete: user.is_some_and(|user| user.is_author_of(post)),
            delete_action: format!("/ui/posts/{}/delete", post.id),
        }
    }
}

#[derive(Clone, Debug)]
pub struct TagChip {
    pub label: String,
}

#[derive(Clone, Debug)]
pub struct PageButtonView {
    pub number: u32,
    pub is_current: bool,
    pub action: String,
}

#[derive(Clone, Debug, Default)]
pub struct PaginationView {
    pub previous_disabled: bool,
    pub next_disabled: bool,
    pub pages: Vec<PageButtonView>,
}

impl From<PaginationControls> for PaginationView {
    fn from(controls: PaginationControls) -> Self {
        Self {
            previous_disabled: controls.previous_disabled,
            next_disabled: controls.next_disabled,
            pages: controls
                .pages
                .into_iter()
                .map(|page| PageButtonView {
                    number: page.number,
                    is_current: page.is_current,
                    action: format!("/ui/pages/{}", page.number),
                })
                .collect(),
        }
    }
}

/// Render model of the tag-posts component in any of its three states.
#[derive(Clone, Debug, Default)]
pub struct TagPostsContext {
    pub loading: bool,
    pub error: Option<String>,
    pub heading: String,
    pub show_filter_dialog: bool,
    pub tag_input: String,
    pub tags: Vec<TagChip>,
    pub search_query: String,
    pub cards: Vec<PostCardView>,
    pub pagination: PaginationView,
    pub viewer_name: Option<String>,
    /// Full-page renders ask the browser to stream the first fetch.
    pub autoload: bool,
}

impl TagPostsContext {
    pub fn loading() -> Self {
        Self {
            loading: true,
            ..Default::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn loaded(view: LoadedView<'_>, user: Option<&CurrentUser>) -> Self {
        Self {
            loading: false,
            error: None,
            heading: heading_text(view.route_tag),
            show_filter_dialog: view.show_filter_dialog,
            tag_input: view.tag_input.to_string(),
            tags: view
                .tags
                .iter()
                .map(|tag| TagChip { label: tag.clone() })
                .collect(),
            search_query: view.search_query.to_string(),
            cards: view
                .posts
                .into_iter()
                .map(|post| PostCardView::new(post, user))
                .collect(),
            pagination: view.pagination.into(),
            viewer_name: user.map(|user| user.name.clone()),
            autoload: false,
        }
    }

    pub fn from_view<S: PostsSource>(view: &TagPostsView<S>, user: Option<&CurrentUser>) -> Self {
        match view.render_state() {
            ViewState::Loading => Self::loading(),
            ViewState::Error(message) => Self::error(message),
            ViewState::Loaded(loaded) => Self::loaded(loaded, user),
        }
    }

    pub fn with_autoload(mut self) -> Self {
        self.autoload = true;
        self
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<()>,
    pub content: TagPostsContext,
}

#[derive(Template)]
#[template(path = "partials/tag_posts.html")]
pub struct TagPostsPartial {
    pub content: TagPostsContext,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page Not Found".to_string(),
            message: "The page you requested does not exist.".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

pub fn build_tag_badges(tags: &[String]) -> Vec<TagBadge> {
    tags.iter()
        .filter_map(|tag| {
            let label = tag.trim();
            (!label.is_empty()).then(|| TagBadge {
                label: format!("#{label}"),
                href: format!("/tags/{}", encode_path_segment(&label.to_lowercase())),
            })
        })
        .collect()
}

/// `form_urlencoded` writes spaces as `+` and escapes a literal `+`, so the
/// swap yields a valid path segment.
fn encode_path_segment(segment: &str) -> String {
    form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Heading text for the component: the route tag, if any, followed by the title.
pub fn heading_text(route_tag: Option<&str>) -> String {
    match route_tag {
        Some(tag) => format!("{tag} {SITE_TITLE}"),
        None => SITE_TITLE.to_string(),
    }
}
