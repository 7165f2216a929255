//! The tag-posts view: local interaction state layered over a [`PostsSource`].
//!
//! The view owns the filter popover visibility, the tag-input buffer and the
//! last route tag it reacted to. Everything else (posts, paging, search, the
//! tag list itself) belongs to the data hook and is only read or delegated.

use tracing::debug;
use uuid::Uuid;

use crate::application::posts_hook::{DeleteError, PostsSource};
use crate::domain::entities::{CurrentUser, PostRecord};
use crate::domain::tags::{self, TagSet};

pub const ENTER_KEY: &str = "Enter";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// The key was consumed; the browser's default action must be suppressed.
    PreventDefault,
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddTagOutcome {
    Added(String),
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageNumber {
    pub number: u32,
    pub is_current: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationControls {
    pub page: u32,
    pub total_pages: u32,
    pub previous_disabled: bool,
    pub next_disabled: bool,
    pub pages: Vec<PageNumber>,
}

impl PaginationControls {
    pub fn new(page: u32, total_pages: u32) -> Self {
        let pages = (1..=total_pages)
            .map(|number| PageNumber {
                number,
                is_current: number == page,
            })
            .collect();
        Self {
            page,
            total_pages,
            previous_disabled: page == 1,
            next_disabled: page == total_pages,
            pages,
        }
    }
}

/// Everything the loaded state renders.
#[derive(Debug)]
pub struct LoadedView<'a> {
    pub route_tag: Option<&'a str>,
    pub show_filter_dialog: bool,
    pub tag_input: &'a str,
    pub tags: &'a [String],
    pub search_query: &'a str,
    pub posts: Vec<&'a PostRecord>,
    pub pagination: PaginationControls,
}

#[derive(Debug)]
pub enum ViewState<'a> {
    Loading,
    Error(&'a str),
    Loaded(LoadedView<'a>),
}

pub struct TagPostsView<S> {
    source: S,
    show_filter_dialog: bool,
    tag_input: String,
    route_tag: Option<String>,
}

impl<S: PostsSource> TagPostsView<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            show_filter_dialog: false,
            tag_input: String::new(),
            route_tag: None,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn show_filter_dialog(&self) -> bool {
        self.show_filter_dialog
    }

    pub fn tag_input(&self) -> &str {
        &self.tag_input
    }

    pub fn route_tag(&self) -> Option<&str> {
        self.route_tag.as_deref()
    }

    pub fn toggle_filter_dialog(&mut self) {
        self.show_filter_dialog = !self.show_filter_dialog;
    }

    pub fn set_tag_input(&mut self, text: impl Into<String>) {
        self.tag_input = text.into();
    }

    /// Add `input` to the hook's tag list unless it is blank or already
    /// present; a successful add clears the input buffer.
    pub fn add_tag(&mut self, input: &str) -> AddTagOutcome {
        let Some(tag) = tags::normalize_tag(input) else {
            return AddTagOutcome::Ignored;
        };
        if self.source.tags().contains(&tag) {
            return AddTagOutcome::Ignored;
        }
        self.source.add_tag(&tag);
        self.tag_input.clear();
        AddTagOutcome::Added(tag)
    }

    /// Add whatever is currently in the input buffer.
    pub fn add_pending_tag(&mut self) -> AddTagOutcome {
        let input = self.tag_input.clone();
        self.add_tag(&input)
    }

    pub fn remove_tag(&mut self, tag: &str) {
        self.source.remove_tag(tag);
    }

    pub fn handle_tag_input_key(&mut self, key: &str) -> KeyOutcome {
        if key != ENTER_KEY {
            return KeyOutcome::Ignored;
        }
        self.add_pending_tag();
        KeyOutcome::PreventDefault
    }

    /// Start over as a freshly mounted component: the dialog closes, the
    /// input buffer empties and a route tag seeds the tag list even when it
    /// matches the one seen last time.
    pub fn mount(&mut self, route_tag: Option<&str>) -> bool {
        self.show_filter_dialog = false;
        self.tag_input.clear();
        self.route_tag = None;
        self.sync_route_tag(route_tag)
    }

    /// React to the route's tag segment. A changed tag replaces the tag list
    /// wholesale; a route without a tag leaves it alone.
    pub fn sync_route_tag(&mut self, route_tag: Option<&str>) -> bool {
        let route_tag = route_tag.map(str::trim).filter(|tag| !tag.is_empty());
        if self.route_tag.as_deref() == route_tag {
            return false;
        }
        self.route_tag = route_tag.map(str::to_string);

        let Some(tag) = route_tag else {
            return false;
        };
        debug!(target = "tagfeed::tag_posts", tag, "route tag replaced filter");
        self.source.replace_tags(TagSet::singleton(tag));
        true
    }

    pub fn filtered_posts(&self) -> Vec<&PostRecord> {
        tags::filter_posts(self.source.posts(), self.source.tags())
    }

    pub fn pagination(&self) -> PaginationControls {
        PaginationControls::new(self.source.page(), self.source.total_pages())
    }

    pub fn render_state(&self) -> ViewState<'_> {
        if self.source.loading() {
            return ViewState::Loading;
        }
        if let Some(message) = self.source.error() {
            return ViewState::Error(message);
        }
        ViewState::Loaded(LoadedView {
            route_tag: self.route_tag.as_deref(),
            show_filter_dialog: self.show_filter_dialog,
            tag_input: &self.tag_input,
            tags: self.source.tags().as_slice(),
            search_query: self.source.search_query(),
            posts: self.filtered_posts(),
            pagination: self.pagination(),
        })
    }

    pub fn begin_fetch(&mut self) {
        self.source.begin_fetch();
    }

    pub async fn refresh(&mut self) {
        self.source.refresh().await;
    }

    pub async fn previous_page(&mut self) {
        if !self.pagination().previous_disabled {
            self.source.previous_page().await;
        }
    }

    pub async fn next_page(&mut self) {
        if !self.pagination().next_disabled {
            self.source.next_page().await;
        }
    }

    pub async fn page_click(&mut self, page: u32) {
        self.source.page_click(page).await;
    }

    pub async fn set_search_query(&mut self, query: &str) {
        self.source.set_search_query(query).await;
    }

    pub async fn delete_post(
        &mut self,
        id: Uuid,
        user: Option<&CurrentUser>,
    ) -> Result<(), DeleteError> {
        self.source.delete_post(id, user).await
    }
}
