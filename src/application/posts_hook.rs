//! Posts data hook.
//!
//! Owns everything the tag-posts view delegates: fetching a page of posts,
//! numbered pagination, the search query and the active tag list. The view
//! only talks to it through [`PostsSource`].

use std::{num::NonZeroU32, sync::Arc};

use async_trait::async_trait;
use metrics::counter;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::pagination::{self, PageRequest};
use crate::application::repos::{PostQueryFilter, PostsRepo, RepoError};
use crate::domain::entities::{CurrentUser, PostRecord};
use crate::domain::tags::TagSet;

pub const DEFAULT_PAGE_SIZE: u32 = 12;

#[derive(Debug, Clone, Copy)]
pub struct HookOptions {
    pub initial_page: NonZeroU32,
    pub page_size: NonZeroU32,
}

impl Default for HookOptions {
    fn default() -> Self {
        Self {
            initial_page: NonZeroU32::MIN,
            page_size: NonZeroU32::new(DEFAULT_PAGE_SIZE).unwrap_or(NonZeroU32::MIN),
        }
    }
}

#[derive(Debug, Error)]
pub enum DeleteError {
    #[error("sign in to delete posts")]
    Unauthenticated,
    #[error("post `{id}` not found")]
    NotFound { id: Uuid },
    #[error("`{actor}` may not delete post `{id}`")]
    Forbidden { actor: String, id: Uuid },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Capabilities the tag-posts view consumes from its data hook.
#[async_trait]
pub trait PostsSource: Send + Sync {
    fn posts(&self) -> &[PostRecord];
    fn loading(&self) -> bool;
    fn error(&self) -> Option<&str>;
    fn page(&self) -> u32;
    fn total_pages(&self) -> u32;
    fn search_query(&self) -> &str;
    fn tags(&self) -> &TagSet;

    /// Mark a fetch as in flight without performing it.
    fn begin_fetch(&mut self);
    async fn refresh(&mut self);
    async fn next_page(&mut self);
    async fn previous_page(&mut self);
    async fn page_click(&mut self, page: u32);
    async fn delete_post(
        &mut self,
        id: Uuid,
        user: Option<&CurrentUser>,
    ) -> Result<(), DeleteError>;
    async fn set_search_query(&mut self, query: &str);
    fn add_tag(&mut self, tag: &str);
    fn remove_tag(&mut self, tag: &str);
    fn replace_tags(&mut self, tags: TagSet);
}

pub struct PostsHook {
    repo: Arc<dyn PostsRepo>,
    page_size: NonZeroU32,
    page: u32,
    total_pages: u32,
    posts: Vec<PostRecord>,
    loading: bool,
    error: Option<String>,
    search_query: String,
    tags: TagSet,
}

impl PostsHook {
    /// A hook that has not fetched yet; it reports `loading` until the first
    /// [`PostsSource::refresh`].
    pub fn new(repo: Arc<dyn PostsRepo>, options: HookOptions) -> Self {
        Self {
            repo,
            page_size: options.page_size,
            page: options.initial_page.get(),
            total_pages: 1,
            posts: Vec::new(),
            loading: true,
            error: None,
            search_query: String::new(),
            tags: TagSet::new(),
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size.get()
    }

    async fn fetch(&mut self) {
        self.loading = true;
        let filter = PostQueryFilter::with_search(&self.search_query);

        // A second round only happens when the current page no longer exists.
        let mut clamped = false;
        loop {
            let request = PageRequest::from_page(self.page, self.page_size);
            match self.repo.list_posts(&filter, request).await {
                Ok(result) => {
                    let total_pages = pagination::total_pages(result.total, self.page_size);
                    if self.page > total_pages && !clamped {
                        self.page = total_pages;
                        clamped = true;
                        continue;
                    }
                    self.total_pages = total_pages;
                    self.page = pagination::clamp_page(self.page, total_pages);
                    self.posts = result.items;
                    self.error = None;
                    debug!(
                        target = "tagfeed::posts_hook",
                        page = self.page,
                        total_pages = self.total_pages,
                        returned = self.posts.len(),
                        "posts fetched"
                    );
                }
                Err(err) => {
                    warn!(
                        target = "tagfeed::posts_hook",
                        page = self.page,
                        error = %err,
                        "failed to fetch posts"
                    );
                    self.posts.clear();
                    self.error = Some(err.to_string());
                }
            }
            break;
        }

        self.loading = false;
    }
}

#[async_trait]
impl PostsSource for PostsHook {
    fn posts(&self) -> &[PostRecord] {
        &self.posts
    }

    fn loading(&self) -> bool {
        self.loading
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn page(&self) -> u32 {
        self.page
    }

    fn total_pages(&self) -> u32 {
        self.total_pages
    }

    fn search_query(&self) -> &str {
        &self.search_query
    }

    fn tags(&self) -> &TagSet {
        &self.tags
    }

    fn begin_fetch(&mut self) {
        self.loading = true;
    }

    async fn refresh(&mut self) {
        self.fetch().await;
    }

    async fn next_page(&mut self) {
        if self.page < self.total_pages {
            self.page += 1;
            self.fetch().await;
        }
    }

    async fn previous_page(&mut self) {
        if self.page > 1 {
            self.page -= 1;
            self.fetch().await;
        }
    }

    async fn page_click(&mut self, page: u32) {
        let target = pagination::clamp_page(page, self.total_pages);
        if target != self.page {
            self.page = target;
            self.fetch().await;
        }
    }

    async fn delete_post(
        &mut self,
        id: Uuid,
        user: Option<&CurrentUser>,
    ) -> Result<(), DeleteError> {
        let Some(user) = user else {
            return Err(DeleteError::Unauthenticated);
        };

        let post = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or(DeleteError::NotFound { id })?;

        if !user.is_author_of(&post) {
            return Err(DeleteError::Forbidden {
                actor: user.id.clone(),
                id,
            });
        }

        self.repo.delete_post(id).await?;
        counter!("tagfeed_posts_deleted_total").increment(1);
        info!(
            target = "tagfeed::posts_hook",
            post_id = %id,
            slug = %post.slug,
            actor = %user.id,
            "post deleted"
        );

        self.fetch().await;
        Ok(())
    }

    async fn set_search_query(&mut self, query: &str) {
        if self.search_query == query {
            return;
        }
        self.search_query = query.to_string();
        self.page = 1;
        self.fetch().await;
    }

    fn add_tag(&mut self, tag: &str) {
        if self.tags.insert(tag) {
            debug!(target = "tagfeed::posts_hook", tag, "tag added");
        }
    }

    fn remove_tag(&mut self, tag: &str) {
        if self.tags.remove(tag) {
            debug!(target = "tagfeed::posts_hook", tag, "tag removed");
        }
    }

    fn replace_tags(&mut self, tags: TagSet) {
        self.tags = tags;
    }
}
