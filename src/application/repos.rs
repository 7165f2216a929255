//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::application::pagination::{CountedPage, PageRequest};
use crate::domain::entities::PostRecord;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct PostQueryFilter {
    pub search: Option<String>,
}

impl PostQueryFilter {
    pub fn with_search(search: &str) -> Self {
        let trimmed = search.trim();
        Self {
            search: (!trimmed.is_empty()).then(|| trimmed.to_string()),
        }
    }
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// Newest-first page of posts matching `filter`.
    async fn list_posts(
        &self,
        filter: &PostQueryFilter,
        page: PageRequest,
    ) -> Result<CountedPage<PostRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError>;

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError>;
}
