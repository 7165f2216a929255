//! In-memory posts store seeded from a TOML content file.

use std::{
    collections::{BTreeSet, HashSet},
    io::ErrorKind,
    path::Path,
    sync::RwLock,
};

use async_trait::async_trait;
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::pagination::{CountedPage, PageRequest};
use crate::application::repos::{PostQueryFilter, PostsRepo, RepoError};
use crate::domain::entities::{AuthorRef, PostRecord};
use crate::domain::error::DomainError;
use crate::domain::tags;
use crate::infra::error::InfraError;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SeedFile {
    posts: Vec<SeedPost>,
}

#[derive(Debug, Deserialize)]
struct SeedPost {
    id: Option<Uuid>,
    slug: String,
    title: String,
    author_id: String,
    author_name: Option<String>,
    #[serde(default)]
    excerpt: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    published_at: OffsetDateTime,
}

impl SeedPost {
    fn into_record(self) -> Result<PostRecord, DomainError> {
        let slug = self.slug.trim().to_string();
        if slug.is_empty() {
            return Err(DomainError::validation("post slug must not be empty"));
        }
        let author_id = self.author_id.trim().to_string();
        if author_id.is_empty() {
            return Err(DomainError::validation(format!(
                "post `{slug}` is missing an author_id"
            )));
        }
        let author_name = self
            .author_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| author_id.clone());

        let tags = self
            .tags
            .iter()
            .map(|tag| tag.trim())
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect();

        Ok(PostRecord {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            slug,
            title: self.title.trim().to_string(),
            author: AuthorRef {
                id: author_id,
                name: author_name,
            },
            excerpt: self.excerpt.trim().to_string(),
            tags,
            published_at: self.published_at,
        })
    }
}

/// Parse a TOML content document into post records, rejecting duplicate slugs.
pub fn parse_seed(source: &str, origin: &str) -> Result<Vec<PostRecord>, InfraError> {
    let seed: SeedFile =
        toml::from_str(source).map_err(|err| InfraError::content(origin, err.to_string()))?;

    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(seed.posts.len());
    for post in seed.posts {
        let record = post
            .into_record()
            .map_err(|err| InfraError::content(origin, err.to_string()))?;
        if !seen.insert(record.slug.clone()) {
            return Err(InfraError::content(
                origin,
                format!("duplicate post slug `{}`", record.slug),
            ));
        }
        records.push(record);
    }
    Ok(records)
}

pub struct MemoryPostsRepo {
    posts: RwLock<Vec<PostRecord>>,
}

impl MemoryPostsRepo {
    pub fn new(mut posts: Vec<PostRecord>) -> Self {
        posts.sort_by(|left, right| {
            right
                .published_at
                .cmp(&left.published_at)
                .then_with(|| left.slug.cmp(&right.slug))
        });
        Self {
            posts: RwLock::new(posts),
        }
    }

    /// Load the content file at `path`; a missing file yields an empty store.
    pub async fn load(path: &Path) -> Result<Self, InfraError> {
        let origin = path.display().to_string();
        let source = match tokio::fs::read_to_string(path).await {
            Ok(source) => source,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!(
                    target = "tagfeed::content",
                    path = %origin,
                    "content file not found; starting with no posts"
                );
                return Ok(Self::new(Vec::new()));
            }
            Err(err) => return Err(InfraError::from(err)),
        };

        let posts = parse_seed(&source, &origin)?;
        info!(
            target = "tagfeed::content",
            path = %origin,
            posts = posts.len(),
            "content loaded"
        );
        Ok(Self::new(posts))
    }

    pub fn summary(&self) -> Result<ContentSummary, RepoError> {
        let posts = self.read()?;
        let tags: BTreeSet<String> = posts
            .iter()
            .flat_map(|post| post.tags.iter())
            .filter_map(|tag| tags::normalize_tag(tag))
            .collect();
        Ok(ContentSummary {
            posts: posts.len(),
            tags: tags.into_iter().collect(),
        })
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<PostRecord>>, RepoError> {
        self.posts
            .read()
            .map_err(|_| RepoError::from_persistence("posts lock poisoned"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentSummary {
    pub posts: usize,
    pub tags: Vec<String>,
}

fn matches_search(post: &PostRecord, needle: &str) -> bool {
    post.title.to_lowercase().contains(needle)
        || post.excerpt.to_lowercase().contains(needle)
        || post.author.name.to_lowercase().contains(needle)
}

#[async_trait]
impl PostsRepo for MemoryPostsRepo {
    async fn list_posts(
        &self,
        filter: &PostQueryFilter,
        page: PageRequest,
    ) -> Result<CountedPage<PostRecord>, RepoError> {
        let posts = self.read()?;
        let needle = filter.search.as_deref().map(str::to_lowercase);
        let matching: Vec<&PostRecord> = posts
            .iter()
            .filter(|post| {
                needle
                    .as_deref()
                    .is_none_or(|needle| matches_search(post, needle))
            })
            .collect();

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(page.offset())
            .take(page.limit())
            .cloned()
            .collect();
        Ok(CountedPage::new(items, total))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        let posts = self.read()?;
        Ok(posts.iter().find(|post| post.id == id).cloned())
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError> {
        let mut posts = self
            .posts
            .write()
            .map_err(|_| RepoError::from_persistence("posts lock poisoned"))?;
        let before = posts.len();
        posts.retain(|post| post.id != id);
        if posts.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
