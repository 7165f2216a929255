//! Domain entities shared by the feed, the view and the content store.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRecord {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub author: AuthorRef,
    pub excerpt: String,
    pub tags: Vec<String>,
    pub published_at: OffsetDateTime,
}

/// The authenticated viewer, passed explicitly to whatever needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
    pub name: String,
}

impl CurrentUser {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Parse an identity header value of the form `id` or `id:Display Name`.
    pub fn from_header_value(raw: &str) -> Option<Self> {
        let (id, name) = match raw.split_once(':') {
            Some((id, name)) => (id.trim(), name.trim()),
            None => (raw.trim(), ""),
        };
        if id.is_empty() {
            return None;
        }
        let name = if name.is_empty() { id } else { name };
        Some(Self::new(id, name))
    }

    pub fn is_author_of(&self, post: &PostRecord) -> bool {
        self.id == post.author.id
    }
}
