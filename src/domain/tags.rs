//! Tag normalization, the ordered filter tag set and conjunctive post filtering.
//!
//! Tags compare case-insensitively after trimming surrounding whitespace, so
//! `" Rust"` and `"rust"` name the same tag. Stored tags are always the
//! normalized form.

use crate::domain::entities::PostRecord;

/// Trim and lowercase a raw tag. Returns `None` for blank input.
pub fn normalize_tag(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Case-insensitive, whitespace-insensitive tag equality.
pub fn tags_match(left: &str, right: &str) -> bool {
    let left = left.trim();
    let right = right.trim();
    left == right || left.to_lowercase() == right.to_lowercase()
}

/// Ordered set of normalized tags with no case-insensitive duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    tags: Vec<String>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(tag: &str) -> Self {
        let mut set = Self::new();
        set.insert(tag);
        set
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.iter().any(|existing| tags_match(existing, tag))
    }

    /// Insert the normalized form of `tag`. Returns `false` when the tag is
    /// blank or already present.
    pub fn insert(&mut self, tag: &str) -> bool {
        let Some(normalized) = normalize_tag(tag) else {
            return false;
        };
        if self.contains(&normalized) {
            return false;
        }
        self.tags.push(normalized);
        true
    }

    pub fn remove(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|existing| !tags_match(existing, tag));
        self.tags.len() != before
    }

    pub fn as_slice(&self) -> &[String] {
        &self.tags
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl<'a> FromIterator<&'a str> for TagSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut set = Self::new();
        for tag in iter {
            set.insert(tag);
        }
        set
    }
}

/// True when every tag of `wanted` appears among `post_tags`.
pub fn has_all_tags(post_tags: &[String], wanted: &TagSet) -> bool {
    wanted
        .iter()
        .all(|tag| post_tags.iter().any(|candidate| tags_match(candidate, tag)))
}

pub fn filter_posts<'a>(posts: &'a [PostRecord], wanted: &TagSet) -> Vec<&'a PostRecord> {
    posts
        .iter()
        .filter(|post| has_all_tags(&post.tags, wanted))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::AuthorRef;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn post(slug: &str, tags: &[&str]) -> PostRecord {
        PostRecord {
            id: Uuid::new_v4(),
            slug: slug.to_string(),
            title: slug.to_string(),
            author: AuthorRef {
                id: "ada".to_string(),
                name: "Ada".to_string(),
            },
            excerpt: String::new(),
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
            published_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn slugs(posts: Vec<&PostRecord>) -> Vec<&str> {
        posts.into_iter().map(|post| post.slug.as_str()).collect()
    }

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize_tag("  Rust "), Some("rust".to_string()));
        assert_eq!(normalize_tag(" \t"), None);
    }

    #[test]
    fn insert_rejects_case_insensitive_duplicates() {
        let mut set = TagSet::new();
        assert!(set.insert("AI"));
        assert!(!set.insert("ai"));
        assert!(!set.insert(" Ai "));
        assert!(!set.insert(""));
        assert_eq!(set.as_slice(), ["ai".to_string()]);
    }

    #[test]
    fn remove_matches_case_insensitively() {
        let mut set: TagSet = ["go", "rust"].into_iter().collect();
        assert!(set.remove("RUST"));
        assert!(!set.remove("zig"));
        assert_eq!(set.as_slice(), ["go".to_string()]);
    }

    #[test]
    fn empty_filter_keeps_every_post() {
        let posts = vec![post("a", &[]), post("b", &["go"])];
        assert_eq!(slugs(filter_posts(&posts, &TagSet::new())), ["a", "b"]);
    }

    #[test]
    fn route_tag_keeps_only_matching_post() {
        let posts = vec![post("first", &["Rust", "Go"]), post("second", &["go"])];
        let wanted = TagSet::singleton("rust");
        assert_eq!(slugs(filter_posts(&posts, &wanted)), ["first"]);
    }

    #[test]
    fn filtering_is_conjunctive() {
        let posts = vec![
            post("both", &["rust", "web"]),
            post("rust-only", &["rust"]),
            post("web-only", &["WEB"]),
        ];
        let wanted: TagSet = ["rust", "web"].into_iter().collect();
        assert_eq!(slugs(filter_posts(&posts, &wanted)), ["both"]);
    }

    #[test]
    fn post_tags_with_stray_whitespace_still_match() {
        let posts = vec![post("padded", &[" Rust  "])];
        assert_eq!(
            slugs(filter_posts(&posts, &TagSet::singleton("rust"))),
            ["padded"]
        );
    }
}
