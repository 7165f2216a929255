//! CSS selectors targeted by datastar responses.

pub const TAG_POSTS: &str = "#tag-posts";
