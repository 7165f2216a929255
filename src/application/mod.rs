//! Application services layer: the posts data hook, the tag-posts view and
//! the session store that pairs them with browsers.

pub mod error;
pub mod pagination;
pub mod posts_hook;
pub mod repos;
pub mod sessions;
pub mod stream;
pub mod tag_posts;
