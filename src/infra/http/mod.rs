mod identity;
mod middleware;
mod public;
mod selectors;
mod ui;

pub use identity::{SESSION_COOKIE, USER_HEADER};
pub use public::{HttpState, build_router};
pub use selectors::TAG_POSTS;
