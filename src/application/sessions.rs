//! Per-browser view instances.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::application::posts_hook::{HookOptions, PostsHook};
use crate::application::repos::PostsRepo;
use crate::application::tag_posts::TagPostsView;

pub type SharedView = Arc<Mutex<TagPostsView<PostsHook>>>;

struct SessionEntry {
    view: SharedView,
    last_seen: Instant,
}

/// A view handle plus whether it was created by this call.
pub struct OpenedSession {
    pub id: Uuid,
    pub view: SharedView,
    pub created: bool,
}

pub struct SessionStore {
    sessions: DashMap<Uuid, SessionEntry>,
    repo: Arc<dyn PostsRepo>,
    options: HookOptions,
    idle_ttl: Duration,
}

impl SessionStore {
    pub fn new(repo: Arc<dyn PostsRepo>, options: HookOptions, idle_ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            repo,
            options,
            idle_ttl,
        }
    }

    /// Return the view for `id`, creating a fresh one for unknown or expired ids.
    pub fn open(&self, id: Option<Uuid>) -> OpenedSession {
        self.prune_idle();

        if let Some(id) = id
            && let Some(mut entry) = self.sessions.get_mut(&id)
        {
            entry.last_seen = Instant::now();
            return OpenedSession {
                id,
                view: entry.view.clone(),
                created: false,
            };
        }

        let id = Uuid::new_v4();
        let hook = PostsHook::new(self.repo.clone(), self.options);
        let view = Arc::new(Mutex::new(TagPostsView::new(hook)));
        self.sessions.insert(
            id,
            SessionEntry {
                view: view.clone(),
                last_seen: Instant::now(),
            },
        );
        debug!(target = "tagfeed::sessions", session = %id, "session created");

        OpenedSession {
            id,
            view,
            created: true,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn prune_idle(&self) {
        let ttl = self.idle_ttl;
        self.sessions.retain(|_, entry| entry.last_seen.elapsed() < ttl);
    }
}
