//! Persisted per-post view state.
//!
//! Two id sets are kept per post:
//! - `comment_collapsed_{post}`: comments the user collapsed
//! - `comment_expanded_{post}`: comments the user expanded with "show more"
//!
//! Both are JSON arrays of ids. Reads fail open: a missing, unreadable or
//! corrupt entry is an empty set. Write failures are logged and swallowed,
//! since losing view state only costs the user a click after reload.

use crate::comments::types::{CommentId, PostId};
use crate::storage::KeyValueStore;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, warn};

/// Storage key for the collapsed-id set of a post.
pub fn collapsed_key(post: PostId) -> String {
    format!("comment_collapsed_{}", post)
}

/// Storage key for the expanded-id set of a post.
pub fn expanded_key(post: PostId) -> String {
    format!("comment_expanded_{}", post)
}

/// Reads and writes view state through an injected store.
#[derive(Debug, Clone)]
pub struct ViewStateStore<S> {
    store: S,
}

impl<S: KeyValueStore> ViewStateStore<S> {
    /// Wraps a key/value store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    pub fn inner(&self) -> &S {
        &self.store
    }

    /// Loads the collapsed-id set for a post.
    pub fn load_collapsed(&self, post: PostId) -> HashSet<CommentId> {
        self.load_ids(&collapsed_key(post))
    }

    /// Persists the collapsed-id set for a post.
    pub fn save_collapsed(&self, post: PostId, ids: &HashSet<CommentId>) {
        self.save_ids(&collapsed_key(post), ids)
    }

    /// Loads the expanded-id set for a post.
    pub fn load_expanded(&self, post: PostId) -> HashSet<CommentId> {
        self.load_ids(&expanded_key(post))
    }

    /// Persists the expanded-id set for a post.
    pub fn save_expanded(&self, post: PostId, ids: &HashSet<CommentId>) {
        self.save_ids(&expanded_key(post), ids)
    }

    /// Forgets all view state for a post.
    pub fn clear(&self, post: PostId) {
        for key in [collapsed_key(post), expanded_key(post)] {
            if let Err(e) = self.store.remove(&key) {
                warn!(key = %key, error = %e, "view state: failed to clear entry");
            }
        }
    }

    fn load_ids(&self, key: &str) -> HashSet<CommentId> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return HashSet::new(),
            Err(e) => {
                warn!(key = key, error = %e, "view state: read failed, using empty set");
                return HashSet::new();
            }
        };

        match serde_json::from_str::<Vec<CommentId>>(&raw) {
            Ok(ids) => {
                debug!(key = key, count = ids.len(), "view state: loaded ids");
                ids.into_iter().collect()
            }
            Err(e) => {
                warn!(key = key, error = %e, "view state: corrupt entry, using empty set");
                HashSet::new()
            }
        }
    }

    fn save_ids(&self, key: &str, ids: &HashSet<CommentId>) {
        // Sorted so the stored value is stable across runs
        let sorted: BTreeSet<&CommentId> = ids.iter().collect();
        let encoded = match serde_json::to_string(&sorted) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(key = key, error = %e, "view state: failed to encode ids");
                return;
            }
        };

        if let Err(e) = self.store.set(key, &encoded) {
            warn!(key = key, error = %e, "view state: write failed");
        }
    }
}
