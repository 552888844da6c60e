//! Fetch orchestration for comment threads.
//!
//! [`ThreadLoader`] runs the fetch-descendants contract against a
//! [`CommentSource`] and feeds the results into a [`CommentThread`].
//! Fetch failures never escape: the tree is left as it was (or empty on
//! first load) and the failure is logged, so the worst case for the user
//! is a stale or empty thread they can reload.

use crate::comments::source::{ChildrenQuery, CommentQuery, CommentSource};
use crate::comments::thread::CommentThread;
use crate::comments::tree::collect_ids;
use crate::comments::types::{ChildrenPage, CommentId, SortOrder};
use crate::config::ClientConfig;
use crate::retry::{retry_with_delays, ROOT_RETRY_DELAYS};
use crate::storage::KeyValueStore;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Options shared by every fetch a loader makes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderOptions {
    /// Sort order for top-level comments and children pages.
    pub sort: SortOrder,
    /// Page size for children fetches and inline children on first load.
    pub children_limit: usize,
    /// Include soft-deleted comments.
    pub include_deleted: bool,
    /// Delays between attempts when fetching a deep-thread root.
    pub root_retry_delays: Vec<Duration>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            sort: SortOrder::default(),
            children_limit: crate::validation::DEFAULT_CHILDREN_LIMIT,
            include_deleted: true,
            root_retry_delays: ROOT_RETRY_DELAYS.to_vec(),
        }
    }
}

impl From<&ClientConfig> for LoaderOptions {
    fn from(config: &ClientConfig) -> Self {
        Self {
            sort: config.sort,
            children_limit: config.children_limit,
            include_deleted: config.include_deleted,
            root_retry_delays: config.root_retry_delays.clone(),
        }
    }
}

/// Drives fetches for comment threads.
#[derive(Debug, Clone)]
pub struct ThreadLoader<C> {
    source: C,
    options: LoaderOptions,
}

impl<C: CommentSource> ThreadLoader<C> {
    /// Creates a loader over a comment source.
    pub fn new(source: C, options: LoaderOptions) -> Self {
        Self { source, options }
    }

    /// Returns the underlying source.
    pub fn source(&self) -> &C {
        &self.source
    }

    /// Returns the loader options.
    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    fn children_query(&self, cursor: Option<String>, exclude_ids: Vec<CommentId>) -> ChildrenQuery {
        ChildrenQuery {
            limit: self.options.children_limit,
            cursor,
            sort: self.options.sort,
            include_deleted: self.options.include_deleted,
            exclude_ids,
        }
    }

    async fn fetch_page<S: KeyValueStore>(
        &self,
        thread: &CommentThread<S>,
        id: CommentId,
        cursor: Option<String>,
    ) -> Option<ChildrenPage> {
        let query = self.children_query(cursor, thread.known_descendant_ids(id));
        match self.source.comment_children(id, &query).await {
            Ok(page) => Some(page),
            Err(e) => {
                warn!(comment = %id, error = %e, "failed to fetch children, keeping current tree");
                None
            }
        }
    }

    /// Loads a post's comments from scratch and replays saved expansions.
    ///
    /// Every persisted expanded id present in the tree is re-fetched; ids
    /// that only appear once an earlier expansion lands are picked up on a
    /// later pass. Returns the number of fetched nodes.
    #[instrument(skip(self, thread), fields(post = %thread.post()))]
    pub async fn load_post<S: KeyValueStore>(&self, thread: &mut CommentThread<S>) -> usize {
        let query = CommentQuery {
            sort: self.options.sort,
            children_limit: self.options.children_limit,
            include_deleted: self.options.include_deleted,
        };

        let top_level = match self.source.post_comments(thread.post(), &query).await {
            Ok(comments) => comments,
            Err(e) => {
                warn!(error = %e, "failed to fetch comments, showing empty thread");
                Vec::new()
            }
        };
        thread.set_subthread_root(None);
        thread.replace_tree(top_level);

        self.replay_expanded(thread).await;
        thread.node_count()
    }

    async fn replay_expanded<S: KeyValueStore>(&self, thread: &mut CommentThread<S>) {
        let mut pending: BTreeSet<CommentId> = thread.expanded_ids().iter().copied().collect();

        loop {
            let present = collect_ids(thread.tree());
            let ready: Vec<CommentId> = pending
                .iter()
                .copied()
                .filter(|id| present.contains(id))
                .collect();
            if ready.is_empty() {
                break;
            }

            for id in ready {
                pending.remove(&id);
                if let Some(page) = self.fetch_page(thread, id, None).await {
                    thread.apply_children_page(id, page);
                }
            }
        }

        if !pending.is_empty() {
            debug!(
                missing = pending.len(),
                "saved expansions not found in the current tree"
            );
        }
    }

    /// Fetches the next page of a node's children ("show more").
    ///
    /// Uses the cursor from the previous page of this node, excludes the
    /// descendants already fetched and persists the expansion. Returns how
    /// many new nodes arrived (0 on failure).
    #[instrument(skip(self, thread), fields(post = %thread.post()))]
    pub async fn expand<S: KeyValueStore>(&self, thread: &mut CommentThread<S>, id: CommentId) -> usize {
        let cursor = thread.next_cursor(id).map(str::to_string);
        let Some(page) = self.fetch_page(thread, id, cursor).await else {
            return 0;
        };

        let added = thread.apply_children_page(id, page);
        thread.record_expanded(id);
        info!(comment = %id, added, "expanded comment");
        added
    }

    /// Loads a deep-thread view rooted at one comment.
    ///
    /// The root is fetched with retries (a permalink may be opened right
    /// after the comment was created), then its first page of children.
    /// The root stays top-level whatever parent or ancestor context the
    /// server sends. Returns false if the root could not be fetched; the
    /// thread is then empty.
    #[instrument(skip(self, thread), fields(post = %thread.post()))]
    pub async fn load_subthread<S: KeyValueStore>(
        &self,
        thread: &mut CommentThread<S>,
        root: CommentId,
    ) -> bool {
        let fetched = retry_with_delays(&self.options.root_retry_delays, "fetch thread root", || {
            self.source.comment(root)
        })
        .await;
        thread.set_subthread_root(Some(root));

        let root_comment = match fetched {
            Ok(comment) => comment,
            Err(e) => {
                warn!(comment = %root, error = %e, "failed to fetch thread root");
                thread.replace_tree(Vec::new());
                return false;
            }
        };

        thread.replace_tree(vec![root_comment]);

        if let Some(page) = self.fetch_page(thread, root, None).await {
            thread.apply_children_page(root, page);
        }
        self.replay_expanded(thread).await;
        true
    }
}
