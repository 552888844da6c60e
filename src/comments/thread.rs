//! Per-post comment thread state.
//!
//! A [`CommentThread`] is what a comments page holds while it is open:
//! the fetched tree (the source of truth), the collapse map, the persisted
//! collapsed/expanded id sets and the pagination cursor of every node the
//! user expanded. It is created on mount and dropped on navigation; there
//! is no cross-page cache.
//!
//! A thread opened on a single comment (a deep-thread view) keeps that
//! comment at the top level: copies of it that arrive with their real
//! parent are detached again, and ancestor context above it is ignored.

use crate::comments::collapse::{display_tree, seed_collapse_map, CollapseMap, DisplayComment};
use crate::comments::tree::{
    build_tree, collect_ids, count_nodes, descendant_ids, find_comment, flatten,
    merge_comment_trees,
};
use crate::comments::types::{ChildrenPage, Comment, CommentId, PostId};
use crate::comments::view_state::ViewStateStore;
use crate::storage::KeyValueStore;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Open comment thread for one post.
#[derive(Debug)]
pub struct CommentThread<S> {
    post: PostId,
    root: Option<CommentId>,
    tree: Vec<Comment>,
    collapse: CollapseMap,
    collapsed_ids: HashSet<CommentId>,
    expanded_ids: HashSet<CommentId>,
    cursors: HashMap<CommentId, String>,
    view_state: ViewStateStore<S>,
}

impl<S: KeyValueStore> CommentThread<S> {
    /// Opens a thread, reading persisted view state for the post.
    pub fn open(post: PostId, store: S) -> Self {
        let view_state = ViewStateStore::new(store);
        let collapsed_ids = view_state.load_collapsed(post);
        let expanded_ids = view_state.load_expanded(post);

        debug!(
            post = %post,
            collapsed = collapsed_ids.len(),
            expanded = expanded_ids.len(),
            "opened comment thread"
        );

        Self {
            post,
            root: None,
            tree: Vec::new(),
            collapse: CollapseMap::new(),
            collapsed_ids,
            expanded_ids,
            cursors: HashMap::new(),
            view_state,
        }
    }

    /// Post this thread belongs to.
    pub fn post(&self) -> PostId {
        self.post
    }

    /// Comment a deep-thread view is rooted at, if any.
    pub fn subthread_root(&self) -> Option<CommentId> {
        self.root
    }

    /// Roots the thread at one comment, or `None` for the whole post.
    ///
    /// Takes effect for the next tree replacement and every merge after it.
    pub fn set_subthread_root(&mut self, root: Option<CommentId>) {
        self.root = root;
    }

    /// The fetched tree.
    pub fn tree(&self) -> &[Comment] {
        &self.tree
    }

    /// Number of fetched nodes.
    pub fn node_count(&self) -> usize {
        count_nodes(&self.tree)
    }

    /// Looks up a fetched node.
    pub fn find(&self, id: CommentId) -> Option<&Comment> {
        find_comment(&self.tree, id)
    }

    /// Ids the user expanded with "show more".
    pub fn expanded_ids(&self) -> &HashSet<CommentId> {
        &self.expanded_ids
    }

    /// Ids the user collapsed, as persisted.
    pub fn collapsed_ids(&self) -> &HashSet<CommentId> {
        &self.collapsed_ids
    }

    /// Cursor for the next page of a node's children, if any.
    pub fn next_cursor(&self, id: CommentId) -> Option<&str> {
        self.cursors.get(&id).map(String::as_str)
    }

    /// Returns true if the node is currently collapsed on screen.
    pub fn is_collapsed(&self, id: CommentId) -> bool {
        self.collapse
            .get(&id)
            .copied()
            .unwrap_or_else(|| self.collapsed_ids.contains(&id))
    }

    /// Replaces the tree with a fresh top-level fetch.
    ///
    /// Pagination cursors are dropped; collapse and expansion state survive.
    pub fn replace_tree(&mut self, top_level: Vec<Comment>) {
        self.tree = match self.root {
            Some(root) => build_tree(&detach_root(flatten(&top_level), root)),
            None => build_tree(&top_level),
        };
        self.cursors.clear();
        info!(post = %self.post, nodes = self.node_count(), "comment tree loaded");
    }

    /// Merges a fetched batch into the tree; returns how many ids were new.
    pub fn merge(&mut self, items: &[Comment]) -> usize {
        let before = collect_ids(&self.tree);
        self.tree = match self.root {
            Some(root) => merge_comment_trees(&self.tree, &detach_root(flatten(items), root)),
            None => merge_comment_trees(&self.tree, items),
        };
        collect_ids(&self.tree).difference(&before).count()
    }

    /// Merges a children page fetched for `id` and stores its cursor.
    ///
    /// Ancestor context is merged first so `items` land under it. In a
    /// deep-thread view only context nodes already in the tree are kept.
    pub fn apply_children_page(&mut self, id: CommentId, page: ChildrenPage) -> usize {
        let mut batch = match self.root {
            Some(_) => {
                let known = collect_ids(&self.tree);
                flatten(&page.parents)
                    .into_iter()
                    .filter(|node| known.contains(&node.id))
                    .collect()
            }
            None => page.parents,
        };
        batch.extend(page.items);
        let added = self.merge(&batch);

        match page.next {
            Some(next) => {
                self.cursors.insert(id, next);
            }
            None => {
                self.cursors.remove(&id);
            }
        }

        debug!(comment = %id, added, "applied children page");
        added
    }

    /// Records a user-initiated expansion and persists it.
    pub fn record_expanded(&mut self, id: CommentId) {
        if self.expanded_ids.insert(id) {
            self.view_state.save_expanded(self.post, &self.expanded_ids);
        }
    }

    /// Descendants of `id` already fetched, to send as `exclude_ids`.
    pub fn known_descendant_ids(&self, id: CommentId) -> Vec<CommentId> {
        self.find(id).map(descendant_ids).unwrap_or_default()
    }

    /// Collapses or expands a node on screen and persists the choice.
    pub fn set_collapsed(&mut self, id: CommentId, collapsed: bool) {
        self.collapse.insert(id, collapsed);
        let changed = if collapsed {
            self.collapsed_ids.insert(id)
        } else {
            self.collapsed_ids.remove(&id)
        };
        if changed {
            self.view_state.save_collapsed(self.post, &self.collapsed_ids);
        }
    }

    /// Flips a node's collapse state; returns the new state.
    pub fn toggle_collapsed(&mut self, id: CommentId) -> bool {
        let collapsed = !self.is_collapsed(id);
        self.set_collapsed(id, collapsed);
        collapsed
    }

    /// Forgets persisted view state for this post.
    pub fn reset_view_state(&mut self) {
        self.view_state.clear(self.post);
        self.collapse.clear();
        self.collapsed_ids.clear();
        self.expanded_ids.clear();
        self.cursors.clear();
    }

    /// Builds the display tree: collapse applied, deleted comments last.
    pub fn display(&mut self) -> Vec<DisplayComment<'_>> {
        seed_collapse_map(&self.tree, &self.collapsed_ids, &mut self.collapse);
        display_tree(&self.tree, &self.collapse)
    }
}

/// Makes every copy of `root` in a flat batch top-level.
fn detach_root(mut batch: Vec<Comment>, root: CommentId) -> Vec<Comment> {
    for node in batch.iter_mut().filter(|node| node.id == root) {
        node.parent = None;
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comments::collapse::count_displayed;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn sample() -> Vec<Comment> {
        vec![Comment::new(1, None)
            .with_children_count(3)
            .with_children(vec![Comment::new(2, Some(1))])]
    }

    #[test]
    fn test_open_reads_persisted_state() {
        let store = MemoryStore::with_entries([
            ("comment_collapsed_42", "[1]"),
            ("comment_expanded_42", "[2,3]"),
        ]);
        let thread = CommentThread::open(PostId(42), store);
        assert!(thread.is_collapsed(CommentId(1)));
        assert_eq!(thread.expanded_ids().len(), 2);
    }

    #[test]
    fn test_apply_children_page_tracks_cursor() {
        let mut thread = CommentThread::open(PostId(42), MemoryStore::new());
        thread.replace_tree(sample());

        let page = ChildrenPage {
            items: vec![Comment::new(3, Some(1))],
            parents: vec![],
            next: Some("c2".to_string()),
        };
        assert_eq!(thread.apply_children_page(CommentId(1), page), 1);
        assert_eq!(thread.next_cursor(CommentId(1)), Some("c2"));
        assert!(thread.find(CommentId(1)).unwrap().has_more_children);

        let page = ChildrenPage {
            items: vec![Comment::new(4, Some(1))],
            ..Default::default()
        };
        thread.apply_children_page(CommentId(1), page);
        assert_eq!(thread.next_cursor(CommentId(1)), None);
        assert!(!thread.find(CommentId(1)).unwrap().has_more_children);
    }

    #[test]
    fn test_context_places_items_in_post_view() {
        let mut thread = CommentThread::open(PostId(42), MemoryStore::new());
        thread.replace_tree(sample());

        let page = ChildrenPage {
            items: vec![Comment::new(5, Some(2))],
            parents: vec![
                Comment::new(1, None).with_body("edited").with_children_count(3),
                Comment::new(2, Some(1)).with_children_count(1),
            ],
            next: None,
        };
        assert_eq!(thread.apply_children_page(CommentId(2), page), 1);

        assert_eq!(thread.tree().len(), 1);
        assert_eq!(thread.find(CommentId(1)).unwrap().body, "edited");
        let two = thread.find(CommentId(2)).unwrap();
        assert_eq!(two.children.len(), 1);
        assert_eq!(two.children[0].id, CommentId(5));
    }

    #[test]
    fn test_context_does_not_reparent_subthread_root() {
        let mut thread = CommentThread::open(PostId(42), MemoryStore::new());
        thread.set_subthread_root(Some(CommentId(2)));
        thread.replace_tree(vec![Comment::new(2, Some(1)).with_children_count(1)]);
        assert_eq!(thread.tree()[0].parent, None);

        let page = ChildrenPage {
            items: vec![Comment::new(3, Some(2))],
            parents: vec![Comment::new(1, None), Comment::new(2, Some(1))],
            next: None,
        };
        assert_eq!(thread.apply_children_page(CommentId(2), page), 1);

        assert_eq!(thread.tree().len(), 1);
        assert_eq!(thread.tree()[0].id, CommentId(2));
        assert_eq!(thread.tree()[0].parent, None);
        assert!(thread.find(CommentId(1)).is_none());
        assert_eq!(thread.node_count(), 2);

        // A plain merge of the root with its real parent keeps it on top
        thread.merge(&[Comment::new(2, Some(1))]);
        assert_eq!(thread.tree()[0].id, CommentId(2));
        assert_eq!(thread.node_count(), 2);
    }

    #[test]
    fn test_toggle_collapsed_persists() {
        let store = Arc::new(MemoryStore::new());
        let mut thread = CommentThread::open(PostId(7), Arc::clone(&store));
        thread.replace_tree(sample());

        assert!(thread.toggle_collapsed(CommentId(1)));
        assert_eq!(
            store.get("comment_collapsed_7").unwrap().as_deref(),
            Some("[1]")
        );
        assert_eq!(count_displayed(&thread.display()), 1);

        assert!(!thread.toggle_collapsed(CommentId(1)));
        assert_eq!(
            store.get("comment_collapsed_7").unwrap().as_deref(),
            Some("[]")
        );
        assert_eq!(count_displayed(&thread.display()), 2);
    }

    #[test]
    fn test_record_expanded_persists_once() {
        let store = Arc::new(MemoryStore::new());
        let mut thread = CommentThread::open(PostId(7), Arc::clone(&store));
        thread.record_expanded(CommentId(5));
        thread.record_expanded(CommentId(5));
        assert_eq!(
            store.get("comment_expanded_7").unwrap().as_deref(),
            Some("[5]")
        );
    }

    #[test]
    fn test_known_descendant_ids() {
        let mut thread = CommentThread::open(PostId(1), MemoryStore::new());
        thread.replace_tree(sample());
        assert_eq!(thread.known_descendant_ids(CommentId(1)), vec![CommentId(2)]);
        assert!(thread.known_descendant_ids(CommentId(99)).is_empty());
    }

    #[test]
    fn test_reset_view_state() {
        let store = Arc::new(MemoryStore::new());
        let mut thread = CommentThread::open(PostId(3), Arc::clone(&store));
        thread.set_collapsed(CommentId(1), true);
        thread.record_expanded(CommentId(2));
        assert_eq!(store.len(), 2);

        thread.reset_view_state();
        assert!(store.is_empty());
        assert!(!thread.is_collapsed(CommentId(1)));
        assert!(thread.expanded_ids().is_empty());
    }
}
