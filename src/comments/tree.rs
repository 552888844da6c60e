//! Comment tree reconciliation.
//!
//! Trees arrive from the backend in pieces: a depth-limited first page of
//! top-level comments, then "load more" pages of descendants for single
//! nodes, sometimes with ancestor context attached. This module combines
//! those pieces into one tree.
//!
//! ## Strategy
//!
//! Both inputs are flattened into id-keyed pools and the output is rebuilt
//! from each node's `parent` pointer, never from the shape of either input:
//!
//! 1. Flatten `existing` then `incoming` (pre-order), keeping one shallow
//!    copy per id. A later copy replaces the scalar fields of an earlier
//!    one but keeps its position, so sibling order stays stable.
//! 2. Group ids by `parent`. Nodes whose parent is unknown become roots.
//! 3. Rebuild from the roots. Anything left unplaced (parent cycles) is
//!    attached at the root level so no fetched node is ever dropped.
//! 4. Recompute `has_more_children` post-order.
//!
//! Every function here is pure: inputs are borrowed, outputs are new trees.

use crate::comments::types::{Comment, CommentId};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Id-keyed pool of shallow nodes plus their first-seen order.
#[derive(Debug, Default)]
struct NodePool {
    order: Vec<CommentId>,
    nodes: HashMap<CommentId, Comment>,
}

impl NodePool {
    /// Adds every node of `tree` (pre-order); existing ids take the new fields.
    fn absorb(&mut self, tree: &[Comment]) {
        // (node, id of the node whose children held it)
        let mut stack: Vec<(&Comment, Option<CommentId>)> =
            tree.iter().rev().map(|node| (node, None)).collect();

        while let Some((node, enclosing)) = stack.pop() {
            let mut shallow = node.shallow();
            if shallow.parent.is_none() {
                shallow.parent = enclosing;
            }
            if shallow.parent == Some(shallow.id) {
                shallow.parent = None;
            }

            if self.nodes.insert(shallow.id, shallow).is_none() {
                self.order.push(node.id);
            }
            stack.extend(node.children.iter().rev().map(|child| (child, Some(node.id))));
        }
    }

    /// Rebuilds the tree from parent pointers, consuming the pool.
    fn into_tree(mut self) -> Vec<Comment> {
        let mut children_of: HashMap<CommentId, Vec<CommentId>> = HashMap::new();
        let mut roots = Vec::new();

        for id in &self.order {
            match self.nodes[id].parent {
                Some(parent) if self.nodes.contains_key(&parent) => {
                    children_of.entry(parent).or_default().push(*id);
                }
                Some(parent) => {
                    debug!(comment = %id, parent = %parent, "orphaned comment attached at root");
                    roots.push(*id);
                }
                None => roots.push(*id),
            }
        }

        let mut tree: Vec<Comment> = roots
            .into_iter()
            .filter_map(|id| attach(id, &mut self.nodes, &children_of))
            .collect();

        // Parent cycles leave nodes unreachable from any root
        for id in &self.order {
            if self.nodes.contains_key(id) {
                warn!(comment = %id, "comment unreachable from any root (parent cycle); attaching at root");
                if let Some(node) = attach(*id, &mut self.nodes, &children_of) {
                    tree.push(node);
                }
            }
        }

        recompute_has_more(&mut tree);
        tree
    }
}

/// Moves `id` and its descendants out of `nodes` into an owned subtree.
fn attach(
    id: CommentId,
    nodes: &mut HashMap<CommentId, Comment>,
    children_of: &HashMap<CommentId, Vec<CommentId>>,
) -> Option<Comment> {
    let root = nodes.remove(&id)?;

    // Pre-order walk into slots; `claimed[i]` lists the child slots of slot i
    let mut slots = vec![Some(root)];
    let mut claimed: Vec<Vec<usize>> = vec![Vec::new()];
    let mut stack: Vec<(CommentId, usize)> = child_ids(children_of, id).map(|c| (c, 0)).collect();

    while let Some((child, parent_slot)) = stack.pop() {
        // Already placed when a cycle leads back to it
        let Some(node) = nodes.remove(&child) else {
            continue;
        };
        let slot = slots.len();
        slots.push(Some(node));
        claimed.push(Vec::new());
        claimed[parent_slot].push(slot);
        stack.extend(child_ids(children_of, child).map(|c| (c, slot)));
    }

    // Child slots always follow their parent's, so a reverse sweep
    // completes every subtree before its parent takes it
    for slot in (0..slots.len()).rev() {
        let children: Vec<Comment> = claimed[slot]
            .iter()
            .filter_map(|child| slots[*child].take())
            .collect();
        if let Some(node) = slots[slot].as_mut() {
            node.children = children;
        }
    }
    slots[0].take()
}

/// Child ids of `id`, reversed for pushing onto a pre-order stack.
fn child_ids(
    children_of: &HashMap<CommentId, Vec<CommentId>>,
    id: CommentId,
) -> impl Iterator<Item = CommentId> + '_ {
    children_of
        .get(&id)
        .into_iter()
        .flat_map(|ids| ids.iter().rev().copied())
}

/// Merges a newly fetched batch into an existing tree.
///
/// The result contains every node of both inputs exactly once. For ids
/// present in both, `incoming` wins on scalar fields while children from
/// both sides are kept. Merging a tree with any subset of itself returns
/// the tree unchanged.
pub fn merge_comment_trees(existing: &[Comment], incoming: &[Comment]) -> Vec<Comment> {
    let mut pool = NodePool::default();
    pool.absorb(existing);
    let before = pool.order.len();
    pool.absorb(incoming);

    debug!(
        existing_nodes = before,
        new_nodes = pool.order.len() - before,
        "merge_comment_trees: merged batch"
    );
    pool.into_tree()
}

/// Builds a tree from nodes in any shape (flat list, nested, or mixed).
pub fn build_tree(nodes: &[Comment]) -> Vec<Comment> {
    let mut pool = NodePool::default();
    pool.absorb(nodes);
    pool.into_tree()
}

/// Flattens a tree into shallow nodes in pre-order.
///
/// Nested nodes without a `parent` get the id of the node they were nested in.
pub fn flatten(tree: &[Comment]) -> Vec<Comment> {
    let mut pool = NodePool::default();
    pool.absorb(tree);
    let NodePool { order, mut nodes } = pool;
    order.iter().filter_map(|id| nodes.remove(id)).collect()
}

/// A node whose children are being processed by a post-order walk.
struct Frame {
    node: Comment,
    pending: std::vec::IntoIter<Comment>,
    done: Vec<Comment>,
    descendants: usize,
}

impl Frame {
    fn open(mut node: Comment) -> Self {
        let children = std::mem::take(&mut node.children);
        Self {
            node,
            pending: children.into_iter(),
            done: Vec::new(),
            descendants: 0,
        }
    }
}

/// Recomputes `has_more_children` for every node, post-order.
///
/// A node has more children when the server reported a positive
/// `children_count` that exceeds every descendant materialized under it.
/// Returns the number of nodes in `nodes` including descendants.
pub fn recompute_has_more(nodes: &mut [Comment]) -> usize {
    let mut total = 0;
    for root in nodes.iter_mut() {
        let (children, descendants) = recompute_level(std::mem::take(&mut root.children));
        root.children = children;
        set_has_more(root, descendants);
        total += descendants + 1;
    }
    total
}

/// Post-order pass over an owned level; returns it with its node count.
fn recompute_level(level: Vec<Comment>) -> (Vec<Comment>, usize) {
    let mut out = Vec::with_capacity(level.len());
    let mut total = 0;
    let mut roots = level.into_iter();
    let mut stack: Vec<Frame> = Vec::new();

    loop {
        let next = match stack.last_mut() {
            Some(frame) => frame.pending.next(),
            None => roots.next(),
        };
        if let Some(node) = next {
            stack.push(Frame::open(node));
            continue;
        }

        let Some(frame) = stack.pop() else {
            break;
        };
        let mut node = frame.node;
        node.children = frame.done;
        set_has_more(&mut node, frame.descendants);

        let size = frame.descendants + 1;
        match stack.last_mut() {
            Some(parent) => {
                parent.done.push(node);
                parent.descendants += size;
            }
            None => {
                out.push(node);
                total += size;
            }
        }
    }
    (out, total)
}

fn set_has_more(node: &mut Comment, descendants: usize) {
    node.has_more_children = node.children_count > 0 && node.children_count as usize > descendants;
}

/// Counts the nodes in a tree, descendants included.
pub fn count_nodes(tree: &[Comment]) -> usize {
    let mut stack = vec![tree];
    let mut count = 0;
    while let Some(level) = stack.pop() {
        count += level.len();
        stack.extend(level.iter().map(|node| node.children.as_slice()));
    }
    count
}

/// Counts every node materialized below `node`.
pub fn count_descendants(node: &Comment) -> usize {
    count_nodes(&node.children)
}

/// Iterates a tree in pre-order.
fn pre_order(tree: &[Comment]) -> impl Iterator<Item = &Comment> {
    let mut stack: Vec<&Comment> = tree.iter().rev().collect();
    std::iter::from_fn(move || {
        let node = stack.pop()?;
        stack.extend(node.children.iter().rev());
        Some(node)
    })
}

/// Returns the ids of every node below `node`, pre-order.
pub fn descendant_ids(node: &Comment) -> Vec<CommentId> {
    pre_order(&node.children).map(|n| n.id).collect()
}

/// Returns the set of every id in the tree.
pub fn collect_ids(tree: &[Comment]) -> HashSet<CommentId> {
    pre_order(tree).map(|n| n.id).collect()
}

/// Finds a node anywhere in the tree.
pub fn find_comment(tree: &[Comment], id: CommentId) -> Option<&Comment> {
    pre_order(tree).find(|node| node.id == id)
}

/// Stable-partitions every sibling list so deleted nodes come last.
pub fn sort_deleted_last(tree: &mut [Comment]) {
    let mut stack = vec![tree];
    while let Some(level) = stack.pop() {
        level.sort_by_key(|node| node.is_deleted);
        for node in level {
            stack.push(node.children.as_mut_slice());
        }
    }
}
