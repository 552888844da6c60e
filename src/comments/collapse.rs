//! Collapse state as a display filter.
//!
//! Collapsing a comment hides its replies on screen only. The fetched tree
//! is borrowed, never modified, so expanding again shows exactly what was
//! there before.

use crate::comments::tree::count_descendants;
use crate::comments::types::{Comment, CommentId};
use std::collections::{HashMap, HashSet};

/// Comment id → "manually collapsed by the user".
pub type CollapseMap = HashMap<CommentId, bool>;

/// A comment as it should be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayComment<'a> {
    /// The fetched node.
    pub comment: &'a Comment,
    /// True when the user collapsed this node.
    pub collapsed: bool,
    /// Fetched descendants hidden by collapsing.
    pub hidden_descendants: usize,
    /// Replies to render, deleted ones last.
    pub children: Vec<DisplayComment<'a>>,
}

impl DisplayComment<'_> {
    /// Returns true if a "show more" control should be offered.
    pub fn can_load_more(&self) -> bool {
        !self.collapsed && self.comment.has_more_children
    }
}

/// Seeds collapse state for every node and builds the display tree.
///
/// Entries already in `existing` take precedence; ids missing from it are
/// seeded from `collapsed_ids`. The returned map covers every node in
/// `comments`.
pub fn apply_collapsed_state<'a>(
    comments: &'a [Comment],
    collapsed_ids: &HashSet<CommentId>,
    existing: Option<&CollapseMap>,
) -> (Vec<DisplayComment<'a>>, CollapseMap) {
    let mut map = existing.cloned().unwrap_or_default();
    seed_collapse_map(comments, collapsed_ids, &mut map);
    let display = display_level(comments, &map);
    (display, map)
}

/// Adds an entry for every node of `level` missing from `map`.
pub fn seed_collapse_map(
    level: &[Comment],
    collapsed_ids: &HashSet<CommentId>,
    map: &mut CollapseMap,
) {
    let mut stack = vec![level];
    while let Some(level) = stack.pop() {
        for node in level {
            map.entry(node.id)
                .or_insert_with(|| collapsed_ids.contains(&node.id));
            stack.push(node.children.as_slice());
        }
    }
}

/// Builds the display tree for an already seeded map.
///
/// Ids missing from `map` are shown expanded.
pub fn display_tree<'a>(comments: &'a [Comment], map: &CollapseMap) -> Vec<DisplayComment<'a>> {
    display_level(comments, map)
}

/// An expanded node whose replies are still being built.
struct Frame<'a> {
    node: &'a Comment,
    pending: std::slice::Iter<'a, Comment>,
    done: Vec<DisplayComment<'a>>,
}

fn display_level<'a>(level: &'a [Comment], map: &CollapseMap) -> Vec<DisplayComment<'a>> {
    let mut out = Vec::with_capacity(level.len());
    let mut roots = level.iter();
    let mut stack: Vec<Frame<'a>> = Vec::new();

    loop {
        let next = match stack.last_mut() {
            Some(frame) => frame.pending.next(),
            None => roots.next(),
        };

        let display = match next {
            Some(node) if map.get(&node.id).copied().unwrap_or(false) => DisplayComment {
                comment: node,
                collapsed: true,
                hidden_descendants: count_descendants(node),
                children: Vec::new(),
            },
            Some(node) => {
                stack.push(Frame {
                    node,
                    pending: node.children.iter(),
                    done: Vec::new(),
                });
                continue;
            }
            None => {
                let Some(frame) = stack.pop() else {
                    break;
                };
                DisplayComment {
                    comment: frame.node,
                    collapsed: false,
                    hidden_descendants: 0,
                    children: deleted_last(frame.done),
                }
            }
        };

        match stack.last_mut() {
            Some(parent) => parent.done.push(display),
            None => out.push(display),
        }
    }

    deleted_last(out)
}

fn deleted_last(mut level: Vec<DisplayComment<'_>>) -> Vec<DisplayComment<'_>> {
    // Stable, so order within each partition is kept
    level.sort_by_key(|d| d.comment.is_deleted);
    level
}

/// Counts the nodes that would be rendered.
pub fn count_displayed(display: &[DisplayComment<'_>]) -> usize {
    let mut stack = vec![display];
    let mut count = 0;
    while let Some(level) = stack.pop() {
        count += level.len();
        stack.extend(level.iter().map(|d| d.children.as_slice()));
    }
    count
}

impl Drop for DisplayComment<'_> {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.children);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Comment> {
        vec![Comment::new(1, None).with_children(vec![
            Comment::new(2, Some(1)).with_children(vec![Comment::new(4, Some(2))]),
            Comment::new(3, Some(1)),
        ])]
    }

    #[test]
    fn test_seeds_from_collapsed_ids() {
        let tree = sample();
        let collapsed: HashSet<_> = [CommentId(2)].into_iter().collect();

        let (display, map) = apply_collapsed_state(&tree, &collapsed, None);
        assert_eq!(map.len(), 4);
        assert!(map[&CommentId(2)]);
        assert!(!map[&CommentId(1)]);

        let two = &display[0].children[0];
        assert!(two.collapsed);
        assert!(two.children.is_empty());
        assert_eq!(two.hidden_descendants, 1);
        assert_eq!(count_displayed(&display), 3);
    }

    #[test]
    fn test_existing_map_takes_precedence() {
        let tree = sample();
        let collapsed: HashSet<_> = [CommentId(2)].into_iter().collect();
        let mut existing = CollapseMap::new();
        existing.insert(CommentId(2), false);
        existing.insert(CommentId(1), true);

        let (display, map) = apply_collapsed_state(&tree, &collapsed, Some(&existing));
        assert!(!map[&CommentId(2)]);
        assert!(display[0].collapsed);
        assert_eq!(display[0].hidden_descendants, 3);
        assert_eq!(count_displayed(&display), 1);
    }

    #[test]
    fn test_collapse_does_not_touch_fetched_tree() {
        let tree = sample();
        let before = tree.clone();
        let collapsed: HashSet<_> = [CommentId(1)].into_iter().collect();

        let (_, mut map) = apply_collapsed_state(&tree, &collapsed, None);
        assert_eq!(tree, before);

        map.insert(CommentId(1), false);
        let display = display_tree(&tree, &map);
        assert_eq!(count_displayed(&display), 4);
    }

    #[test]
    fn test_deleted_siblings_render_last() {
        let tree = vec![
            Comment::new(1, None).deleted(),
            Comment::new(2, None),
            Comment::new(3, None).deleted(),
            Comment::new(4, None),
        ];
        let display = display_tree(&tree, &CollapseMap::new());
        let order: Vec<u64> = display.iter().map(|d| d.comment.id.0).collect();
        assert_eq!(order, vec![2, 4, 1, 3]);
    }

    #[test]
    fn test_can_load_more_hidden_when_collapsed() {
        let mut node = Comment::new(1, None).with_children_count(2);
        node.has_more_children = true;
        let tree = vec![node];

        let display = display_tree(&tree, &CollapseMap::new());
        assert!(display[0].can_load_more());

        let map: CollapseMap = [(CommentId(1), true)].into_iter().collect();
        let display = display_tree(&tree, &map);
        assert!(!display[0].can_load_more());
    }
}
