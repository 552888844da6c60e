//! The fetch contract between the comment tree and the backend.
//!
//! [`CommentSource`] is implemented by [`crate::api::ApiClient`] for real
//! traffic and by in-memory fakes in tests. Query structs know how to
//! render themselves as query-string pairs, so URL construction can be
//! checked without a network.

use crate::comments::types::{ChildrenPage, Comment, CommentId, PostId, SortOrder};
use crate::error::Result;
use crate::validation::{Validator, DEFAULT_CHILDREN_LIMIT, MAX_EXCLUDE_IDS};
use std::future::Future;

/// Query for the top-level comments of a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentQuery {
    /// Sort order.
    pub sort: SortOrder,
    /// How many nested children the server should inline per node.
    pub children_limit: usize,
    /// Include soft-deleted comments.
    pub include_deleted: bool,
}

impl Default for CommentQuery {
    fn default() -> Self {
        Self {
            sort: SortOrder::default(),
            children_limit: DEFAULT_CHILDREN_LIMIT,
            include_deleted: true,
        }
    }
}

impl CommentQuery {
    /// Renders the query-string pairs, in a fixed order.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("sort", self.sort.as_str().to_string()),
            (
                "children_limit",
                Validator::clamp_children_limit(self.children_limit).to_string(),
            ),
            ("include_deleted", self.include_deleted.to_string()),
            ("skip_mute_filter", "true".to_string()),
        ]
    }
}

/// Query for one page of a comment's descendants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildrenQuery {
    /// Page size.
    pub limit: usize,
    /// Cursor returned by the previous page.
    pub cursor: Option<String>,
    /// Sort order.
    pub sort: SortOrder,
    /// Include soft-deleted comments.
    pub include_deleted: bool,
    /// Descendants already materialized on the client.
    pub exclude_ids: Vec<CommentId>,
}

impl Default for ChildrenQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_CHILDREN_LIMIT,
            cursor: None,
            sort: SortOrder::default(),
            include_deleted: true,
            exclude_ids: Vec::new(),
        }
    }
}

impl ChildrenQuery {
    /// Renders the query-string pairs, in a fixed order.
    ///
    /// `exclude_ids` is only an optimization, so an oversized list is cut to
    /// [`MAX_EXCLUDE_IDS`] rather than rejected.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![(
            "limit",
            Validator::clamp_children_limit(self.limit).to_string(),
        )];
        if let Some(cursor) = self.cursor.as_deref().filter(|c| !c.is_empty()) {
            pairs.push(("cursor", cursor.to_string()));
        }
        pairs.push(("sort", self.sort.as_str().to_string()));
        pairs.push(("include_deleted", self.include_deleted.to_string()));
        if !self.exclude_ids.is_empty() {
            let joined = self
                .exclude_ids
                .iter()
                .take(MAX_EXCLUDE_IDS)
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("exclude_ids", joined));
        }
        pairs
    }
}

/// Backend operations the comment tree depends on.
pub trait CommentSource: Send + Sync {
    /// Fetches top-level comments of a post with depth-limited children.
    fn post_comments(
        &self,
        post: PostId,
        query: &CommentQuery,
    ) -> impl Future<Output = Result<Vec<Comment>>> + Send;

    /// Fetches one page of descendants of a comment.
    fn comment_children(
        &self,
        comment: CommentId,
        query: &ChildrenQuery,
    ) -> impl Future<Output = Result<ChildrenPage>> + Send;

    /// Fetches a single comment.
    fn comment(&self, comment: CommentId) -> impl Future<Output = Result<Comment>> + Send;
}
