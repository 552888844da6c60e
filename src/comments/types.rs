//! Typed comment records and their wire counterparts.
//!
//! Server JSON is decoded into the loosely-shaped `Raw*` structs and then
//! validated into [`Comment`] / [`ChildrenPage`]. Everything downstream of
//! this module (tree reconciliation, collapse, rendering) works on the
//! validated types only.

use crate::error::{AnoniumError, Result};
use crate::validation::MAX_TREE_DEPTH;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = AnoniumError;

            fn from_str(s: &str) -> Result<Self> {
                s.trim()
                    .parse::<u64>()
                    .map($name)
                    .map_err(|e| AnoniumError::invalid_input(format!("Invalid id '{}': {}", s, e)))
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                $name(id)
            }
        }
    };
}

id_type!(
    /// Identifier of a comment.
    CommentId
);
id_type!(
    /// Identifier of a post.
    PostId
);
id_type!(
    /// Identifier of a community.
    CommunityId
);

/// Sort order accepted by the comment endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Highest score first.
    #[default]
    Popular,
    /// Newest first.
    New,
    /// Oldest first.
    Old,
}

impl SortOrder {
    /// Returns the query-string value for this order.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Popular => "popular",
            SortOrder::New => "new",
            SortOrder::Old => "old",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = AnoniumError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "popular" => Ok(SortOrder::Popular),
            "new" => Ok(SortOrder::New),
            "old" => Ok(SortOrder::Old),
            other => Err(AnoniumError::invalid_input(format!(
                "Unknown sort order '{}' (expected popular, new or old)",
                other
            ))),
        }
    }
}

/// A validated comment node.
///
/// `children` holds only the replies materialized on the client so far;
/// `children_count` is what the server reported for direct replies.
/// `has_more_children` is derived by the reconciler and never taken from
/// the server as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    /// Unique comment id.
    pub id: CommentId,
    /// Parent comment, or `None` for a top-level comment.
    pub parent: Option<CommentId>,
    /// Post the comment belongs to, when the server included it.
    pub post: Option<PostId>,
    /// Comment body (empty for tombstones).
    pub body: String,
    /// Display name of the author; `None` renders as anonymous.
    pub author: Option<String>,
    /// Creation timestamp as sent by the server.
    pub created_at: Option<String>,
    /// Last edit timestamp as sent by the server.
    pub updated_at: Option<String>,
    /// Net vote score.
    pub score: i64,
    /// The viewer's own vote: -1, 0 or 1.
    pub user_vote: i8,
    /// Replies currently materialized on the client.
    pub children: Vec<Comment>,
    /// Number of direct replies known to exist server-side.
    pub children_count: u32,
    /// True when fewer descendants are materialized than the server reports.
    pub has_more_children: bool,
    /// Soft-delete tombstone.
    pub is_deleted: bool,
}

impl Comment {
    /// Creates a bare comment with the given id and parent.
    ///
    /// Mostly useful for building trees by hand; real nodes come from
    /// [`Comment::from_raw`].
    pub fn new(id: u64, parent: Option<u64>) -> Self {
        Self {
            id: CommentId(id),
            parent: parent.map(CommentId),
            post: None,
            body: String::new(),
            author: None,
            created_at: None,
            updated_at: None,
            score: 0,
            user_vote: 0,
            children: Vec::new(),
            children_count: 0,
            has_more_children: false,
            is_deleted: false,
        }
    }

    /// Sets the body (builder style).
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the materialized children (builder style).
    pub fn with_children(mut self, children: Vec<Comment>) -> Self {
        self.children = children;
        self
    }

    /// Sets the server-side direct reply count (builder style).
    pub fn with_children_count(mut self, count: u32) -> Self {
        self.children_count = count;
        self
    }

    /// Marks the comment as deleted (builder style).
    pub fn deleted(mut self) -> Self {
        self.is_deleted = true;
        self
    }

    /// Returns a copy of this node without its children.
    pub fn shallow(&self) -> Self {
        Self {
            id: self.id,
            parent: self.parent,
            post: self.post,
            body: self.body.clone(),
            author: self.author.clone(),
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
            score: self.score,
            user_vote: self.user_vote,
            children: Vec::new(),
            children_count: self.children_count,
            has_more_children: self.has_more_children,
            is_deleted: self.is_deleted,
        }
    }

    /// Returns the author name to display.
    pub fn author_label(&self) -> &str {
        match (&self.author, self.is_deleted) {
            (_, true) => "[deleted]",
            (Some(name), false) if !name.is_empty() => name,
            _ => "anonymous",
        }
    }

    /// Validates a wire comment into a typed node.
    ///
    /// `enclosing` is the id of the node whose `children` array contained
    /// `raw`; it becomes the parent when the server omitted one.
    ///
    /// # Errors
    /// Returns a validation error if the node or any of its descendants has
    /// a missing or non-positive id, or the nesting exceeds
    /// [`MAX_TREE_DEPTH`].
    pub fn from_raw(raw: RawComment, enclosing: Option<CommentId>) -> Result<Self> {
        Self::from_raw_at_depth(raw, enclosing, 0)
    }

    fn from_raw_at_depth(raw: RawComment, enclosing: Option<CommentId>, depth: usize) -> Result<Self> {
        if depth > MAX_TREE_DEPTH {
            return Err(AnoniumError::validation(format!(
                "Comment nesting exceeds maximum depth of {}",
                MAX_TREE_DEPTH
            )));
        }

        let id = positive_id(raw.id)
            .map(CommentId)
            .ok_or_else(|| AnoniumError::validation("Comment is missing a valid id"))?;

        // A node pointing at itself is treated as top-level
        let parent = match positive_id(raw.parent).map(CommentId) {
            Some(p) if p == id => None,
            Some(p) => Some(p),
            None => enclosing,
        };

        let children = raw
            .children
            .unwrap_or_default()
            .into_iter()
            .map(|child| Self::from_raw_at_depth(child, Some(id), depth + 1))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            id,
            parent,
            post: positive_id(raw.post).map(PostId),
            body: raw.body.unwrap_or_default(),
            author: raw.author.as_ref().and_then(author_name),
            created_at: raw.created_at,
            updated_at: raw.updated_at,
            score: raw.score.unwrap_or(0),
            user_vote: raw.user_vote.unwrap_or(0).clamp(-1, 1) as i8,
            children,
            children_count: raw
                .children_count
                .unwrap_or(0)
                .clamp(0, u32::MAX as i64) as u32,
            // Derived later by the reconciler
            has_more_children: false,
            is_deleted: raw.is_deleted.unwrap_or(false),
        })
    }
}

// Unlinks descendants onto a stack; reply chains have no depth limit.
impl Drop for Comment {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.children);
        }
    }
}

fn positive_id(raw: Option<i64>) -> Option<u64> {
    raw.filter(|id| *id > 0).map(|id| id as u64)
}

/// Extracts a display name from the `author` field, which the backend
/// sends either as a plain string or as an object with a `username`.
fn author_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map
            .get("username")
            .or_else(|| map.get("display_name"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

/// Comment as it arrives from the backend, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawComment {
    /// Comment id.
    #[serde(default)]
    pub id: Option<i64>,
    /// Parent comment id.
    #[serde(default)]
    pub parent: Option<i64>,
    /// Post id.
    #[serde(default, alias = "post_id")]
    pub post: Option<i64>,
    /// Comment body.
    #[serde(default)]
    pub body: Option<String>,
    /// Author, as a string or an object.
    #[serde(default)]
    pub author: Option<Value>,
    /// Creation timestamp.
    #[serde(default)]
    pub created_at: Option<String>,
    /// Last edit timestamp.
    #[serde(default)]
    pub updated_at: Option<String>,
    /// Net score.
    #[serde(default)]
    pub score: Option<i64>,
    /// Viewer's vote.
    #[serde(default)]
    pub user_vote: Option<i64>,
    /// Nested replies (depth-limited by the server).
    #[serde(default)]
    pub children: Option<Vec<RawComment>>,
    /// Server-side direct reply count.
    #[serde(default)]
    pub children_count: Option<i64>,
    /// Server's own "more replies" hint; parsed but not trusted.
    #[serde(default)]
    pub has_more_children: Option<bool>,
    /// Soft-delete flag.
    #[serde(default)]
    pub is_deleted: Option<bool>,
}

/// Validates a list of wire comments, skipping invalid nodes.
///
/// A node that fails validation is dropped together with its subtree and
/// logged; the rest of the batch survives.
pub fn decode_comments(raws: Vec<RawComment>) -> Vec<Comment> {
    raws.into_iter()
        .filter_map(|raw| {
            let raw_id = raw.id;
            match Comment::from_raw(raw, None) {
                Ok(comment) => Some(comment),
                Err(e) => {
                    warn!(raw_id = ?raw_id, error = %e, "decode_comments: dropping invalid comment");
                    None
                }
            }
        })
        .collect()
}

/// One page of descendants from the children endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildrenPage {
    /// Descendants of the requested comment.
    pub items: Vec<Comment>,
    /// Ancestor context the server included to place `items`.
    pub parents: Vec<Comment>,
    /// Cursor for the next page, if any.
    pub next: Option<String>,
}

impl ChildrenPage {
    /// Returns true if the server reported another page.
    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }
}

/// Children page as it arrives from the backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawChildrenPage {
    /// Descendants.
    #[serde(default)]
    pub items: Vec<RawComment>,
    /// Ancestor context.
    #[serde(default)]
    pub parents: Vec<RawComment>,
    /// Next cursor.
    #[serde(default)]
    pub next: Option<String>,
}

impl From<RawChildrenPage> for ChildrenPage {
    fn from(raw: RawChildrenPage) -> Self {
        Self {
            items: decode_comments(raw.items),
            parents: decode_comments(raw.parents),
            next: raw.next.filter(|n| !n.is_empty()),
        }
    }
}
