//! Comment trees for posts and deep-thread views.
//!
//! The backend serves comments in pieces: a first page of top-level
//! comments with depth-limited replies, then "load more" pages for single
//! comments. This module keeps those pieces in one consistent tree.
//!
//! ## Layers
//!
//! ```text
//! ThreadLoader ── CommentSource (REST client or fake)
//!     │
//!     └── CommentThread ── ViewStateStore ── KeyValueStore
//!             │
//!             ├── tree      (merge, rebuild from parent pointers, has_more)
//!             └── collapse  (display-only filter, deleted-last ordering)
//! ```
//!
//! `tree` and `collapse` are pure functions over borrowed data; nothing in
//! them knows about HTTP or storage.

pub mod collapse;
pub mod loader;
pub mod source;
pub mod thread;
pub mod tree;
pub mod types;
pub mod view_state;

pub use collapse::{apply_collapsed_state, display_tree, CollapseMap, DisplayComment};
pub use loader::{LoaderOptions, ThreadLoader};
pub use source::{ChildrenQuery, CommentQuery, CommentSource};
pub use thread::CommentThread;
pub use tree::{build_tree, merge_comment_trees, recompute_has_more, sort_deleted_last};
pub use types::{ChildrenPage, Comment, CommentId, CommunityId, PostId, RawComment, SortOrder};
pub use view_state::ViewStateStore;
